// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Sensor operating modes, and the parameters derived from them.
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::LibraryError;

/// The wide dynamic range variant a mode uses.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum WdrMode {
    /// A single exposure per frame.
    Linear = 0,

    /// Two exposures interleaved in one extended frame.
    Dol2 = 1,

    /// Three exposures interleaved in one extended frame.
    Dol3 = 2,
}

impl WdrMode {
    /// The number of exposures in each frame.
    pub fn exposures(&self) -> u8 {
        match self {
            WdrMode::Linear => 1,
            WdrMode::Dol2 => 2,
            WdrMode::Dol3 => 3,
        }
    }
}

/// The color filter arrangement of the first two rows, starting from the top left pixel.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum BayerPattern {
    Rggb = 0,
    Grbg = 1,
    Gbrg = 2,
    Bggr = 3,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A single operating mode of the sensor.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SensorMode {
    pub wdr_mode: WdrMode,

    /// Frame rate, in units of 1/256 frames per second.
    pub fps: u32,

    /// The size of the image sent to the host.
    pub resolution: Resolution,

    /// Bits per pixel.
    pub bits: u8,

    /// Exposures per frame. Must match the WDR variant.
    pub exposures: u8,

    /// Data lanes on the video interface.
    pub lanes: u8,

    /// Bit rate of each lane in Mbps.
    pub bps: u32,

    /// Which register sequence programs this mode.
    pub sequence: u8,

    pub bayer: BayerPattern,
}

impl SensorMode {
    /// The frame rate in frames per second.
    pub fn frame_rate_hz(&self) -> f32 {
        self.fps as f32 / 256.0
    }

    /// Check that this mode is internally consistent.
    pub fn validate(&self) -> Result<(), LibraryError> {
        if self.exposures != self.wdr_mode.exposures() {
            Err(LibraryError::InvalidMode(
                "Exposure count does not match the WDR variant",
            ))
        } else if self.lanes == 0 || self.bps == 0 {
            Err(LibraryError::InvalidMode(
                "Modes need at least one lane and a non-zero bit rate",
            ))
        } else {
            Ok(())
        }
    }
}

/// A catalog of modes, indexed the same way as the image pipeline refers to them.
#[derive(Clone, Copy, Debug)]
pub struct ModeTable(&'static [SensorMode]);

impl ModeTable {
    pub const fn new(modes: &'static [SensorMode]) -> Self {
        Self(modes)
    }

    pub fn lookup(&self, index: usize) -> Result<&'static SensorMode, LibraryError> {
        let modes: &'static [SensorMode] = self.0;
        modes
            .get(index)
            .ok_or(LibraryError::OutOfRange("Mode index is past the end of the mode table"))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'static, SensorMode> {
        let modes: &'static [SensorMode] = self.0;
        modes.iter()
    }
}

/// Parameters derived from the current mode, as consumed by the image pipeline.
///
/// Integration times are in lines, gains are log2 fixed-point.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SensorParameters {
    /// Size of the image sent to the host.
    pub active: Resolution,

    /// Size of the full frame, blanking included.
    pub total: Resolution,

    pub pixels_per_line: u32,

    pub lines_per_second: u32,

    pub integration_time_min: u32,

    pub integration_time_max: u32,

    /// Maximum for the long exposure in DOL modes.
    pub integration_time_long_max: u32,

    pub integration_time_limit: u32,

    /// Frames between staging an integration time and it being visible in the output.
    pub integration_time_apply_delay: u8,

    pub isp_exposure_channel_delay: u8,

    /// `1 << gain_shift`, the fixed-point one for gains.
    pub again_accuracy: u32,

    pub again_log2_max: u32,

    pub dgain_log2_max: u32,

    /// Exposures per frame in the current mode.
    pub sensor_exp_number: u8,

    /// Index of the current mode in the mode table.
    pub mode: usize,

    /// The number of modes in the mode table.
    pub modes_num: usize,

    pub bayer: BayerPattern,

    pub wdr_mode: WdrMode,
}

impl SensorParameters {
    /// The parameters before any mode has been applied.
    pub fn new(modes: &ModeTable, gain_shift: u32) -> Self {
        let bayer = modes
            .iter()
            .next()
            .map(|mode| mode.bayer)
            .unwrap_or(BayerPattern::Rggb);
        Self {
            active: Resolution::default(),
            total: Resolution::default(),
            pixels_per_line: 0,
            lines_per_second: 0,
            integration_time_min: 0,
            integration_time_max: 0,
            integration_time_long_max: 0,
            integration_time_limit: 0,
            integration_time_apply_delay: 2,
            isp_exposure_channel_delay: 0,
            again_accuracy: 1u32.checked_shl(gain_shift).unwrap_or(0),
            again_log2_max: 0,
            dgain_log2_max: 0,
            sensor_exp_number: 1,
            mode: 0,
            modes_num: modes.len(),
            bayer,
            wdr_mode: WdrMode::Linear,
        }
    }
}

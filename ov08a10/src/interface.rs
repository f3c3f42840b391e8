// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! The receiving side of the sensor's video output.
//!
//! The driver reconfigures the receiver (usually a MIPI CSI-2 block) every time the mode changes,
//! but doesn't care how that is done.
use crate::mode::SensorMode;
use crate::util::div_ceil;

/// Pixel formats the receiver is asked to unpack.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PixelFormat {
    Raw10,
    Raw12,
}

impl PixelFormat {
    /// The format for a given bit depth. Unsupported depths fall back to RAW10.
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            12 => Self::Raw12,
            _ => Self::Raw10,
        }
    }
}

/// Where received frames go.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    /// Straight into the image pipeline.
    Direct,

    /// Into memory first.
    Buffered,
}

/// Receiver settings for a mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InterfaceConfig {
    pub lanes: u8,

    /// Unit interval (one bit period) in nanoseconds.
    pub unit_interval_ns: u32,

    pub format: PixelFormat,

    pub width: u32,

    pub height: u32,

    pub direction: Direction,
}

impl InterfaceConfig {
    pub fn for_mode(mode: &SensorMode) -> Self {
        Self {
            lanes: mode.lanes,
            unit_interval_ns: div_ceil(1000, mode.bps.max(1)),
            format: PixelFormat::from_bits(mode.bits),
            width: mode.resolution.width,
            height: mode.resolution.height,
            direction: Direction::Direct,
        }
    }
}

/// Control over the video receiver.
pub trait VideoInterface {
    type Error;

    fn configure(&mut self, config: &InterfaceConfig) -> Result<(), Self::Error>;

    fn init(&mut self) -> Result<(), Self::Error>;

    /// Start receiving on the given virtual channel.
    fn start(&mut self, channel: u8) -> Result<(), Self::Error>;

    fn deinit(&mut self) -> Result<(), Self::Error>;
}

/// For platforms where the receiver needs no configuration.
impl VideoInterface for () {
    type Error = core::convert::Infallible;

    fn configure(&mut self, _config: &InterfaceConfig) -> Result<(), Self::Error> {
        Ok(())
    }

    fn init(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn start(&mut self, _channel: u8) -> Result<(), Self::Error> {
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

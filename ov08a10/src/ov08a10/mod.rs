// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! OmniVision OV08A10 specifics.
mod address;

use crate::common::{Address, SensorModel};
use crate::mode::{BayerPattern, Resolution, SensorMode, WdrMode};
use crate::register::RegisterPair;
use crate::util::Sealed;

use address::ControlRegister;

/// The expected value of the chip ID registers.
pub const CHIP_ID: u32 = 0x53_08_41;

/// Pixel clock in Hz.
pub(crate) const PIXEL_CLOCK: u32 = 148_500_000;

/// The largest analog gain step.
pub(crate) const AGAIN_LIMIT: u16 = 20;

/// Gains are passed around as log2 values with this many fractional bits.
pub(crate) const LOG2_GAIN_SHIFT: u32 = 18;

const fn linear_mode(
    width: u32,
    height: u32,
    fps: u32,
    lanes: u8,
    bps: u32,
    sequence: u8,
) -> SensorMode {
    SensorMode {
        wdr_mode: WdrMode::Linear,
        fps: fps * 256,
        resolution: Resolution::new(width, height),
        bits: 10,
        exposures: 1,
        lanes,
        bps,
        sequence,
        bayer: BayerPattern::Bggr,
    }
}

/// The built in modes, all of which are linear 10-bit modes.
///
/// Sequence 0 is the common initialization sequence, so mode sequences start at 1.
const MODES: [SensorMode; 5] = [
    linear_mode(1280, 720, 5, 2, 250, 1),
    linear_mode(1920, 1080, 30, 4, 800, 2),
    linear_mode(1920, 1080, 60, 4, 1440, 3),
    linear_mode(3840, 2160, 30, 4, 800, 4),
    linear_mode(3840, 2160, 60, 4, 1440, 5),
];

/// Marker type for the OmniVision OV08A10.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ov08a10;

impl Sealed for Ov08a10 {}

impl SensorModel for Ov08a10 {
    const NAME: &'static str = "OV08A10";

    const CHIP_ID: u32 = CHIP_ID;

    const CHIP_ID_REGISTERS: [Address; 3] = [
        ControlRegister::ChipIdHigh.address(),
        ControlRegister::ChipIdMiddle.address(),
        ControlRegister::ChipIdLow.address(),
    ];

    const DEFAULT_I2C_ADDRESS: u8 = 0x36;

    const STREAM_CONTROL: Address = ControlRegister::StreamControl.address();

    const GROUP_HOLD: Address = ControlRegister::GroupHold.address();

    const ANALOG_GAIN: Address = ControlRegister::AnalogGain.address();

    const SHS1: RegisterPair = address::SHS1;

    const SHS2: RegisterPair = address::SHS2;

    const SHS3: RegisterPair = address::SHS3;

    const GAIN_SCALE: i32 = 20;

    const GAIN_SHIFT: u32 = LOG2_GAIN_SHIFT;

    const AGAIN_LIMIT: u16 = AGAIN_LIMIT;

    const PIXEL_CLOCK: u32 = PIXEL_CLOCK;

    const HORIZONTAL_BLANKING: u32 = 32;

    const VERTICAL_BLANKING: u32 = 40;

    const MIN_INTEGRATION_TIME: u32 = 1;

    const MAX_INTEGRATION_TIME_LIMIT: u32 = 2250;

    const WDR_INTEGRATION_TIME_MAX: u32 = 60;

    const MODES: &'static [SensorMode] = &MODES;

    fn supports(wdr_mode: WdrMode) -> bool {
        // DOL modes still need a matching register sequence from the loader.
        match wdr_mode {
            WdrMode::Linear | WdrMode::Dol2 | WdrMode::Dol3 => true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mode_table() {
        assert_eq!(Ov08a10::MODES.len(), 5);
        let uhd = &Ov08a10::MODES[4];
        assert_eq!(uhd.resolution, Resolution::new(3840, 2160));
        assert_eq!(uhd.fps, 60 * 256);
        assert_eq!(uhd.bps, 1440);
        assert_eq!(uhd.lanes, 4);
        assert_eq!(uhd.sequence, 5);
        assert!(Ov08a10::MODES
            .iter()
            .all(|mode| mode.wdr_mode == WdrMode::Linear && mode.bits == 10));
    }

    #[test]
    fn chip_id_registers() {
        let raw: [u16; 3] = [
            Ov08a10::CHIP_ID_REGISTERS[0].into(),
            Ov08a10::CHIP_ID_REGISTERS[1].into(),
            Ov08a10::CHIP_ID_REGISTERS[2].into(),
        ];
        assert_eq!(raw, [0x300A, 0x300B, 0x300C]);
        assert_eq!(
            Ov08a10::CHIP_ID.to_be_bytes()[1..],
            ov08a10_test_data::OV08A10_CHIP_ID
        );
    }

    #[test]
    fn all_wdr_variants_supported() {
        assert!(Ov08a10::supports(WdrMode::Linear));
        assert!(Ov08a10::supports(WdrMode::Dol2));
        assert!(Ov08a10::supports(WdrMode::Dol3));
    }
}

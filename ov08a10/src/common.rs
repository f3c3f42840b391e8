// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Functionality shared by any sensor this crate can drive.
//!
//! The control loop of these sensors is split in two halves. The image pipeline (auto-exposure
//! and friends) decides what gain and integration time it wants, and asks the sensor driver to
//! *allocate* them. Allocation converts the request into register units, clamps it to what the
//! current mode allows, and stages the result. Nothing is written to the sensor at that point.
//! Once per frame the pipeline calls [`update`][SensorControl::update], and any staged values
//! are written inside a group-hold bracket so the sensor applies them all on the same frame.
//!
//! # Glossary
//! <dl>
//! <dt>DOL</dt><dd>
//! Digital overlap, a WDR readout where two (DOL2) or three (DOL3) exposures of different lengths
//! are interleaved in one extended frame.
//! </dd>
//! <dt>SHS</dt><dd>
//! Shutter setting. The shutter registers count down from the frame length, so a larger SHS
//! means a *shorter* integration time.
//! </dd>
//! <dt>RHS</dt><dd>
//! Readout timing of the shorter DOL sub-exposures, the boundaries the sub-exposure shutters are
//! measured from.
//! </dd>
//! <dt>VMAX</dt><dd>
//! Frame length in lines.
//! </dd>
//! <dt>WDR</dt><dd>
//! Wide dynamic range.
//! </dd>
//! </dl>
use core::fmt;

use crate::exposure::{IntegrationTimes, MAX_GAIN_SHIFT, MAX_GAIN_STEP};
use crate::mode::{SensorMode, SensorParameters, WdrMode};
use crate::register::RegisterPair;
use crate::util::Sealed;

/// Marker newtype for register addresses accessible over I<sup>2</sup>C.
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Ord)]
pub struct Address(u16);

impl Address {
    /// Wrap the given address in an `Address`.
    ///
    /// This function is intended to be used in const contexts, in other cases the
    /// [`From`][core::convert::From] implementations are probably easier to use.
    pub const fn new(address: u16) -> Self {
        Self(address)
    }

    pub(crate) fn as_bytes(&self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({:#06X})", self.0)
    }
}

impl From<u16> for Address {
    fn from(raw_address: u16) -> Self {
        Self::new(raw_address)
    }
}

impl From<Address> for u16 {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Part-specific constants for a sensor.
///
/// This covers the register map used by the exposure protocol as well as the electrical and
/// timing constants the derived frame geometry is computed from.
pub trait SensorModel: Sealed {
    /// A human readable name for log messages.
    const NAME: &'static str;

    /// The value of the ID registers, most significant byte first.
    const CHIP_ID: u32;

    /// The ID registers, most significant byte first.
    const CHIP_ID_REGISTERS: [Address; 3];

    /// The default (7-bit) I²C address.
    const DEFAULT_I2C_ADDRESS: u8;

    /// Writing 1 starts streaming, 0 stops it.
    const STREAM_CONTROL: Address;

    /// Writing 1 starts a group hold, 0 ends it and latches everything written in between.
    const GROUP_HOLD: Address;

    const ANALOG_GAIN: Address;

    /// The shutter used in linear mode, and for the medium exposure in DOL modes.
    const SHS1: RegisterPair;

    /// The short exposure shutter in DOL modes.
    const SHS2: RegisterPair;

    /// The long exposure shutter in DOL modes.
    const SHS3: RegisterPair;

    /// Multiplier applied to the log2 gain before shifting it into register steps.
    const GAIN_SCALE: i32;

    /// The fixed-point shift of the log2 gain values used by the image pipeline.
    const GAIN_SHIFT: u32;

    /// The largest analog gain step the sensor accepts.
    const AGAIN_LIMIT: u16;

    const PIXEL_CLOCK: u32;

    /// Extra pixels per line beyond the active width.
    const HORIZONTAL_BLANKING: u32;

    /// Extra lines per frame beyond the active height.
    const VERTICAL_BLANKING: u32;

    const MIN_INTEGRATION_TIME: u32;

    const MAX_INTEGRATION_TIME_LIMIT: u32;

    /// Maximum integration time (in lines) of the short and medium DOL exposures.
    const WDR_INTEGRATION_TIME_MAX: u32;

    /// The modes this sensor supports out of the box.
    const MODES: &'static [SensorMode];

    /// Whether the sensor (and this crate's register protocol for it) supports a WDR variant.
    fn supports(wdr_mode: WdrMode) -> bool;
}

/// Configuration chosen when a driver is created.
///
/// [`SensorConfig::from_model`] fills everything in from the part's defaults, and the `with_*`
/// methods override individual values.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SensorConfig {
    /// The I²C address of the sensor.
    pub i2c_address: u8,

    /// The largest analog gain step that will be staged.
    pub again_limit: u16,

    pub gain_scale: i32,

    pub gain_shift: u32,

    /// Pixel clock in Hz.
    pub pixel_clock: u32,
}

impl SensorConfig {
    pub fn from_model<M: SensorModel>() -> Self {
        Self {
            i2c_address: M::DEFAULT_I2C_ADDRESS,
            again_limit: M::AGAIN_LIMIT,
            gain_scale: M::GAIN_SCALE,
            gain_shift: M::GAIN_SHIFT,
            pixel_clock: M::PIXEL_CLOCK,
        }
    }

    pub fn with_i2c_address(mut self, i2c_address: u8) -> Self {
        self.i2c_address = i2c_address;
        self
    }

    /// Override the gain step limit. The gain register is a single byte, so limits are capped at
    /// [`MAX_GAIN_STEP`].
    pub fn with_again_limit(mut self, again_limit: u16) -> Self {
        self.again_limit = again_limit.min(MAX_GAIN_STEP);
        self
    }

    /// Override the gain scale factor. A zero scale is ignored, as it is used as a divisor.
    pub fn with_gain_scale(mut self, gain_scale: i32) -> Self {
        if gain_scale != 0 {
            self.gain_scale = gain_scale;
        }
        self
    }

    /// Override the fixed-point shift of gain values. Shifts past [`MAX_GAIN_SHIFT`] are ignored.
    pub fn with_gain_shift(mut self, gain_shift: u32) -> Self {
        if gain_shift <= MAX_GAIN_SHIFT {
            self.gain_shift = gain_shift;
        }
        self
    }

    pub fn with_pixel_clock(mut self, pixel_clock: u32) -> Self {
        self.pixel_clock = pixel_clock;
        self
    }
}

/// The operations an image pipeline needs from a sensor driver.
///
/// Gain values are log2 fixed-point numbers, with the fraction size given by
/// [`SensorParameters::again_accuracy`]. Integration times are in lines.
pub trait SensorControl {
    type Error;

    /// Stage an analog gain, returning the gain that will actually be applied.
    fn allocate_analog_gain(&mut self, gain: i32) -> i32;

    /// Stage a digital gain, returning the gain that will actually be applied.
    fn allocate_digital_gain(&mut self, gain: i32) -> i32;

    /// Stage integration times. The requested times are clamped in place to what will actually
    /// be applied.
    fn allocate_integration_time(&mut self, times: &mut IntegrationTimes);

    /// Write any staged values to the sensor. Call this once per frame.
    ///
    /// Returns whether any registers were written.
    fn update(&mut self) -> Result<bool, Self::Error>;

    /// Switch to a different mode from the mode table.
    fn set_mode(&mut self, mode: usize) -> Result<(), Self::Error>;

    /// Read the chip ID from the sensor, failing if it isn't the expected part.
    fn id(&mut self) -> Result<u32, Self::Error>;

    /// The parameters derived from the current mode.
    fn parameters(&self) -> &SensorParameters;

    /// Read any register, bypassing the driver.
    fn read_register(&mut self, address: u32) -> Result<u8, Self::Error>;

    /// Write any register, bypassing the driver.
    fn write_register(&mut self, address: u32, value: u8) -> Result<(), Self::Error>;

    fn start_streaming(&mut self) -> Result<(), Self::Error>;

    fn stop_streaming(&mut self) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod test {
    extern crate std;

    use std::format;

    use super::*;
    use crate::ov08a10::Ov08a10;

    #[test]
    fn config_defaults_from_model() {
        let config = SensorConfig::from_model::<Ov08a10>();
        assert_eq!(config.i2c_address, 0x36);
        assert_eq!(config.again_limit, 20);
        assert_eq!(config.gain_scale, 20);
        assert_eq!(config.gain_shift, 18);
        assert_eq!(config.pixel_clock, 148_500_000);
    }

    #[test]
    fn config_overrides() {
        let config = SensorConfig::from_model::<Ov08a10>()
            .with_i2c_address(0x10)
            .with_gain_shift(8)
            .with_gain_scale(0);
        assert_eq!(config.i2c_address, 0x10);
        assert_eq!(config.gain_shift, 8);
        // Zero scales are ignored
        assert_eq!(config.gain_scale, 20);
    }

    #[test]
    fn config_limits() {
        let config = SensorConfig::from_model::<Ov08a10>()
            .with_again_limit(300)
            .with_gain_shift(64);
        assert_eq!(config.again_limit, 255);
        // Out of range shifts are ignored
        assert_eq!(config.gain_shift, 18);
        let config = config.with_gain_shift(31).with_again_limit(40);
        assert_eq!(config.gain_shift, 31);
        assert_eq!(config.again_limit, 40);
    }

    #[test]
    fn address_debug() {
        assert_eq!(format!("{:?}", Address::new(0x0201)), "Address(0x0201)");
    }
}

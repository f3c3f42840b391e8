//! A pure-Rust driver for the exposure and mode control of OmniVision OV08A10 image sensors.
//!
//! The sensor is controlled over I²C using 16-bit register addresses and 8-bit values. This crate
//! takes care of identifying and resetting the sensor, programming operating modes, and keeping
//! the gain and shutter registers in step with what an auto-exposure loop asks for. Frames
//! themselves go out over a separate video interface (usually MIPI CSI-2), which is only
//! configured through the [`VideoInterface`][interface::VideoInterface] trait.
//!
//! This library uses the [`embedded-hal`][embedded-hal] traits for I²C, GPIO and delays, so it
//! should work on any platform with an `embedded-hal` implementation. It is also `no_std`
//! compatible, and doesn't allocate.
//!
//! [embedded-hal]: https://docs.rs/embedded-hal/0.2/embedded_hal/
//!
//! # Example
//! ```no_run
//! use linux_embedded_hal::{Delay, I2cdev, Pin};
//! use ov08a10::sequence::StaticSequences;
//! use ov08a10::{IntegrationTimes, Ov08a10Driver, SensorControl};
//!
//! # static SEQUENCES: &[&[(u16, u8)]] = &[];
//! let i2c_bus = I2cdev::new("/dev/i2c-1").expect("/dev/i2c-1 needs to be an I2C controller");
//! let reset = Pin::new(23);
//! // Register sequences come from the sensor vendor
//! let sequences = StaticSequences::new(SEQUENCES);
//! let mut sensor: Ov08a10Driver<_, _, _, _, ()> =
//!     Ov08a10Driver::new(i2c_bus, reset, Delay, sequences, ());
//! sensor.init()?;
//! // 1920x1080 at 30 fps
//! sensor.set_mode(1)?;
//! sensor.start_streaming()?;
//! // Then, for every frame:
//! let mut times = IntegrationTimes::linear(500);
//! sensor.allocate_integration_time(&mut times);
//! let _applied_gain = sensor.allocate_analog_gain(1 << 18);
//! sensor.update()?;
//! # Ok::<(), ov08a10::Error<I2cdev>>(())
//! ```
//!
//! # Exposure Control
//! Requested gains and integration times are *allocated*: converted into register units,
//! clamped to the current mode, and staged. They're written out by
//! [`update`][SensorControl::update], which should be called once per frame. See the [`common`]
//! module for more details, and [`exposure`] and [`commit`] for the low-level pieces.
//!
//! # Wide Dynamic Range
//! The exposure protocol supports the DOL2 and DOL3 wide dynamic range readouts, but the built in
//! mode table only has linear modes. WDR modes can be used by providing a custom mode table (with
//! [`SensorDriver::with_modes`]) along with register sequences for those modes.

#![no_std]

pub mod commit;
pub mod common;
pub mod controller;
pub mod driver;
pub mod error;
pub mod exposure;
pub mod interface;
pub mod mode;
pub mod ov08a10;
pub mod register;
pub mod sequence;
#[cfg(test)]
mod test;
mod util;

pub use common::{Address, SensorConfig, SensorControl, SensorModel};
pub use driver::SensorDriver;
pub use error::{Error, LibraryError};
pub use exposure::{IntegrationTimes, SensorStatus};
pub use mode::{BayerPattern, ModeTable, Resolution, SensorMode, SensorParameters, WdrMode};

pub type Ov08a10Driver<I2C, Rst, Dly, Seq, Vif> =
    SensorDriver<ov08a10::Ov08a10, I2C, Rst, Dly, Seq, Vif>;

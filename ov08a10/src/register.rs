// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Register access over I²C.
//!
//! The sensor's register space is addressed with 16-bit big-endian addresses, and every register
//! is a single byte. Values wider than a byte (shutters, for example) are split across a
//! [`RegisterPair`].
use embedded_hal::blocking::i2c;

use crate::common::Address;
use crate::error::{Error, LibraryError};
use crate::util::word_bytes;

/// A 16-bit value stored in two consecutive 8-bit registers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RegisterPair {
    /// The register holding bits 8 through 15.
    pub high: Address,

    /// The register holding bits 0 through 7.
    pub low: Address,
}

impl RegisterPair {
    /// The (address, value) writes needed to store `value`, high byte first.
    pub fn writes(&self, value: u32) -> [RegisterWrite; 2] {
        let (high, low) = word_bytes(value);
        [
            RegisterWrite::new(self.high, high),
            RegisterWrite::new(self.low, low),
        ]
    }
}

/// Define a `RegisterPair` constant named after a register, from the address of its low byte.
///
/// The high byte is always at the next address up on these sensors.
#[doc(hidden)]
#[macro_export]
macro_rules! register_pair {
    ($(#[$attr:meta])* $name:ident, $low:literal) => {
        ::paste::paste! {
            $(#[$attr])*
            pub const [< $name:upper >]: $crate::register::RegisterPair =
                $crate::register::RegisterPair {
                    high: $crate::common::Address::new($low + 1),
                    low: $crate::common::Address::new($low),
                };
        }
    };
}

/// A single pending register write.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RegisterWrite {
    pub address: Address,
    pub value: u8,
}

impl RegisterWrite {
    pub const fn new(address: Address, value: u8) -> Self {
        Self { address, value }
    }
}

/// Convert a diagnostic register address into an [`Address`].
///
/// Diagnostic accessors take the wider address type the image pipeline uses, so anything that
/// doesn't fit in 16 bits is rejected.
pub fn checked_address(address: u32) -> Result<Address, LibraryError> {
    u16::try_from(address)
        .map(Address::from)
        .map_err(|_| LibraryError::OutOfRange("Register addresses are limited to 16 bits"))
}

/// Read a single register.
pub fn read_register<I2C>(bus: &mut I2C, i2c_address: u8, register: Address) -> Result<u8, Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    let mut value = [0u8; 1];
    bus.write_read(i2c_address, &register.as_bytes(), &mut value)
        .map_err(Error::I2cWriteReadError)?;
    Ok(value[0])
}

/// Write a single register.
pub fn write_register<I2C>(
    bus: &mut I2C,
    i2c_address: u8,
    register: Address,
    value: u8,
) -> Result<(), Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    let address_bytes = register.as_bytes();
    let combined: [u8; 3] = [address_bytes[0], address_bytes[1], value];
    bus.write(i2c_address, &combined)
        .map_err(Error::I2cWriteError)
}

/// Perform a series of writes, stopping at the first failure.
pub fn write_registers<I2C>(
    bus: &mut I2C,
    i2c_address: u8,
    writes: &[RegisterWrite],
) -> Result<(), Error<I2C>>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    writes
        .iter()
        .try_for_each(|write| write_register(bus, i2c_address, write.address, write.value))
}

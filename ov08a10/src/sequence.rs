// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Loading vendor register sequences.
//!
//! Each mode is programmed by a fixed list of register writes supplied by the sensor vendor.
//! Sequences are identified by their ordinal, and the driver only ever asks for one by number.
use embedded_hal::blocking::i2c;
use log::debug;

use crate::common::Address;
use crate::error::{Error, LibraryError};
use crate::register::write_register;

/// Something that can program a numbered register sequence into a sensor.
pub trait SequenceLoader<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    fn load_sequence(
        &mut self,
        bus: &mut I2C,
        i2c_address: u8,
        sequence: u8,
    ) -> Result<(), Error<I2C>>;
}

/// A [`SequenceLoader`] backed by in-memory (address, value) tables.
///
/// Sequence `n` is `sequences[n]`.
#[derive(Clone, Copy, Debug)]
pub struct StaticSequences(&'static [&'static [(u16, u8)]]);

impl StaticSequences {
    pub const fn new(sequences: &'static [&'static [(u16, u8)]]) -> Self {
        Self(sequences)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<I2C> SequenceLoader<I2C> for StaticSequences
where
    I2C: i2c::WriteRead + i2c::Write,
{
    fn load_sequence(
        &mut self,
        bus: &mut I2C,
        i2c_address: u8,
        sequence: u8,
    ) -> Result<(), Error<I2C>> {
        let writes = self
            .0
            .get(usize::from(sequence))
            .ok_or(LibraryError::OutOfRange("No register sequence with that ordinal"))?;
        debug!("Loading register sequence {} ({} writes)", sequence, writes.len());
        writes.iter().try_for_each(|(address, value)| {
            write_register(bus, i2c_address, Address::new(*address), *value)
        })
    }
}

#[cfg(test)]
mod test {
    use ov08a10_test_data::{
        mock_ov08a10_at_address, EXAMPLE_SEQUENCES, SEQUENCE_MARKER_ADDRESS,
    };

    use super::*;

    #[test]
    fn loads_by_ordinal() {
        let mut bus = mock_ov08a10_at_address(0x36);
        let mut loader = StaticSequences::new(EXAMPLE_SEQUENCES);
        loader.load_sequence(&mut bus, 0x36, 3).unwrap();
        assert_eq!(bus.register(SEQUENCE_MARKER_ADDRESS), 3);
        let writes = bus.recent_writes();
        assert_eq!(writes.len(), EXAMPLE_SEQUENCES[3].len());
        assert_eq!(writes[..], EXAMPLE_SEQUENCES[3][..]);
    }

    #[test]
    fn missing_sequence() {
        let mut bus = mock_ov08a10_at_address(0x36);
        let mut loader = StaticSequences::new(EXAMPLE_SEQUENCES);
        let result = loader.load_sequence(&mut bus, 0x36, 200);
        assert!(matches!(
            result,
            Err(Error::LibraryError(LibraryError::OutOfRange(_)))
        ));
        assert!(bus.recent_operations().is_empty());
    }

    #[test]
    fn bus_failure_aborts_sequence() {
        let mut bus = mock_ov08a10_at_address(0x36);
        let (first_address, _) = EXAMPLE_SEQUENCES[1][0];
        bus.fail_writes_to(first_address);
        let mut loader = StaticSequences::new(EXAMPLE_SEQUENCES);
        let result = loader.load_sequence(&mut bus, 0x36, 1);
        assert!(result.unwrap_err().is_bus_failure());
        assert!(bus.recent_writes().is_empty());
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Mocks and example data for testing the `ov08a10` crate without hardware.
//!
//! The mocks share their state through `Rc<RefCell<_>>`, so a clone can be handed to a driver
//! while the original is kept around to inspect what the driver did.
use std::cell::{Cell, Ref, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::rc::Rc;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c;
use embedded_hal::digital::v2::OutputPin;

/// The chip ID reported by an OV08A10 in registers 0x300A through 0x300C.
pub const OV08A10_CHIP_ID: [u8; 3] = [0x53, 0x08, 0x41];

/// The first of the chip ID registers.
const CHIP_ID_ADDRESS: u16 = 0x300A;

const RECENT_OPERATIONS_QUEUE_LENGTH: usize = 256;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MockError {
    /// An unknown I2C address was given.
    UnknownI2cAddress(u8),

    /// A write to this register address was configured to fail.
    WriteFailed(u16),

    /// The transaction didn't look like a register access.
    ///
    /// Register writes are always a two byte address followed by a single value byte, and reads
    /// are a two byte address followed by a one byte read.
    IllegalOperation,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum I2cOperation {
    Write { address: u16, value: u8 },
    Read { address: u16 },
}

impl I2cOperation {
    pub fn is_write(&self) -> bool {
        matches!(self, I2cOperation::Write { .. })
    }
}

/// A fake sensor on an I²C bus, with a flat 16-bit register space of bytes.
#[derive(Clone, Debug)]
pub struct MockSensorBus {
    i2c_address: u8,
    registers: Rc<RefCell<BTreeMap<u16, u8>>>,
    failing_writes: Rc<RefCell<BTreeSet<u16>>>,
    /// Successful writes left before the next write fails, if armed.
    writes_until_failure: Rc<Cell<Option<usize>>>,
    /// Operations, oldest first.
    recent_operations: Rc<RefCell<VecDeque<I2cOperation>>>,
}

impl MockSensorBus {
    /// Create a mock sensor with the given chip ID programmed in.
    pub fn new(i2c_address: u8, chip_id: [u8; 3]) -> Self {
        let mut registers = BTreeMap::new();
        for (offset, byte) in chip_id.iter().enumerate() {
            registers.insert(CHIP_ID_ADDRESS + offset as u16, *byte);
        }
        Self {
            i2c_address,
            registers: Rc::new(RefCell::new(registers)),
            failing_writes: Rc::new(RefCell::new(BTreeSet::new())),
            writes_until_failure: Rc::new(Cell::new(None)),
            recent_operations: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    /// The current value of a register. Registers that have never been written read as 0.
    pub fn register(&self, address: u16) -> u8 {
        self.registers
            .borrow()
            .get(&address)
            .copied()
            .unwrap_or_default()
    }

    /// Read two registers as a big-endian word, `high` being the most significant byte.
    pub fn register_word(&self, high: u16, low: u16) -> u16 {
        u16::from_be_bytes([self.register(high), self.register(low)])
    }

    pub fn set_register(&self, address: u16, value: u8) {
        self.registers.borrow_mut().insert(address, value);
    }

    /// Make every write to `address` fail until [`MockSensorBus::clear_write_failures`].
    pub fn fail_writes_to(&self, address: u16) {
        self.failing_writes.borrow_mut().insert(address);
    }

    /// Make the `n`th write from now fail (counting from 1), whatever register it targets.
    ///
    /// Only a single write fails, later writes succeed again.
    pub fn fail_nth_write(&self, n: usize) {
        self.writes_until_failure.set(n.checked_sub(1));
    }

    /// Clear both per-register and counted write failures.
    pub fn clear_write_failures(&self) {
        self.failing_writes.borrow_mut().clear();
        self.writes_until_failure.set(None);
    }

    fn add_operation(&self, operation: I2cOperation) {
        let mut recent_ops = self.recent_operations.borrow_mut();
        recent_ops.push_back(operation);
        while recent_ops.len() > RECENT_OPERATIONS_QUEUE_LENGTH {
            recent_ops.pop_front();
        }
    }

    pub fn recent_operations(&self) -> Ref<VecDeque<I2cOperation>> {
        self.recent_operations.borrow()
    }

    /// Only the writes out of the recent operations, oldest first.
    pub fn recent_writes(&self) -> Vec<(u16, u8)> {
        self.recent_operations
            .borrow()
            .iter()
            .filter_map(|op| match op {
                I2cOperation::Write { address, value } => Some((*address, *value)),
                I2cOperation::Read { .. } => None,
            })
            .collect()
    }

    pub fn clear_recent_operations(&self) {
        self.recent_operations.borrow_mut().clear()
    }

    fn extract_address(bytes: &[u8]) -> Result<u16, MockError> {
        match bytes {
            [high, low, ..] => Ok(u16::from_be_bytes([*high, *low])),
            _ => Err(MockError::IllegalOperation),
        }
    }
}

impl i2c::Write for MockSensorBus {
    type Error = MockError;

    fn write(&mut self, i2c_address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        if i2c_address != self.i2c_address {
            return Err(MockError::UnknownI2cAddress(i2c_address));
        }
        if bytes.len() != 3 {
            return Err(MockError::IllegalOperation);
        }
        let address = Self::extract_address(bytes)?;
        if self.failing_writes.borrow().contains(&address) {
            return Err(MockError::WriteFailed(address));
        }
        match self.writes_until_failure.get() {
            Some(0) => {
                self.writes_until_failure.set(None);
                return Err(MockError::WriteFailed(address));
            }
            Some(remaining) => self.writes_until_failure.set(Some(remaining - 1)),
            None => (),
        }
        let value = bytes[2];
        self.set_register(address, value);
        self.add_operation(I2cOperation::Write { address, value });
        Ok(())
    }
}

impl i2c::WriteRead for MockSensorBus {
    type Error = MockError;

    fn write_read(
        &mut self,
        i2c_address: u8,
        write_buffer: &[u8],
        out_buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        if i2c_address != self.i2c_address {
            return Err(MockError::UnknownI2cAddress(i2c_address));
        }
        if write_buffer.len() != 2 || out_buffer.len() != 1 {
            return Err(MockError::IllegalOperation);
        }
        let address = Self::extract_address(write_buffer)?;
        self.add_operation(I2cOperation::Read { address });
        out_buffer[0] = self.register(address);
        Ok(())
    }
}

/// A mock OV08A10 at the given address, reporting the correct chip ID.
pub fn mock_ov08a10_at_address(i2c_address: u8) -> MockSensorBus {
    MockSensorBus::new(i2c_address, OV08A10_CHIP_ID)
}

/// A GPIO line that remembers every level it was driven to.
#[derive(Clone, Debug, Default)]
pub struct MockPin {
    /// `true` for high, oldest first.
    levels: Rc<RefCell<Vec<bool>>>,
}

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn levels(&self) -> Ref<Vec<bool>> {
        self.levels.borrow()
    }

    pub fn clear(&self) {
        self.levels.borrow_mut().clear()
    }
}

impl OutputPin for MockPin {
    type Error = core::convert::Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}

/// A delay that doesn't, but keeps a log of what was requested.
#[derive(Clone, Debug, Default)]
pub struct MockDelay {
    total_ms: Rc<Cell<u32>>,
    requests: Rc<RefCell<Vec<u16>>>,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sum of all requested delays, in milliseconds.
    pub fn total_ms(&self) -> u32 {
        self.total_ms.get()
    }

    pub fn requests(&self) -> Ref<Vec<u16>> {
        self.requests.borrow()
    }
}

impl DelayMs<u16> for MockDelay {
    fn delay_ms(&mut self, ms: u16) {
        self.total_ms.set(self.total_ms.get() + u32::from(ms));
        self.requests.borrow_mut().push(ms);
    }
}

/// A stand-in for the vendor register sequences.
///
/// The real sequences are several hundred writes long. These only touch a few registers, each
/// sequence writing its own ordinal to 0x3501 so tests can tell which one was loaded. Ordinal 0 is
/// a software reset that no mode uses, 1 through 5 are the linear modes, and 6 and 7 are the DOL
/// test modes.
pub static EXAMPLE_SEQUENCES: &[&[(u16, u8)]] = &[
    &[(0x0103, 0x01), (0x3501, 0x00)],
    &[(0x0100, 0x00), (0x3501, 0x01), (0x380C, 0x05), (0x380D, 0x20)],
    &[(0x0100, 0x00), (0x3501, 0x02), (0x380C, 0x07), (0x380D, 0xA0)],
    &[(0x0100, 0x00), (0x3501, 0x03), (0x380C, 0x07), (0x380D, 0xA0)],
    &[(0x0100, 0x00), (0x3501, 0x04), (0x380C, 0x0F), (0x380D, 0x20)],
    &[(0x0100, 0x00), (0x3501, 0x05), (0x380C, 0x0F), (0x380D, 0x20)],
    &[(0x0100, 0x00), (0x3501, 0x06), (0x3821, 0x04)],
    &[(0x0100, 0x00), (0x3501, 0x07), (0x3821, 0x08)],
];

/// The register each example sequence writes its ordinal to.
pub const SEQUENCE_MARKER_ADDRESS: u16 = 0x3501;

#[cfg(test)]
mod test {
    use super::*;
    use embedded_hal::blocking::i2c::{Write, WriteRead};

    #[test]
    fn write_then_read() {
        let mut bus = mock_ov08a10_at_address(0x36);
        bus.write(0x36, &[0x02, 0x14, 0x11]).unwrap();
        let mut out = [0u8];
        bus.write_read(0x36, &[0x02, 0x14], &mut out).unwrap();
        assert_eq!(out[0], 0x11);
        assert_eq!(
            bus.recent_operations().iter().copied().collect::<Vec<_>>(),
            vec![
                I2cOperation::Write {
                    address: 0x0214,
                    value: 0x11
                },
                I2cOperation::Read { address: 0x0214 },
            ]
        );
    }

    #[test]
    fn wrong_device_address() {
        let mut bus = mock_ov08a10_at_address(0x36);
        assert_eq!(
            bus.write(0x10, &[0x01, 0x00, 0x01]),
            Err(MockError::UnknownI2cAddress(0x10))
        );
    }

    #[test]
    fn injected_failure() {
        let mut bus = mock_ov08a10_at_address(0x36);
        bus.fail_writes_to(0x0100);
        assert_eq!(
            bus.write(0x36, &[0x01, 0x00, 0x01]),
            Err(MockError::WriteFailed(0x0100))
        );
        assert!(bus.recent_operations().is_empty());
        bus.clear_write_failures();
        assert!(bus.write(0x36, &[0x01, 0x00, 0x01]).is_ok());
    }

    #[test]
    fn counted_failure() {
        let mut bus = mock_ov08a10_at_address(0x36);
        bus.fail_nth_write(2);
        assert!(bus.write(0x36, &[0x02, 0x01, 0x01]).is_ok());
        assert_eq!(
            bus.write(0x36, &[0x02, 0x20, 0x05]),
            Err(MockError::WriteFailed(0x0220))
        );
        assert!(bus.write(0x36, &[0x02, 0x20, 0x05]).is_ok());
        assert_eq!(bus.recent_operations().len(), 2);
    }

    #[test]
    fn chip_id_preloaded() {
        let bus = mock_ov08a10_at_address(0x36);
        assert_eq!(bus.register(0x300A), 0x53);
        assert_eq!(bus.register(0x300B), 0x08);
        assert_eq!(bus.register(0x300C), 0x41);
    }
}

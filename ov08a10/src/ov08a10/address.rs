// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use core::convert::TryFrom;

use num_enum::{IntoPrimitive, TryFromPrimitive, TryFromPrimitiveError};

use crate::common::Address;
use crate::register_pair;

/// Single byte control registers of the OV08A10.

// NOTE: To make it easier to compare against the datasheet, discriminant values should *always* be
// explicitly written out.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub(crate) enum ControlRegister {
    /// Bit 0 starts (1) or stops (0) streaming.
    StreamControl = 0x0100,

    /// Writes made while this is 1 are held, and applied together on the frame after it is set
    /// back to 0.
    GroupHold = 0x0201,

    /// Analog gain step.
    AnalogGain = 0x0214,

    /// Most significant byte of the chip ID.
    ChipIdHigh = 0x300A,

    ChipIdMiddle = 0x300B,

    /// Least significant byte of the chip ID.
    ChipIdLow = 0x300C,
}

impl TryFrom<Address> for ControlRegister {
    type Error = TryFromPrimitiveError<Self>;

    fn try_from(value: Address) -> Result<Self, Self::Error> {
        let raw_address = u16::from(value);
        Self::try_from(raw_address)
    }
}

impl From<ControlRegister> for Address {
    fn from(register: ControlRegister) -> Self {
        let raw_address = register as u16;
        raw_address.into()
    }
}

impl ControlRegister {
    pub(crate) const fn address(self) -> Address {
        Address::new(self as u16)
    }
}

register_pair!(
    /// Shutter for linear modes, and for the medium exposure of DOL modes.
    shs1,
    0x0220
);

register_pair!(
    /// Shutter for the short DOL exposure.
    shs2,
    0x0224
);

register_pair!(
    /// Shutter for the long DOL exposure.
    shs3,
    0x0228
);

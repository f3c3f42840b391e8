// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

/// Prevent [`SensorModel`][crate::common::SensorModel] from being implemented outside of this
/// crate, as the register protocol in [`commit`][crate::commit] assumes a specific layout.
pub trait Sealed {}

/// Split a shutter value into the (most significant, least significant) bytes written to a
/// register pair.
///
/// Only the lower 16 bits are used, matching the width of the sensor's shutter registers.
pub(crate) fn word_bytes(value: u32) -> (u8, u8) {
    (((value >> 8) & 0xFF) as u8, (value & 0xFF) as u8)
}

/// Integer division, rounding up. `divisor` must be non-zero.
pub(crate) fn div_ceil(dividend: u32, divisor: u32) -> u32 {
    let quotient = dividend / divisor;
    if dividend % divisor != 0 {
        quotient + 1
    } else {
        quotient
    }
}

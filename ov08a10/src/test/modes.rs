// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use crate::mode::{BayerPattern, Resolution, SensorMode, WdrMode};
use crate::ov08a10::Ov08a10;
use crate::SensorModel;

const fn wdr_mode(wdr_mode: WdrMode, exposures: u8, sequence: u8) -> SensorMode {
    SensorMode {
        wdr_mode,
        fps: 30 * 256,
        resolution: Resolution::new(1920, 1080),
        bits: 12,
        exposures,
        lanes: 4,
        bps: 1440,
        sequence,
        bayer: BayerPattern::Bggr,
    }
}

/// A 1080p DOL2 mode, programmed by example sequence 6.
pub(crate) const fn dol2_mode() -> SensorMode {
    wdr_mode(WdrMode::Dol2, 2, 6)
}

/// A 1080p DOL3 mode, programmed by example sequence 7.
pub(crate) const fn dol3_mode() -> SensorMode {
    wdr_mode(WdrMode::Dol3, 3, 7)
}

/// The built in modes, followed by DOL2 (index 5) and DOL3 (index 6).
pub(crate) static MODES_WITH_WDR: [SensorMode; 7] = [
    Ov08a10::MODES[0],
    Ov08a10::MODES[1],
    Ov08a10::MODES[2],
    Ov08a10::MODES[3],
    Ov08a10::MODES[4],
    dol2_mode(),
    dol3_mode(),
];

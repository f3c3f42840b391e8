// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Frame geometry and timing for a mode.
//!
//! This is the pure half of a mode change. The [driver][crate::driver] handles the hardware side
//! (reset, register sequence and video receiver) and calls [`apply_mode`] in between.
use crate::common::SensorModel;
use crate::error::LibraryError;
use crate::exposure::{IntegrationTimes, SensorState};
use crate::mode::{Resolution, SensorMode, SensorParameters, WdrMode};

/// Check that a mode can be used with a sensor model.
pub fn check_mode<M: SensorModel>(mode: &SensorMode) -> Result<(), LibraryError> {
    mode.validate()?;
    if M::supports(mode.wdr_mode) {
        Ok(())
    } else {
        Err(LibraryError::InvalidMode(
            "WDR variant is not supported by this sensor",
        ))
    }
}

/// The full frame size of a mode, blanking included.
pub fn total_size<M: SensorModel>(mode: &SensorMode) -> Resolution {
    Resolution::new(
        mode.resolution.width + M::HORIZONTAL_BLANKING,
        mode.resolution.height + M::VERTICAL_BLANKING,
    )
}

/// Recompute the derived parameters and timing state for `mode`.
///
/// `index` is the mode's position in the mode table. Nothing is written to the sensor.
pub fn apply_mode<M: SensorModel>(
    state: &mut SensorState,
    params: &mut SensorParameters,
    index: usize,
    mode: &SensorMode,
) {
    let total = total_size::<M>(mode);
    params.active = mode.resolution;
    params.total = total;
    params.pixels_per_line = total.width;
    params.lines_per_second = state.pixel_clock / total.width;
    params.integration_time_min = M::MIN_INTEGRATION_TIME;
    state.vmax = total.height;

    match mode.wdr_mode {
        WdrMode::Linear => {
            state.again_delay = 2;
            params.integration_time_max = total.height - 2;
            params.integration_time_limit = M::MAX_INTEGRATION_TIME_LIMIT;
        }
        WdrMode::Dol2 | WdrMode::Dol3 => {
            state.again_delay = 0;
            params.integration_time_max = M::WDR_INTEGRATION_TIME_MAX;
            params.integration_time_limit = M::WDR_INTEGRATION_TIME_MAX;
            params.integration_time_long_max = (total.height << 1).saturating_sub(256);
            if mode.wdr_mode == WdrMode::Dol2 {
                params.lines_per_second >>= 1;
                state.frame = state.vmax << 1;
                state.shutter.rhs1 = total.height;
                state.shutter.rhs2 = total.height;
            } else {
                params.lines_per_second >>= 2;
                state.frame = total.height << 2;
                state.shutter.rhs1 = total.height;
                state.shutter.rhs2 = total.height << 1;
            }
            let wdr_max = clamp_u16(M::WDR_INTEGRATION_TIME_MAX);
            state.plane_max =
                IntegrationTimes::new(wdr_max, wdr_max, clamp_u16(params.integration_time_long_max));
        }
    }
    // The per-branch limits above are always superseded.
    params.integration_time_limit = M::MAX_INTEGRATION_TIME_LIMIT;
    params.integration_time_apply_delay = 2;
    params.isp_exposure_channel_delay = 0;

    params.sensor_exp_number = mode.exposures;
    params.mode = index;
    params.wdr_mode = mode.wdr_mode;
    params.bayer = mode.bayer;
    state.wdr_mode = mode.wdr_mode;
}

fn clamp_u16(value: u32) -> u16 {
    value.min(u32::from(u16::MAX)) as u16
}

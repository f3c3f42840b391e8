// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Staging of gain and integration time requests.
//!
//! Requests from the image pipeline are converted into register units and clamped to the limits
//! of the current mode. A value is only *staged* when it differs from what is already staged, and
//! staging arms a pending counter. The [commit scheduler][crate::commit] replays the staged value
//! until that counter runs out, so a change reaches the sensor even when the register has to be
//! re-asserted on several consecutive frames.
use log::trace;

use crate::mode::WdrMode;

/// The largest gain step that fits in the analog gain register.
pub const MAX_GAIN_STEP: u16 = u8::MAX as u16;

/// The largest fixed-point shift gain values may use.
pub const MAX_GAIN_SHIFT: u32 = 31;

/// Integration times (in lines) for each of the exposures in a frame.
///
/// Linear modes only use `short`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IntegrationTimes {
    pub short: u16,
    pub medium: u16,
    pub long: u16,
}

impl IntegrationTimes {
    pub const fn new(short: u16, medium: u16, long: u16) -> Self {
        Self {
            short,
            medium,
            long,
        }
    }

    /// Integration times for a linear mode.
    pub const fn linear(time: u16) -> Self {
        Self::new(time, 0, 0)
    }
}

/// The lifecycle of a sensor, as seen by the driver.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SensorStatus {
    /// The driver has been created, but the sensor hasn't been identified or reset yet.
    Uninitialized,

    /// The sensor is configured, but not sending frames. Mode changes are only allowed here.
    Idle,

    Streaming,
}

/// The recent history of staged analog gain steps.
///
/// The sensor applies analog gain a few frames after it is written. To keep gain and integration
/// time changes aligned on the same output frame, gain values are kept here and written out
/// `delay` frames after they were staged. Slot 0 holds the newest staged value, and each
/// [`shift`][GainHistory::shift] (one per frame) moves every value one slot older.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GainHistory([u16; GainHistory::DEPTH]);

impl GainHistory {
    pub const DEPTH: usize = 4;

    /// The newest staged value.
    pub fn pending(&self) -> u16 {
        self.0[0]
    }

    /// The value staged `age` frames ago, if the history goes back that far.
    pub fn get(&self, age: usize) -> Option<u16> {
        self.0.get(age).copied()
    }

    /// The value to write for a pipeline delay of `delay` frames.
    ///
    /// Delays beyond the history depth use the oldest value.
    pub fn delayed(&self, delay: u8) -> u16 {
        self.0[usize::from(delay).min(Self::DEPTH - 1)]
    }

    pub(crate) fn stage(&mut self, value: u16) {
        self.0[0] = value;
    }

    /// Age every entry by one frame. Slot 0 is left as is, so the pending value carries forward
    /// until something new is staged.
    pub(crate) fn shift(&mut self) {
        self.0.copy_within(0..(Self::DEPTH - 1), 1);
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.0[..]
    }
}

/// The shutter registers, along with the DOL timing they are computed from.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ShutterState {
    /// Linear shutter, or the medium exposure shutter for DOL.
    pub shs1: u32,

    /// Short exposure shutter (DOL only).
    pub shs2: u32,

    /// Long exposure shutter (DOL only).
    pub shs3: u32,

    /// `shs1` as of the end of the previous frame.
    pub shs1_old: u32,

    /// `shs2` as of the end of the previous frame.
    pub shs2_old: u32,

    /// Readout boundary the medium exposure is measured from.
    pub rhs1: u32,

    /// Readout boundary the short exposure is measured from.
    pub rhs2: u32,
}

/// All of the mutable state of a single sensor.
///
/// There is exactly one of these per physical sensor, owned by its driver.
#[derive(Clone, Debug)]
pub struct SensorState {
    pub(crate) status: SensorStatus,

    pub(crate) wdr_mode: WdrMode,

    /// Staged integration times, as clamped.
    pub(crate) integration: IntegrationTimes,

    pub(crate) shutter: ShutterState,

    /// Frame length in lines.
    pub(crate) vmax: u32,

    /// Extended frame length of DOL modes, in lines.
    pub(crate) frame: u32,

    /// Per-exposure maximum integration times for DOL modes.
    pub(crate) plane_max: IntegrationTimes,

    pub(crate) pixel_clock: u32,

    pub(crate) again: GainHistory,

    /// How many frames the analog gain write lags behind staging.
    pub(crate) again_delay: u8,

    pub(crate) again_limit: u16,

    /// Frames an integration time write is still owed for.
    pub(crate) int_cnt: u8,

    /// Frames a gain write is still owed for.
    pub(crate) gain_cnt: u8,
}

impl SensorState {
    pub fn new(again_limit: u16, pixel_clock: u32) -> Self {
        let again_limit = again_limit.min(MAX_GAIN_STEP);
        Self {
            status: SensorStatus::Uninitialized,
            wdr_mode: WdrMode::Linear,
            integration: IntegrationTimes::default(),
            shutter: ShutterState::default(),
            vmax: 0,
            frame: 0,
            plane_max: IntegrationTimes::default(),
            pixel_clock,
            again: GainHistory::default(),
            again_delay: 0,
            again_limit,
            int_cnt: 0,
            gain_cnt: 0,
        }
    }

    pub fn status(&self) -> SensorStatus {
        self.status
    }

    pub fn wdr_mode(&self) -> WdrMode {
        self.wdr_mode
    }

    pub fn staged_integration(&self) -> IntegrationTimes {
        self.integration
    }

    pub fn shutter(&self) -> &ShutterState {
        &self.shutter
    }

    pub fn vmax(&self) -> u32 {
        self.vmax
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn gain_history(&self) -> &GainHistory {
        &self.again
    }

    pub fn again_delay(&self) -> u8 {
        self.again_delay
    }

    pub fn again_limit(&self) -> u16 {
        self.again_limit
    }

    /// Frames of integration time writes still owed to the sensor.
    pub fn integration_pending(&self) -> u8 {
        self.int_cnt
    }

    /// Frames of analog gain writes still owed to the sensor.
    pub fn gain_pending(&self) -> u8 {
        self.gain_cnt
    }

    /// Whether the next [update][crate::SensorControl::update] will write anything.
    pub fn has_pending(&self) -> bool {
        self.int_cnt != 0 || self.gain_cnt != 0
    }

    /// Convert a log2 gain into an analog gain step and stage it.
    ///
    /// The step is `(gain * scale) >> shift`, limited to `0..=again_limit`. The returned value is
    /// the gain that step actually represents, converted back into the log2 domain.
    ///
    /// Shifts past [`MAX_GAIN_SHIFT`] are treated as `MAX_GAIN_SHIFT`, and the applied gain
    /// saturates at `i32::MAX`.
    pub fn allocate_analog_gain(&mut self, gain: i32, scale: i32, shift: u32) -> i32 {
        let shift = shift.min(MAX_GAIN_SHIFT);
        let scale = if scale == 0 { 1 } else { i64::from(scale) };
        let requested = (i64::from(gain) * scale) >> shift;
        let step = requested.clamp(0, i64::from(self.again_limit)) as u16;
        if self.again.pending() != step {
            self.gain_cnt = self.again_delay + 1;
            self.again.stage(step);
            trace!("Staged analog gain step {} (requested {})", step, requested);
        }
        let applied = (i64::from(step) << shift) / scale;
        i32::try_from(applied).unwrap_or(i32::MAX)
    }

    /// There's no digital gain stage on these sensors, so none is ever applied.
    pub fn allocate_digital_gain(&mut self, _gain: i32) -> i32 {
        0
    }

    /// Clamp integration times to the current mode's limits and stage them.
    pub fn allocate_integration_time(&mut self, times: &mut IntegrationTimes) {
        match self.wdr_mode {
            WdrMode::Linear => self.allocate_linear(times),
            WdrMode::Dol2 | WdrMode::Dol3 => self.allocate_dol(times),
        }
    }

    fn allocate_linear(&mut self, times: &mut IntegrationTimes) {
        let upper = self.vmax.saturating_sub(2);
        // Upper bound first, so a degenerate frame length still leaves a time of 1 line.
        let clamped = u32::from(times.short).min(upper).max(1);
        times.short = clamped as u16;
        let shutter = self.vmax.saturating_sub(clamped + 1);
        if self.shutter.shs1 != shutter {
            self.int_cnt = 2;
            self.shutter.shs1 = shutter;
            self.integration = IntegrationTimes::linear(times.short);
            trace!("Staged linear shutter {} ({} lines)", shutter, times.short);
        }
    }

    fn allocate_dol(&mut self, times: &mut IntegrationTimes) {
        times.short = times.short.max(2).min(self.plane_max.short);
        times.medium = times.medium.max(2).min(self.plane_max.medium);
        times.long = times.long.max(2).min(self.plane_max.long);

        if self.integration != *times {
            self.int_cnt = 3;
            self.integration = *times;
            self.shutter.shs3 = self.frame.saturating_sub(u32::from(times.long) + 1);
            self.shutter.shs1 = self.shutter.rhs1.saturating_sub(u32::from(times.medium) + 1);
            self.shutter.shs2 = self.shutter.rhs2.saturating_sub(u32::from(times.short) + 1);
            trace!(
                "Staged DOL shutters {}/{}/{}",
                self.shutter.shs1,
                self.shutter.shs2,
                self.shutter.shs3
            );
        }
    }

    /// Forget everything staged for the sensor.
    ///
    /// Loading a register sequence overwrites the gain and shutter registers, so after a mode
    /// change nothing staged before it reflects what the sensor holds.
    pub(crate) fn discard_staged(&mut self) {
        self.integration = IntegrationTimes::default();
        self.shutter = ShutterState::default();
        self.frame = 0;
        self.plane_max = IntegrationTimes::default();
        self.again = GainHistory::default();
        self.int_cnt = 0;
        self.gain_cnt = 0;
    }

    /// The linear integration time the staged shutter value represents.
    pub fn linear_integration_time(&self) -> u32 {
        self.vmax.saturating_sub(self.shutter.shs1 + 1)
    }

    /// Advance the pipeline model by one frame.
    ///
    /// This happens every frame, whether or not anything was written.
    pub(crate) fn advance_frame(&mut self) {
        self.shutter.shs1_old = self.shutter.shs1;
        self.shutter.shs2_old = self.shutter.shs2;
        self.again.shift();
    }
}

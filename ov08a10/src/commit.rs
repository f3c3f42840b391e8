// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Per-frame commit of staged exposure values.
//!
//! Everything staged by the allocators is written inside a single group-hold bracket, so the
//! sensor latches gain and shutter changes on the same frame.
use arrayvec::ArrayVec;
use embedded_hal::blocking::i2c;
use log::{trace, warn};

use crate::common::SensorModel;
use crate::error::Error;
use crate::exposure::SensorState;
use crate::mode::WdrMode;
use crate::register::{write_register, write_registers, RegisterWrite};

/// The most writes a single bracket carries (one gain write and three shutter pairs).
pub const MAX_PAYLOAD: usize = 8;

/// The register writes the next commit would make, not counting the group-hold bracket.
pub fn pending_writes<M: SensorModel>(state: &SensorState) -> ArrayVec<RegisterWrite, MAX_PAYLOAD> {
    let mut writes = ArrayVec::new();
    if state.gain_cnt != 0 {
        let step = state.again.delayed(state.again_delay);
        // The gain limit is capped to the register width when the state is created.
        let step = u8::try_from(step).unwrap_or(u8::MAX);
        writes.push(RegisterWrite::new(M::ANALOG_GAIN, step));
    }
    if state.int_cnt != 0 {
        let shutter = &state.shutter;
        match state.wdr_mode {
            WdrMode::Linear => writes.extend(M::SHS1.writes(shutter.shs1)),
            WdrMode::Dol2 | WdrMode::Dol3 => {
                writes.extend(M::SHS3.writes(shutter.shs3));
                // The medium and short shutters lag one frame behind the long one.
                writes.extend(M::SHS1.writes(shutter.shs1_old));
                writes.extend(M::SHS2.writes(shutter.shs2_old));
            }
        }
    }
    writes
}

/// Write any staged values, then advance the state by one frame.
///
/// Returns `Ok(true)` if a group-hold bracket was written. When a write fails the group hold is
/// still released, and the pending counters are left alone so the next call tries again.
pub fn commit<M, I2C>(
    state: &mut SensorState,
    bus: &mut I2C,
    i2c_address: u8,
) -> Result<bool, Error<I2C>>
where
    M: SensorModel,
    I2C: i2c::WriteRead + i2c::Write,
{
    let result = if state.has_pending() {
        let payload = pending_writes::<M>(state);
        trace!(
            "Committing {} writes (gain {}, integration {})",
            payload.len(),
            state.gain_cnt,
            state.int_cnt
        );
        let held = write_register(bus, i2c_address, M::GROUP_HOLD, 1)
            .and_then(|_| write_registers(bus, i2c_address, &payload));
        let released = write_register(bus, i2c_address, M::GROUP_HOLD, 0);
        match held.and(released) {
            Ok(_) => {
                state.gain_cnt = state.gain_cnt.saturating_sub(1);
                state.int_cnt = state.int_cnt.saturating_sub(1);
                Ok(true)
            }
            Err(err) => {
                warn!(
                    "Failed to commit exposure to the {} (bus failure: {})",
                    M::NAME,
                    err.is_bus_failure()
                );
                Err(err)
            }
        }
    } else {
        Ok(false)
    };
    state.advance_frame();
    result
}

#[cfg(test)]
mod test {
    use ov08a10_test_data::{mock_ov08a10_at_address, I2cOperation, MockSensorBus};

    use super::*;
    use crate::exposure::{IntegrationTimes, SensorStatus};
    use crate::ov08a10::Ov08a10;

    const I2C_ADDRESS: u8 = 0x36;

    fn linear_state() -> SensorState {
        let mut state = SensorState::new(20, 148_500_000);
        state.status = SensorStatus::Streaming;
        state.vmax = 1120;
        state.again_delay = 2;
        state
    }

    fn dol3_state() -> SensorState {
        let mut state = SensorState::new(20, 148_500_000);
        state.status = SensorStatus::Streaming;
        state.wdr_mode = WdrMode::Dol3;
        state.vmax = 1120;
        state.frame = 4480;
        state.shutter.rhs1 = 1120;
        state.shutter.rhs2 = 2240;
        state.plane_max = IntegrationTimes::new(60, 60, 1984);
        state
    }

    fn tick(state: &mut SensorState, bus: &mut MockSensorBus) -> Result<bool, Error<MockSensorBus>> {
        commit::<Ov08a10, _>(state, bus, I2C_ADDRESS)
    }

    fn gain_writes(bus: &MockSensorBus) -> usize {
        bus.recent_writes()
            .iter()
            .filter(|(address, _)| *address == 0x0214)
            .count()
    }

    #[test]
    fn idle_tick_is_silent() {
        let mut state = linear_state();
        let mut bus = mock_ov08a10_at_address(I2C_ADDRESS);
        assert_eq!(tick(&mut state, &mut bus), Ok(false));
        assert!(bus.recent_operations().is_empty());
    }

    #[test]
    fn linear_bracket() {
        let mut state = linear_state();
        let mut bus = mock_ov08a10_at_address(I2C_ADDRESS);
        let mut times = IntegrationTimes::linear(500);
        state.allocate_integration_time(&mut times);
        assert_eq!(tick(&mut state, &mut bus), Ok(true));
        // 1120 - 500 - 1 = 619 = 0x026B
        assert_eq!(
            bus.recent_writes(),
            [(0x0201, 1), (0x0221, 0x02), (0x0220, 0x6B), (0x0201, 0)]
        );
        assert_eq!(state.integration_pending(), 1);
        assert_eq!(bus.register_word(0x0221, 0x0220), 619);
    }

    #[test]
    fn integration_written_twice() {
        let mut state = linear_state();
        let mut bus = mock_ov08a10_at_address(I2C_ADDRESS);
        let mut times = IntegrationTimes::linear(500);
        state.allocate_integration_time(&mut times);
        assert_eq!(tick(&mut state, &mut bus), Ok(true));
        assert_eq!(tick(&mut state, &mut bus), Ok(true));
        assert_eq!(tick(&mut state, &mut bus), Ok(false));
        let brackets = bus
            .recent_operations()
            .iter()
            .filter(|op| {
                **op == I2cOperation::Write {
                    address: 0x0201,
                    value: 1,
                }
            })
            .count();
        assert_eq!(brackets, 2);
    }

    #[test]
    fn gain_counter_exhaustion() {
        let mut state = linear_state();
        let mut bus = mock_ov08a10_at_address(I2C_ADDRESS);
        state.allocate_analog_gain(128, 20, 8);
        let expected_ticks = usize::from(state.again_delay()) + 1;
        for expected in 1..=expected_ticks {
            assert_eq!(tick(&mut state, &mut bus), Ok(true));
            // Exactly one gain write per tick
            assert_eq!(gain_writes(&bus), expected);
        }
        assert_eq!(state.gain_pending(), 0);
        assert_eq!(tick(&mut state, &mut bus), Ok(false));
        assert_eq!(gain_writes(&bus), expected_ticks);
    }

    #[test]
    fn gain_follows_history_delay() {
        let mut state = linear_state();
        let mut bus = mock_ov08a10_at_address(I2C_ADDRESS);
        state.allocate_analog_gain(128, 20, 8);
        // Step 10, delayed two frames
        let written: [u8; 3] = [0, 1, 2].map(|_| {
            bus.clear_recent_operations();
            tick(&mut state, &mut bus).unwrap();
            bus.recent_writes()
                .iter()
                .find(|(address, _)| *address == 0x0214)
                .map(|(_, value)| *value)
                .unwrap()
        });
        assert_eq!(written, [0, 0, 10]);
    }

    #[test]
    fn history_shifts_on_silent_ticks() {
        let mut state = linear_state();
        let mut bus = mock_ov08a10_at_address(I2C_ADDRESS);
        state.allocate_analog_gain(128, 20, 8);
        state.gain_cnt = 0;
        tick(&mut state, &mut bus).unwrap();
        assert_eq!(state.gain_history().as_slice(), &[10, 10, 0, 0]);
        tick(&mut state, &mut bus).unwrap();
        assert_eq!(state.gain_history().as_slice(), &[10, 10, 10, 0]);
        assert!(bus.recent_operations().is_empty());
    }

    #[test]
    fn dol_shadow_lag() {
        let mut state = dol3_state();
        let mut bus = mock_ov08a10_at_address(I2C_ADDRESS);
        let mut times = IntegrationTimes::new(10, 40, 1000);
        state.allocate_integration_time(&mut times);
        let shs1 = state.shutter().shs1;
        let shs2 = state.shutter().shs2;
        let shs3 = state.shutter().shs3;

        tick(&mut state, &mut bus).unwrap();
        // Long shutter applies straight away, the others were still 0 last frame.
        assert_eq!(bus.register_word(0x0229, 0x0228), shs3 as u16);
        assert_eq!(bus.register_word(0x0221, 0x0220), 0);
        assert_eq!(bus.register_word(0x0225, 0x0224), 0);

        tick(&mut state, &mut bus).unwrap();
        assert_eq!(bus.register_word(0x0221, 0x0220), shs1 as u16);
        assert_eq!(bus.register_word(0x0225, 0x0224), shs2 as u16);
    }

    #[test]
    fn dol_payload_order() {
        let mut state = dol3_state();
        let mut times = IntegrationTimes::new(10, 40, 1000);
        state.allocate_integration_time(&mut times);
        state.allocate_analog_gain(64, 20, 8);
        let addresses: ArrayVec<u16, MAX_PAYLOAD> = pending_writes::<Ov08a10>(&state)
            .iter()
            .map(|write| write.address.into())
            .collect();
        assert_eq!(
            addresses.as_slice(),
            &[0x0214, 0x0229, 0x0228, 0x0221, 0x0220, 0x0225, 0x0224]
        );
    }

    #[test]
    fn failed_commit_retries() {
        let mut state = linear_state();
        let mut bus = mock_ov08a10_at_address(I2C_ADDRESS);
        state.allocate_analog_gain(128, 20, 8);
        let mut times = IntegrationTimes::linear(500);
        state.allocate_integration_time(&mut times);
        bus.fail_writes_to(0x0214);

        let result = tick(&mut state, &mut bus);
        assert!(result.unwrap_err().is_bus_failure());
        // The hold was still released, and nothing after the failure was written.
        assert_eq!(bus.recent_writes(), [(0x0201, 1), (0x0201, 0)]);
        assert_eq!(state.gain_pending(), 3);
        assert_eq!(state.integration_pending(), 2);

        bus.clear_write_failures();
        bus.clear_recent_operations();
        assert_eq!(tick(&mut state, &mut bus), Ok(true));
        assert_eq!(state.gain_pending(), 2);
        assert_eq!(state.integration_pending(), 1);
    }

    #[test]
    fn failed_hold_release() {
        let mut state = linear_state();
        let mut bus = mock_ov08a10_at_address(I2C_ADDRESS);
        let mut times = IntegrationTimes::linear(500);
        state.allocate_integration_time(&mut times);
        // Hold start, two shutter bytes, then the hold release fails.
        bus.fail_nth_write(4);

        let result = tick(&mut state, &mut bus);
        assert!(result.unwrap_err().is_bus_failure());
        assert_eq!(
            bus.recent_writes(),
            [(0x0201, 1), (0x0221, 0x02), (0x0220, 0x6B)]
        );
        assert_eq!(state.integration_pending(), 2);

        bus.clear_recent_operations();
        assert_eq!(tick(&mut state, &mut bus), Ok(true));
        assert_eq!(
            bus.recent_writes(),
            [(0x0201, 1), (0x0221, 0x02), (0x0220, 0x6B), (0x0201, 0)]
        );
        assert_eq!(state.integration_pending(), 1);
    }

    #[test]
    fn failed_hold_start() {
        let mut state = linear_state();
        let mut bus = mock_ov08a10_at_address(I2C_ADDRESS);
        state.allocate_analog_gain(128, 20, 8);
        bus.fail_writes_to(0x0201);
        assert!(tick(&mut state, &mut bus).is_err());
        // Neither the payload nor a successful release reached the sensor.
        assert!(bus.recent_operations().is_empty());
        assert_eq!(bus.register(0x0214), 0);
        assert_eq!(state.gain_pending(), 3);
    }
}

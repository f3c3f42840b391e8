// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

use core::marker::PhantomData;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c;
use embedded_hal::digital::v2::OutputPin;
use log::{debug, info, warn};

use crate::commit::commit;
use crate::common::{SensorConfig, SensorControl, SensorModel};
use crate::controller::{apply_mode, check_mode};
use crate::error::{Error, LibraryError};
use crate::exposure::{IntegrationTimes, SensorState, SensorStatus};
use crate::interface::{InterfaceConfig, VideoInterface};
use crate::mode::{ModeTable, SensorMode, SensorParameters};
use crate::register::{checked_address, read_register, write_register};
use crate::sequence::SequenceLoader;

/// How long the reset line is held during initialization, in milliseconds.
const INIT_RESET_MS: u16 = 1;

/// How long the reset line is held (and then waited on) before loading a mode, in milliseconds.
const MODE_RESET_MS: u16 = 10;

/// A driver for a single image sensor.
///
/// The driver owns the I²C bus, the sensor's reset line (driven low to reset), a delay provider,
/// a [register sequence source][SequenceLoader] and the [video receiver][VideoInterface]. Most of
/// the interesting functionality is exposed through [`SensorControl`].
///
/// A new driver is [`Uninitialized`][SensorStatus::Uninitialized]. [`init`][SensorDriver::init]
/// identifies and resets the sensor, after which modes can be set and streaming started.
#[derive(Clone, Debug)]
pub struct SensorDriver<Model, I2C, Rst, Dly, Seq, Vif> {
    bus: I2C,

    reset: Rst,

    delay: Dly,

    sequences: Seq,

    interface: Vif,

    config: SensorConfig,

    modes: ModeTable,

    state: SensorState,

    params: SensorParameters,

    _model: PhantomData<Model>,
}

impl<Model, I2C, Rst, Dly, Seq, Vif> SensorDriver<Model, I2C, Rst, Dly, Seq, Vif>
where
    Model: SensorModel,
    I2C: i2c::WriteRead + i2c::Write,
    Rst: OutputPin,
    Dly: DelayMs<u16>,
    Seq: SequenceLoader<I2C>,
    Vif: VideoInterface,
{
    /// Create a driver using the sensor's default address and mode table.
    ///
    /// Nothing is sent to the sensor until [`init`][SensorDriver::init] is called.
    pub fn new(bus: I2C, reset: Rst, delay: Dly, sequences: Seq, interface: Vif) -> Self {
        let config = SensorConfig::from_model::<Model>();
        let modes = ModeTable::new(Model::MODES);
        Self {
            bus,
            reset,
            delay,
            sequences,
            interface,
            config,
            modes,
            state: SensorState::new(config.again_limit, config.pixel_clock),
            params: SensorParameters::new(&modes, config.gain_shift),
            _model: PhantomData,
        }
    }

    /// Replace the driver configuration.
    ///
    /// Any staged exposure state is discarded, so this should be done before
    /// [`init`][SensorDriver::init].
    pub fn with_config(mut self, config: SensorConfig) -> Self {
        self.config = config;
        self.reset_state();
        self
    }

    /// Use a different mode table, for example one with WDR modes and matching sequences.
    pub fn with_modes(mut self, modes: &'static [SensorMode]) -> Self {
        self.modes = ModeTable::new(modes);
        self.reset_state();
        self
    }

    fn reset_state(&mut self) {
        self.state = SensorState::new(self.config.again_limit, self.config.pixel_clock);
        self.params = SensorParameters::new(&self.modes, self.config.gain_shift);
    }

    /// Identify the sensor, then pulse its reset line.
    ///
    /// This also discards all staged exposure state, leaving the driver
    /// [`Idle`][SensorStatus::Idle].
    pub fn init(&mut self) -> Result<(), Error<I2C>> {
        let id = self.id()?;
        info!("Found {} (ID {:#08X}) at {:#04X}", Model::NAME, id, self.config.i2c_address);
        self.pulse_reset(INIT_RESET_MS)?;
        self.reset_state();
        self.state.status = SensorStatus::Idle;
        Ok(())
    }

    /// De-initialize the video receiver and hand back the hardware resources.
    pub fn release(mut self) -> (I2C, Rst, Dly) {
        if self.interface.deinit().is_err() {
            warn!("Unable to de-initialize the video interface");
        }
        (self.bus, self.reset, self.delay)
    }

    fn pulse_reset(&mut self, duration_ms: u16) -> Result<(), Error<I2C>> {
        self.reset
            .set_low()
            .map_err(|_| LibraryError::Other("Unable to assert the reset line"))?;
        self.delay.delay_ms(duration_ms);
        self.reset
            .set_high()
            .map_err(|_| LibraryError::Other("Unable to release the reset line"))?;
        self.delay.delay_ms(duration_ms);
        Ok(())
    }

    fn configure_interface(&mut self, mode: &SensorMode) -> Result<(), Error<I2C>> {
        let interface_config = InterfaceConfig::for_mode(mode);
        debug!("Configuring video interface: {:?}", interface_config);
        self.interface
            .configure(&interface_config)
            .map_err(|_| LibraryError::Interface("Unable to configure the video interface"))?;
        self.interface
            .init()
            .map_err(|_| LibraryError::Interface("Unable to initialize the video interface"))?;
        self.interface
            .start(0)
            .map_err(|_| LibraryError::Interface("Unable to start the video interface"))?;
        Ok(())
    }

    pub fn status(&self) -> SensorStatus {
        self.state.status
    }

    /// The exposure and timing state of the sensor.
    pub fn state(&self) -> &SensorState {
        &self.state
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    pub fn modes(&self) -> &ModeTable {
        &self.modes
    }

    /// The mode the sensor was last set to.
    pub fn current_mode(&self) -> Result<&'static SensorMode, LibraryError> {
        self.modes.lookup(self.params.mode)
    }

    /// The shutter value currently staged for linear modes, converted back into lines.
    pub fn linear_integration_time(&self) -> u32 {
        self.state.linear_integration_time()
    }
}

impl<Model, I2C, Rst, Dly, Seq, Vif> SensorControl for SensorDriver<Model, I2C, Rst, Dly, Seq, Vif>
where
    Model: SensorModel,
    I2C: i2c::WriteRead + i2c::Write,
    Rst: OutputPin,
    Dly: DelayMs<u16>,
    Seq: SequenceLoader<I2C>,
    Vif: VideoInterface,
{
    type Error = Error<I2C>;

    fn allocate_analog_gain(&mut self, gain: i32) -> i32 {
        self.state
            .allocate_analog_gain(gain, self.config.gain_scale, self.config.gain_shift)
    }

    fn allocate_digital_gain(&mut self, gain: i32) -> i32 {
        self.state.allocate_digital_gain(gain)
    }

    fn allocate_integration_time(&mut self, times: &mut IntegrationTimes) {
        self.state.allocate_integration_time(times)
    }

    fn update(&mut self) -> Result<bool, Self::Error> {
        commit::<Model, I2C>(&mut self.state, &mut self.bus, self.config.i2c_address)
    }

    fn set_mode(&mut self, mode: usize) -> Result<(), Self::Error> {
        match self.state.status {
            SensorStatus::Idle => (),
            SensorStatus::Uninitialized => {
                return Err(LibraryError::InvalidState("The sensor has not been initialized").into())
            }
            SensorStatus::Streaming => {
                return Err(LibraryError::InvalidState("Modes cannot be changed while streaming").into())
            }
        }
        let sensor_mode = self.modes.lookup(mode)?;
        check_mode::<Model>(sensor_mode)?;

        self.pulse_reset(MODE_RESET_MS)?;
        self.sequences
            .load_sequence(&mut self.bus, self.config.i2c_address, sensor_mode.sequence)?;
        self.state.discard_staged();
        apply_mode::<Model>(&mut self.state, &mut self.params, mode, sensor_mode);
        self.configure_interface(sensor_mode)?;
        info!(
            "{} mode {}: {}x{} @ {} fps, {:?}",
            Model::NAME,
            mode,
            sensor_mode.resolution.width,
            sensor_mode.resolution.height,
            sensor_mode.fps / 256,
            sensor_mode.wdr_mode
        );
        Ok(())
    }

    fn id(&mut self) -> Result<u32, Self::Error> {
        let mut found: u32 = 0;
        for register in Model::CHIP_ID_REGISTERS.iter() {
            let byte = read_register(&mut self.bus, self.config.i2c_address, *register)?;
            found = (found << 8) | u32::from(byte);
        }
        if found == Model::CHIP_ID {
            Ok(found)
        } else {
            warn!(
                "Expected a chip ID of {:#08X}, found {:#08X}",
                Model::CHIP_ID,
                found
            );
            Err(LibraryError::IdentityMismatch {
                expected: Model::CHIP_ID,
                found,
            }
            .into())
        }
    }

    fn parameters(&self) -> &SensorParameters {
        &self.params
    }

    fn read_register(&mut self, address: u32) -> Result<u8, Self::Error> {
        let address = checked_address(address)?;
        read_register(&mut self.bus, self.config.i2c_address, address)
    }

    fn write_register(&mut self, address: u32, value: u8) -> Result<(), Self::Error> {
        let address = checked_address(address)?;
        write_register(&mut self.bus, self.config.i2c_address, address, value)
    }

    fn start_streaming(&mut self) -> Result<(), Self::Error> {
        match self.state.status {
            SensorStatus::Streaming => Ok(()),
            SensorStatus::Uninitialized => {
                Err(LibraryError::InvalidState("The sensor has not been initialized").into())
            }
            SensorStatus::Idle => {
                write_register(&mut self.bus, self.config.i2c_address, Model::STREAM_CONTROL, 1)?;
                self.state.status = SensorStatus::Streaming;
                info!("{} streaming started", Model::NAME);
                Ok(())
            }
        }
    }

    fn stop_streaming(&mut self) -> Result<(), Self::Error> {
        match self.state.status {
            SensorStatus::Streaming => {
                write_register(&mut self.bus, self.config.i2c_address, Model::STREAM_CONTROL, 0)?;
                self.state.status = SensorStatus::Idle;
                info!("{} streaming stopped", Model::NAME);
                Ok(())
            }
            SensorStatus::Idle | SensorStatus::Uninitialized => Ok(()),
        }
    }
}

use std::env;
use std::thread::sleep;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context};
use linux_embedded_hal::sysfs_gpio::Direction;
use linux_embedded_hal::{Delay, I2cdev, Pin};
use ov08a10::sequence::StaticSequences;
use ov08a10::{IntegrationTimes, Ov08a10Driver, SensorControl};

/// Stand-in sequences that only toggle software standby. Real register sequences come from the
/// sensor vendor, with one entry per mode ordinal.
static SEQUENCES: &[&[(u16, u8)]] = &[
    &[(0x0103, 0x01)],
    &[(0x0100, 0x00)],
    &[(0x0100, 0x00)],
    &[(0x0100, 0x00)],
    &[(0x0100, 0x00)],
    &[(0x0100, 0x00)],
];

fn parse_number(arg: &str) -> anyhow::Result<u64> {
    let parsed = if let Some(hex_digits) = arg.strip_prefix("0x") {
        u64::from_str_radix(hex_digits, 16)
    } else {
        arg.parse()
    };
    parsed.with_context(|| format!("'{}' is not a number", arg))
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 || args.len() > 6 {
        bail!("Usage: stream <I2C bus> <reset GPIO> <mode> [sensor address] [num_frames]");
    }
    let bus = I2cdev::new(&args[1]).with_context(|| format!("Unable to open {}", args[1]))?;
    let reset = Pin::new(parse_number(&args[2])?);
    reset.export()?;
    reset.set_direction(Direction::High)?;
    let mode = parse_number(&args[3])? as usize;
    let address = match args.get(4) {
        Some(arg) => u8::try_from(parse_number(arg)?)?,
        None => 0x36,
    };
    let num_frames = match args.get(5) {
        Some(arg) => parse_number(arg)? as usize,
        None => 300,
    };

    let sensor: Ov08a10Driver<_, _, _, _, ()> =
        Ov08a10Driver::new(bus, reset, Delay, StaticSequences::new(SEQUENCES), ());
    let config = sensor.config().with_i2c_address(address);
    let mut sensor = sensor.with_config(config);
    sensor.init().map_err(|err| anyhow!("{}", err))?;
    sensor.set_mode(mode).map_err(|err| anyhow!("{}", err))?;
    let params = *sensor.parameters();
    println!(
        "Mode {}: {}x{} ({}x{} total), {} lines per second, integration {}..={} lines",
        mode,
        params.active.width,
        params.active.height,
        params.total.width,
        params.total.height,
        params.lines_per_second,
        params.integration_time_min,
        params.integration_time_max
    );
    let frame_rate = sensor
        .current_mode()
        .map_err(|err| anyhow!("{}", err))?
        .frame_rate_hz();
    let frame_period = Duration::from_secs_f32(1.0 / frame_rate);
    sensor.start_streaming().map_err(|err| anyhow!("{}", err))?;

    // Sweep the integration time up and down, with a gain ramp alongside it.
    let max_lines = params.integration_time_max;
    let mut writes = 0usize;
    let start = Instant::now();
    for frame in 0..num_frames {
        let phase = (frame as u32 * 8) % (2 * max_lines);
        let lines = if phase < max_lines {
            phase
        } else {
            2 * max_lines - phase
        };
        let mut times = IntegrationTimes::linear(lines.min(u32::from(u16::MAX)) as u16);
        sensor.allocate_integration_time(&mut times);
        let gain = ((frame % 64) as i32) << 14;
        sensor.allocate_analog_gain(gain);
        if sensor.update().map_err(|err| anyhow!("{}", err))? {
            writes += 1;
        }
        sleep(frame_period);
    }
    sensor.stop_streaming().map_err(|err| anyhow!("{}", err))?;
    println!(
        "{} frames in {:.2?}, {} of them needed register writes",
        num_frames,
        start.elapsed(),
        writes
    );
    let (_bus, reset, _delay) = sensor.release();
    reset.unexport()?;
    Ok(())
}

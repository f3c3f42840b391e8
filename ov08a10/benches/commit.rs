use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use ov08a10::sequence::StaticSequences;
use ov08a10::{IntegrationTimes, Ov08a10Driver, SensorControl};
use ov08a10_test_data::{
    mock_ov08a10_at_address, MockDelay, MockPin, MockSensorBus, EXAMPLE_SEQUENCES,
};

type BenchDriver = Ov08a10Driver<MockSensorBus, MockPin, MockDelay, StaticSequences, ()>;

fn streaming_driver() -> BenchDriver {
    let address = 0x36;
    let mut driver = Ov08a10Driver::new(
        mock_ov08a10_at_address(address),
        MockPin::new(),
        MockDelay::new(),
        StaticSequences::new(EXAMPLE_SEQUENCES),
        (),
    );
    driver.init().unwrap();
    driver.set_mode(3).unwrap();
    driver.start_streaming().unwrap();
    driver
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Exposure");

    let mut driver = streaming_driver();
    let mut gain = 0;
    group.bench_function("Allocate analog gain", |b| {
        b.iter(|| {
            gain = (gain + 4099) % (6 << 18);
            driver.allocate_analog_gain(gain)
        })
    });

    let mut lines = 0u16;
    group.bench_function("Allocate integration time", |b| {
        b.iter(|| {
            lines = lines.wrapping_add(7) % 2500;
            let mut times = IntegrationTimes::linear(lines);
            driver.allocate_integration_time(&mut times);
            times
        })
    });

    group.bench_function("Commit", |b| {
        b.iter_batched_ref(
            || {
                let mut driver = streaming_driver();
                let mut times = IntegrationTimes::linear(1000);
                driver.allocate_integration_time(&mut times);
                driver.allocate_analog_gain(3 << 18);
                driver
            },
            |driver| driver.update().unwrap(),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

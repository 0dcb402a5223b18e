//! Benchmarks for the per-datagram decode path
//!
//! - Stage costs: validation, checksum, field decoding
//! - Full pipeline over a mixed capture, raw and with unit conversion

use criterion::{BatchSize, Criterion, Throughput, criterion_group, criterion_main};
use freed::protocol::{self, ChecksumMode, checksum};
use freed::test_utils::{mixed_capture, sample_frame};
use freed::{Pipeline, SessionSettings};
use std::hint::black_box;

fn bench_stages(c: &mut Criterion) {
    let frame = sample_frame(1);

    let mut group = c.benchmark_group("stages");
    group.throughput(Throughput::Bytes(frame.len() as u64));

    group.bench_function("validate", |b| b.iter(|| black_box(protocol::validate(black_box(&frame)))));

    group.bench_function("validate_and_verify", |b| {
        b.iter(|| {
            let valid = protocol::validate(black_box(&frame)).ok()?;
            checksum::verify(&valid, ChecksumMode::Verify).ok()
        })
    });

    group.bench_function("decode", |b| {
        b.iter(|| protocol::validate(black_box(&frame)).map(|valid| protocol::decode(&valid)))
    });

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let capture = mixed_capture(1_000);
    let bytes: usize = capture.iter().map(Vec::len).sum();

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Bytes(bytes as u64));

    for (name, settings) in [
        ("raw", SessionSettings::default()),
        ("converted", SessionSettings::default().convert_units(true).timecode_fps(Some(25.0))),
    ] {
        group.bench_function(name, |b| {
            b.iter_batched(
                || Pipeline::new(&settings).expect("valid settings"),
                |mut pipeline| {
                    for datagram in &capture {
                        black_box(pipeline.process(datagram));
                    }
                    pipeline
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_stages, bench_pipeline);
criterion_main!(benches);

//! Criterion benchmarks for kvlog

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use kvlog::prelude::*;

/// Sink that swallows everything, so the benches measure the pipeline and
/// encoder rather than terminal or disk throughput.
struct NullWriter;

impl Writer for NullWriter {
    fn write(&mut self, _level: Level, data: &[u8], _header_len: usize) -> kvlog::Result<()> {
        black_box(data);
        Ok(())
    }

    fn close(&mut self) -> kvlog::Result<()> {
        Ok(())
    }
}

// ============================================================================
// Field Encoding Benchmarks
// ============================================================================

fn bench_field_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_encoding");
    group.throughput(Throughput::Elements(1));

    let logger = LoggerBuilder::new()
        .level(Level::Trace)
        .flags(0)
        .sync(true)
        .writer(NullWriter)
        .build()
        .expect("logger");

    group.bench_function("message_only", |b| {
        b.iter(|| {
            logger.info().print(black_box("plain message"));
        });
    });

    group.bench_function("five_scalar_fields", |b| {
        b.iter(|| {
            logger
                .info()
                .int("a", black_box(-12345678i64))
                .uint("b", black_box(987654u64))
                .bool("c", true)
                .string("d", black_box("hello"))
                .float64("e", black_box(0.123456789))
                .print("scalars");
        });
    });

    group.bench_function("duration_field", |b| {
        b.iter(|| {
            logger
                .info()
                .duration("elapsed", black_box(Duration::from_nanos(1_234_567_890)))
                .print("timed");
        });
    });

    group.bench_function("sequence_field", |b| {
        let values: Vec<i64> = (0..32).collect();
        b.iter(|| {
            logger.info().ints("xs", black_box(&values)).print("seq");
        });
    });

    group.finish();
}

// ============================================================================
// Gating Benchmarks
// ============================================================================

fn bench_suppressed_records(c: &mut Criterion) {
    let mut group = c.benchmark_group("suppressed_records");
    group.throughput(Throughput::Elements(1));

    let logger = LoggerBuilder::new()
        .level(Level::Error)
        .flags(0)
        .sync(true)
        .writer(NullWriter)
        .build()
        .expect("logger");

    group.bench_function("below_threshold_chain", |b| {
        b.iter(|| {
            logger
                .debug()
                .int("a", black_box(1i64))
                .string("b", black_box("dropped"))
                .print("never written");
        });
    });

    group.bench_function("when_false_chain", |b| {
        b.iter(|| {
            logger
                .when(false)
                .error()
                .int("a", black_box(1i64))
                .print("never written");
        });
    });

    group.finish();
}

// ============================================================================
// Pipeline Benchmarks
// ============================================================================

fn bench_async_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_pipeline");
    group.throughput(Throughput::Elements(1));

    let logger = LoggerBuilder::new()
        .level(Level::Trace)
        .flags(0)
        .writer(NullWriter)
        .build()
        .expect("async logger");

    group.bench_function("enqueue", |b| {
        b.iter(|| {
            logger.info().uint("seq", black_box(7u64)).print("queued");
        });
    });

    group.finish();
    logger.shutdown().expect("shutdown");
}

criterion_group!(
    benches,
    bench_field_encoding,
    bench_suppressed_records,
    bench_async_pipeline
);
criterion_main!(benches);

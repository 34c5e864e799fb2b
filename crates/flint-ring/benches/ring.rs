//! Ring buffer benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use flint_ring::ring;

fn bench_publish_consume(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_buffer");
    group.throughput(Throughput::Elements(1));

    group.bench_function("try_publish", |b| {
        let (mut producer, mut consumer) = ring::<u64>(1024);
        b.iter(|| {
            black_box(producer.try_publish(42));
            black_box(consumer.try_consume());
        })
    });

    group.finish();
}

fn bench_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_throughput");
    group.throughput(Throughput::Elements(10_000));

    group.bench_function("10k_messages", |b| {
        b.iter_batched(
            || ring::<u64>(16_384),
            |(mut producer, mut consumer)| {
                for i in 0..10_000u64 {
                    while !producer.try_publish(i) {}
                }
                for _ in 0..10_000 {
                    black_box(consumer.try_consume());
                }
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_publish_consume, bench_throughput);
criterion_main!(benches);

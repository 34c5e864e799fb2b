//! Matching benchmarks.
//!
//! Run with: cargo bench -p flint-core

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use flint_core::{MatchingEngine, OrderBook, Side, SymbolId, TimeInForce, Trade, UserId};

fn bench_book() -> OrderBook {
    OrderBook::new(SymbolId(0), "BENCH")
}

/// Insert passive limits into an empty book.
fn bench_insert_empty(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_empty");
    group.throughput(Throughput::Elements(1));

    group.bench_function("limit_order", |b| {
        let mut book = bench_book();
        let mut sink = |_: &Trade| {};
        b.iter(|| {
            black_box(book.add_limit(Side::Buy, 10_000, 100, TimeInForce::Gfd, &mut sink))
        })
    });

    group.finish();
}

/// Insert a non-crossing limit into a book with resting depth.
fn bench_insert_deep_book(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_deep_book");
    group.throughput(Throughput::Elements(1));

    for depth in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let mut book = bench_book();
            let mut sink = |_: &Trade| {};
            for i in 0..depth {
                book.add_limit(
                    Side::Sell,
                    10_000 + (i % 100),
                    100,
                    TimeInForce::Gfd,
                    &mut sink,
                );
            }
            b.iter(|| {
                // 9_990 never crosses the 10_000+ asks.
                black_box(book.add_limit(Side::Buy, 9_990, 100, TimeInForce::Gfd, &mut sink))
            })
        });
    }

    group.finish();
}

/// One IOC aggressor consuming one resting order.
fn bench_match_single(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_single");
    group.throughput(Throughput::Elements(1));

    group.bench_function("ioc_match", |b| {
        b.iter_batched(
            || {
                let mut book = bench_book();
                let mut sink = |_: &Trade| {};
                book.add_limit(Side::Sell, 10_000, 100, TimeInForce::Gfd, &mut sink);
                book
            },
            |mut book| {
                let mut sink = |_: &Trade| {};
                black_box(book.add_limit(Side::Buy, 10_000, 100, TimeInForce::Ioc, &mut sink))
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

/// One aggressor sweeping several resting orders at one price.
fn bench_match_multiple(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_multiple");
    group.throughput(Throughput::Elements(1));

    for count in [1, 5, 10] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter_batched(
                || {
                    let mut book = bench_book();
                    let mut sink = |_: &Trade| {};
                    for _ in 0..count {
                        book.add_limit(Side::Sell, 10_000, 10, TimeInForce::Gfd, &mut sink);
                    }
                    book
                },
                |mut book| {
                    let mut sink = |_: &Trade| {};
                    black_box(book.add_limit(
                        Side::Buy,
                        10_000,
                        10 * count,
                        TimeInForce::Ioc,
                        &mut sink,
                    ))
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

/// Engine-level mixed workload across the event dispatch path.
fn bench_engine_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_throughput");
    group.throughput(Throughput::Elements(10_000));

    group.bench_function("mixed_workload", |b| {
        b.iter_batched(
            || MatchingEngine::new(|_: &Trade| {}),
            |mut engine| {
                for i in 0..10_000i64 {
                    let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
                    let price = 10_000 + (i % 10);
                    black_box(engine.new_limit(
                        "BENCH",
                        UserId::default(),
                        side,
                        price,
                        100,
                        TimeInForce::Gfd,
                    ));
                }
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_empty,
    bench_insert_deep_book,
    bench_match_single,
    bench_match_multiple,
    bench_engine_throughput,
);

criterion_main!(benches);

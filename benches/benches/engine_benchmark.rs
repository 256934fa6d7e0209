//! Hot-path benchmarks for bar building and tick fan-out.
//!
//! Run with: `cargo bench --package barline-bench`

use barline_bench::TickFixture;
use barline_lib::prelude::*;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::collections::HashMap;
use std::hint::black_box;
use std::sync::Arc;

fn bar_builder_benchmark(c: &mut Criterion) {
    let ticks = TickFixture::default().generate();
    let mut group = c.benchmark_group("bar_builder");
    group.throughput(Throughput::Elements(ticks.len() as u64));

    for resolution in [Resolution::Minute1, Resolution::Hour1, Resolution::Day1] {
        group.bench_with_input(
            BenchmarkId::from_parameter(resolution.code()),
            &resolution,
            |b, &resolution| {
                b.iter(|| {
                    let mut bar: Option<Bar> = None;
                    for tick in &ticks {
                        bar = Some(BarBuilder::update(tick, bar.as_ref(), resolution));
                    }
                    black_box(bar)
                });
            },
        );
    }

    group.finish();
}

fn publish_benchmark(c: &mut Criterion) {
    let ticks = TickFixture {
        count: 2_000,
        ..Default::default()
    }
    .generate();
    let mut group = c.benchmark_group("publish_tick");
    group.throughput(Throughput::Elements(ticks.len() as u64));

    // Subscriptions on the published symbol, spread over every resolution
    for fan_out in [1usize, 9, 45] {
        let engine = Engine::new(EngineConfig::default());
        for i in 0..fan_out {
            let code = Resolution::all()[i % Resolution::all().len()].code();
            engine
                .subscribe("EURUSD", code, |bar: &Bar| {
                    black_box(bar);
                }, None)
                .unwrap();
        }
        // Noise on other symbols must not slow the published one
        for other in ["GBPUSD", "USDJPY", "BTC/USD"] {
            engine.subscribe(other, "1", |_: &Bar| {}, None).unwrap();
        }

        group.bench_with_input(BenchmarkId::new("fan_out", fan_out), &engine, |b, engine| {
            b.iter(|| {
                for tick in &ticks {
                    engine.publish_tick("EURUSD", tick);
                }
            });
        });
    }

    group.finish();
}

fn batch_benchmark(c: &mut Criterion) {
    let ticks = TickFixture::default().generate();
    let scheduler = Arc::new(ManualScheduler::new());
    let quotes = BatchScheduler::new(scheduler.clone(), |batch: HashMap<usize, Quote>| {
        black_box(batch);
    });

    let mut group = c.benchmark_group("batch_scheduler");
    group.throughput(Throughput::Elements(ticks.len() as u64));
    group.bench_function("record_and_flush", |b| {
        b.iter(|| {
            for (i, tick) in ticks.iter().enumerate() {
                quotes.record(i % 16, tick.quote());
                if i % 64 == 63 {
                    scheduler.run_pending();
                }
            }
            scheduler.run_pending();
        });
    });
    group.finish();
}

criterion_group!(benches, bar_builder_benchmark, publish_benchmark, batch_benchmark);
criterion_main!(benches);

//! Benchmarks for live query maintenance: incremental changes vs full refresh.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quiver_core::{fields, Record, Value};
use quiver_reactive::{FetchRequest, LiveQuery, ProjectionMapper};
use quiver_storage::{RecordStore, StoreConfig};
use std::cell::RefCell;
use std::rc::Rc;

const GROUPS: [&str; 5] = ["Tech", "Finance", "Health", "Energy", "Consumer"];

fn populate_store(store: &mut RecordStore, count: u64) {
    for i in 1..=count {
        store
            .insert(fields([
                ("name", Value::String(format!("SYM{:06}", i))),
                ("group", Value::from(GROUPS[(i as usize) % GROUPS.len()])),
                ("price", Value::Float64(100.0 + (i as f64) * 0.1)),
            ]))
            .unwrap();
    }
}

fn request() -> FetchRequest {
    FetchRequest::new("Item").sort_by("name").section_by("group")
}

/// Benchmark: one record update propagated incrementally
fn incremental_update_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("live_query_update");

    for size in [1_000u64, 10_000, 50_000] {
        group.bench_with_input(BenchmarkId::new("incremental", size), &size, |b, &size| {
            let mut store = RecordStore::new(StoreConfig::builder("Item").build().unwrap());
            populate_store(&mut store, size);
            let query = Rc::new(RefCell::new(LiveQuery::new(
                request().verify_diffs(false),
                ProjectionMapper::<Record>::from_record(),
            )));
            LiveQuery::attach(&query, &mut store).unwrap();
            let mut tick = 0u64;
            b.iter(|| {
                tick += 1;
                let id = (tick % size) + 1;
                let group = GROUPS[(tick as usize) % GROUPS.len()];
                store
                    .update(id, |f| {
                        f.insert("group".into(), Value::from(group));
                    })
                    .unwrap();
                black_box(query.borrow().len());
            });
        });

        group.bench_with_input(BenchmarkId::new("full_refresh", size), &size, |b, &size| {
            let mut store = RecordStore::new(StoreConfig::builder("Item").build().unwrap());
            populate_store(&mut store, size);
            let mut query = LiveQuery::new(
                request().verify_diffs(false),
                ProjectionMapper::<Record>::from_record(),
            );
            query.refresh(&store).unwrap();
            let mut tick = 0u64;
            b.iter(|| {
                tick += 1;
                let id = (tick % size) + 1;
                let group = GROUPS[(tick as usize) % GROUPS.len()];
                store
                    .update(id, |f| {
                        f.insert("group".into(), Value::from(group));
                    })
                    .unwrap();
                query.refresh(&store).unwrap();
                black_box(query.len());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, incremental_update_benchmark);
criterion_main!(benches);

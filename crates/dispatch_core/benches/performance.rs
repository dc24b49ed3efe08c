//! Performance benchmarks for dispatch_core using Criterion.rs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dispatch_core::matching::MatchingEngine;
use dispatch_core::presence::PresenceRegistry;
use dispatch_core::ride::UserId;
use dispatch_core::store::RideStore;
use dispatch_core::test_helpers::pickup_point;

fn populated_registry(drivers: usize, spread_km: f64) -> Arc<PresenceRegistry> {
    let registry = Arc::new(PresenceRegistry::default());
    let side = (drivers as f64).sqrt().ceil() as usize;
    let step = spread_km / side as f64;
    for i in 0..drivers {
        let north = (i % side) as f64 * step - spread_km / 2.0;
        let east = (i / side) as f64 * step - spread_km / 2.0;
        registry.set_online(
            &UserId::new(format!("d{i}")),
            Some(pickup_point().offset_km(north, east)),
            DateTime::<Utc>::UNIX_EPOCH,
        );
    }
    registry
}

fn bench_find_candidates(c: &mut Criterion) {
    let populations = vec![("small", 100), ("medium", 2_000), ("large", 20_000)];

    let mut group = c.benchmark_group("find_candidates");
    for (name, drivers) in populations {
        let registry = populated_registry(drivers, 60.0);
        let engine = MatchingEngine::new(5.0, registry, Arc::new(RideStore::new()));
        group.bench_with_input(BenchmarkId::from_parameter(name), &engine, |b, engine| {
            b.iter(|| black_box(engine.find_candidates(black_box(pickup_point()))));
        });
    }
    group.finish();
}

fn bench_location_updates(c: &mut Criterion) {
    let registry = populated_registry(5_000, 40.0);
    let driver = UserId::from("d42");
    let mut toggle = false;

    c.bench_function("update_location", |b| {
        b.iter(|| {
            toggle = !toggle;
            let north = if toggle { 0.3 } else { -0.3 };
            black_box(registry.update_location(
                &driver,
                pickup_point().offset_km(north, 0.0),
                DateTime::<Utc>::UNIX_EPOCH,
            ))
        });
    });
}

criterion_group!(benches, bench_find_candidates, bench_location_updates);
criterion_main!(benches);

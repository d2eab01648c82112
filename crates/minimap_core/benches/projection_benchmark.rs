//! Benchmark for view projection and level resolution.
//!
//! TARGET: repeated projections against an unchanged owner cost one
//! transform comparison each
//!
//! Run with: cargo bench --package minimap_core --bench projection_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use minimap_core::level;
use minimap_core::{RotationPolicy, ViewFrame};
use minimap_shared::{Rotator, Transform, Vec2, Vec3};

fn player_view() -> ViewFrame {
    let mut view = ViewFrame::new(Vec2::splat(1024.0), RotationPolicy::InheritYaw { offset: 90.0 });
    view.set_owner_transform(Transform::new(
        Vec3::new(120.0, -40.0, 0.0),
        Rotator::from_yaw(33.0),
        Vec3::ONE,
    ));
    view
}

fn benchmark_world_to_view_cached(c: &mut Criterion) {
    let view = player_view();

    c.bench_function("world_to_view_cached", |b| {
        let mut x = 0.0f32;
        b.iter(|| {
            x += 0.5;
            black_box(view.world_to_view(black_box(Vec3::new(x, x * 0.3, 0.0)), false))
        });
    });
}

fn benchmark_world_to_view_moving_owner(c: &mut Criterion) {
    let mut view = player_view();

    c.bench_function("world_to_view_moving_owner", |b| {
        let mut x = 0.0f32;
        b.iter(|| {
            x += 0.5;
            view.set_owner_transform(Transform::from_location(Vec3::new(x, 0.0, 0.0)));
            black_box(view.world_to_view(black_box(Vec3::new(10.0, 20.0, 0.0)), true))
        });
    });
}

fn benchmark_many_icons(c: &mut Criterion) {
    let view = player_view();
    let icons: Vec<Vec3> = (0..10_000)
        .map(|i| Vec3::new((i % 100) as f32 * 25.0 - 1250.0, (i / 100) as f32 * 25.0 - 1250.0, 0.0))
        .collect();

    let mut group = c.benchmark_group("icon_projection");
    group.throughput(Throughput::Elements(icons.len() as u64));

    group.bench_function("10k_icons_broad_then_precise", |b| {
        b.iter(|| {
            let mut visible = 0;
            for icon in &icons {
                if view.broad_contains(*icon, 16.0) && view.world_to_view(*icon, false).in_view {
                    visible += 1;
                }
            }
            black_box(visible)
        });
    });

    group.finish();
}

fn benchmark_level_resolution(c: &mut Criterion) {
    let heights = [300.0, 250.0, 250.0, 400.0, 0.0];

    c.bench_function("resolve_level_5_bands", |b| {
        let mut h = 0.0f32;
        b.iter(|| {
            h = (h + 7.0) % 1500.0;
            black_box(level::resolve(black_box(h), heights))
        });
    });
}

criterion_group!(
    benches,
    benchmark_world_to_view_cached,
    benchmark_world_to_view_moving_owner,
    benchmark_many_icons,
    benchmark_level_resolution,
);

criterion_main!(benches);

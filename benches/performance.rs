// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Watertight Contributors

//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::{Matrix4, Vector3};
use watertight::geometry::Primitive;
use watertight::{BooleanOp, Collider, ExecutionParams, Solid};

fn sphere_solid(segments: u32, offset: f64) -> Solid {
    let mut mesh = Primitive::sphere(1.0, segments).to_mesh();
    mesh.transform(&Matrix4::new_translation(&Vector3::new(offset, 0.0, 0.0)));
    Solid::from_mesh(&mesh, ExecutionParams::default()).unwrap()
}

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");

    for &segments in &[16u32, 32, 64] {
        let mesh = Primitive::sphere(1.0, segments).to_mesh();
        group.bench_with_input(
            BenchmarkId::new("sphere_solid", segments),
            &mesh,
            |b, mesh| {
                b.iter(|| Solid::from_mesh(black_box(mesh), ExecutionParams::default()).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_collider(c: &mut Criterion) {
    let mut group = c.benchmark_group("collider");

    let solid = sphere_solid(64, 0.0);
    let boxes = solid.face_boxes();
    group.bench_function("rebuild_8k_boxes", |b| {
        b.iter(|| Collider::new(black_box(boxes.clone()), &ExecutionParams::default()));
    });

    let collider = Collider::new(boxes.clone(), &ExecutionParams::default());
    let other = sphere_solid(64, 0.5);
    let queries = other.face_boxes();
    group.bench_function("bulk_query_8k_vs_8k", |b| {
        b.iter(|| {
            collider.collisions(
                black_box(&queries),
                solid.precision(),
                &ExecutionParams::default(),
            )
        });
    });

    group.finish();
}

fn bench_boolean(c: &mut Criterion) {
    let mut group = c.benchmark_group("boolean");
    group.sample_size(20);

    let cube_a =
        Solid::from_mesh(
            &Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh(),
            ExecutionParams::default(),
        )
        .unwrap();
    let mut shifted = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh();
    shifted.transform(&Matrix4::new_translation(&Vector3::new(0.5, 0.5, 0.5)));
    let cube_b = Solid::from_mesh(&shifted, ExecutionParams::default()).unwrap();

    group.bench_function("cube_union", |b| {
        b.iter(|| cube_a.boolean(black_box(&cube_b), BooleanOp::Union).unwrap());
    });

    for &segments in &[16u32, 32] {
        let a = sphere_solid(segments, 0.0);
        let b_solid = sphere_solid(segments, 0.7);
        group.bench_with_input(
            BenchmarkId::new("sphere_union", segments),
            &(a, b_solid),
            |bench, (a, b_solid)| {
                bench.iter(|| a.boolean(black_box(b_solid), BooleanOp::Union).unwrap());
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_construction, bench_collider, bench_boolean);
criterion_main!(benches);

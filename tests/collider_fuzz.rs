// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Watertight Contributors

//! Randomized collider checks against a brute-force reference.

use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use watertight::{Aabb, Collider, ExecutionParams};

fn random_box(rng: &mut StdRng, extent: f64, max_size: f64) -> Aabb {
    let min = Point3::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    );
    let size = Point3::new(
        rng.gen_range(0.0..max_size),
        rng.gen_range(0.0..max_size),
        rng.gen_range(0.0..max_size),
    );
    Aabb::new(min, Point3::new(min.x + size.x, min.y + size.y, min.z + size.z))
}

#[test]
fn random_queries_match_brute_force() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let stored: Vec<Aabb> = (0..400).map(|_| random_box(&mut rng, 10.0, 2.0)).collect();
    let queries: Vec<Aabb> = (0..60).map(|_| random_box(&mut rng, 12.0, 3.0)).collect();

    let collider = Collider::new(stored.clone(), &ExecutionParams::default());
    for &tolerance in &[0.0, 0.25] {
        let mut pairs = collider.collisions(&queries, tolerance, &ExecutionParams::default());
        pairs.unique();
        let found: Vec<(u32, u32)> = pairs.iter().collect();

        let mut expected = Vec::new();
        for (qi, query) in queries.iter().enumerate() {
            for (si, bbox) in stored.iter().enumerate() {
                if bbox.overlaps(query, tolerance) {
                    expected.push((qi as u32, si as u32));
                }
            }
        }
        assert_eq!(found, expected, "tolerance {tolerance}");
    }
}

#[test]
fn degenerate_point_boxes_are_found() {
    let mut rng = StdRng::seed_from_u64(42);
    // Zero-extent boxes: valid leaves, found by overlap like any other.
    let stored: Vec<Aabb> = (0..100)
        .map(|_| {
            let p = Point3::new(
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
            );
            Aabb::new(p, p)
        })
        .collect();
    let collider = Collider::new(stored.clone(), &ExecutionParams::sequential());

    let everything = vec![Aabb::new(Point3::new(-5.0, -5.0, -5.0), Point3::new(5.0, 5.0, 5.0))];
    let pairs = collider.collisions(&everything, 0.0, &ExecutionParams::sequential());
    assert_eq!(pairs.len(), stored.len());
}

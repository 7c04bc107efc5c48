// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Watertight Contributors

//! End-to-end Boolean operation tests on closed solids.

use approx::assert_relative_eq;
use nalgebra::{Matrix4, Vector3};
use watertight::geometry::Primitive;
use watertight::{BooleanOp, ExecutionParams, Mesh, Solid};

fn solid(mesh: &Mesh) -> Solid {
    Solid::from_mesh(mesh, ExecutionParams::sequential()).unwrap()
}

fn unit_cube_at(x: f64, y: f64, z: f64) -> Solid {
    let mut mesh = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh();
    mesh.transform(&Matrix4::new_translation(&Vector3::new(x, y, z)));
    solid(&mesh)
}

#[test]
fn overlapping_cubes_union() {
    let a = unit_cube_at(0.0, 0.0, 0.0);
    let b = unit_cube_at(0.5, 0.5, 0.5);

    let result = a.boolean(&b, BooleanOp::Union).unwrap();
    assert!(result.is_manifold());
    // 1 + 1 minus the 0.5^3 shared block.
    assert_relative_eq!(result.signed_volume(), 1.875, epsilon = 1e-9);
}

#[test]
fn overlapping_cubes_intersection() {
    let a = unit_cube_at(0.0, 0.0, 0.0);
    let b = unit_cube_at(0.5, 0.5, 0.5);

    let result = a.boolean(&b, BooleanOp::Intersection).unwrap();
    assert!(result.is_manifold());
    assert_relative_eq!(result.signed_volume(), 0.125, epsilon = 1e-9);
}

#[test]
fn overlapping_cubes_difference() {
    let a = unit_cube_at(0.0, 0.0, 0.0);
    let b = unit_cube_at(0.5, 0.5, 0.5);

    let result = a.boolean(&b, BooleanOp::Difference).unwrap();
    assert!(result.is_manifold());
    assert_relative_eq!(result.signed_volume(), 0.875, epsilon = 1e-9);

    // The reverse difference carves the same block out of the other cube.
    let result = b.boolean(&a, BooleanOp::Difference).unwrap();
    assert!(result.is_manifold());
    assert_relative_eq!(result.signed_volume(), 0.875, epsilon = 1e-9);
}

#[test]
fn asymmetric_offset_cubes() {
    // Seam chords end on face diagonals of the partner cube here, so the
    // result is watertight only if those cut points are mirrored into both
    // triangles sharing the diagonal.
    let a = unit_cube_at(0.0, 0.0, 0.0);
    let b = unit_cube_at(0.5, 0.25, 0.25);

    let union = a.boolean(&b, BooleanOp::Union).unwrap();
    assert!(union.is_manifold());
    assert_relative_eq!(union.signed_volume(), 1.71875, epsilon = 1e-9);

    let intersection = a.boolean(&b, BooleanOp::Intersection).unwrap();
    assert!(intersection.is_manifold());
    assert_relative_eq!(intersection.signed_volume(), 0.28125, epsilon = 1e-9);

    let difference = a.boolean(&b, BooleanOp::Difference).unwrap();
    assert!(difference.is_manifold());
    assert_relative_eq!(difference.signed_volume(), 0.71875, epsilon = 1e-9);
}

#[test]
fn coincident_cubes_union_is_identity() {
    let a = unit_cube_at(0.0, 0.0, 0.0);
    let b = unit_cube_at(0.0, 0.0, 0.0);

    let result = a.boolean(&b, BooleanOp::Union).unwrap();
    assert!(result.is_manifold());
    assert_relative_eq!(result.signed_volume(), 1.0, epsilon = 1e-9);
}

#[test]
fn coincident_cubes_intersection_is_identity() {
    let a = unit_cube_at(0.0, 0.0, 0.0);
    let b = unit_cube_at(0.0, 0.0, 0.0);

    let result = a.boolean(&b, BooleanOp::Intersection).unwrap();
    assert!(result.is_manifold());
    assert_relative_eq!(result.signed_volume(), 1.0, epsilon = 1e-9);
}

#[test]
fn coincident_cubes_difference_is_empty() {
    let a = unit_cube_at(0.0, 0.0, 0.0);
    let b = unit_cube_at(0.0, 0.0, 0.0);

    let result = a.boolean(&b, BooleanOp::Difference).unwrap();
    assert!(result.is_empty());
    assert_relative_eq!(result.signed_volume(), 0.0, epsilon = 1e-12);
}

#[test]
fn chained_difference_removes_operand() {
    let a = unit_cube_at(0.0, 0.0, 0.0);
    let b = unit_cube_at(0.5, 0.5, 0.5);

    // Subtracting b from the union must carve away all of b, including the
    // regions where b's skin coincides with the union's own skin.
    let c = a.boolean(&b, BooleanOp::Union).unwrap();
    let d = c.boolean(&b, BooleanOp::Difference).unwrap();
    assert!(d.is_manifold());
    assert_relative_eq!(d.signed_volume(), 0.875, epsilon = 1e-9);

    let overlap = d.boolean(&b, BooleanOp::Intersection).unwrap();
    assert!(overlap.signed_volume().abs() < 1e-9);
}

#[test]
fn nested_cube_difference_leaves_shell() {
    let outer = unit_cube_at(0.0, 0.0, 0.0);
    let mut inner_mesh = Primitive::cube(Vector3::new(0.5, 0.5, 0.5), false).to_mesh();
    inner_mesh.transform(&Matrix4::new_translation(&Vector3::new(0.25, 0.25, 0.25)));
    let inner = solid(&inner_mesh);

    // Hollowing: two nested shells, the inner one wound inward.
    let result = outer.boolean(&inner, BooleanOp::Difference).unwrap();
    assert!(result.is_manifold());
    assert_relative_eq!(result.signed_volume(), 0.875, epsilon = 1e-9);

    // An enclosed solid differenced against its container vanishes.
    let result = inner.boolean(&outer, BooleanOp::Difference).unwrap();
    assert!(result.is_empty());
}

#[test]
fn nested_cube_union_and_intersection() {
    let outer = unit_cube_at(0.0, 0.0, 0.0);
    let mut inner_mesh = Primitive::cube(Vector3::new(0.5, 0.5, 0.5), false).to_mesh();
    inner_mesh.transform(&Matrix4::new_translation(&Vector3::new(0.25, 0.25, 0.25)));
    let inner = solid(&inner_mesh);

    let result = outer.boolean(&inner, BooleanOp::Union).unwrap();
    assert!(result.is_manifold());
    assert_relative_eq!(result.signed_volume(), 1.0, epsilon = 1e-9);

    let result = outer.boolean(&inner, BooleanOp::Intersection).unwrap();
    assert!(result.is_manifold());
    assert_relative_eq!(result.signed_volume(), 0.125, epsilon = 1e-9);
}

#[test]
fn corner_overlap_with_centered_cube() {
    let a = unit_cube_at(0.0, 0.0, 0.0);
    let b = solid(&Primitive::cube(Vector3::new(1.0, 1.0, 1.0), true).to_mesh());

    let result = a.boolean(&b, BooleanOp::Intersection).unwrap();
    assert!(result.is_manifold());
    assert_relative_eq!(result.signed_volume(), 0.125, epsilon = 1e-9);

    let result = a.boolean(&b, BooleanOp::Union).unwrap();
    assert!(result.is_manifold());
    assert_relative_eq!(result.signed_volume(), 1.875, epsilon = 1e-9);
}

#[test]
fn disjoint_spheres_union_adds_volume() {
    let a = solid(&Primitive::sphere(1.0, 24).to_mesh());
    let mut far = Primitive::sphere(1.0, 24).to_mesh();
    far.transform(&Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0)));
    let b = solid(&far);

    let union = a.boolean(&b, BooleanOp::Union).unwrap();
    assert!(union.is_manifold());
    assert_relative_eq!(
        union.signed_volume(),
        a.signed_volume() + b.signed_volume(),
        epsilon = 1e-9
    );

    let intersection = a.boolean(&b, BooleanOp::Intersection).unwrap();
    assert!(intersection.is_empty());
}

#[test]
fn parallel_matches_sequential() {
    let mesh_a = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh();
    let mut mesh_b = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh();
    mesh_b.transform(&Matrix4::new_translation(&Vector3::new(0.5, 0.5, 0.5)));

    let seq_a = Solid::from_mesh(&mesh_a, ExecutionParams::sequential()).unwrap();
    let seq_b = Solid::from_mesh(&mesh_b, ExecutionParams::sequential()).unwrap();
    let par_a = Solid::from_mesh(&mesh_a, ExecutionParams::default()).unwrap();
    let par_b = Solid::from_mesh(&mesh_b, ExecutionParams::default()).unwrap();

    for op in [BooleanOp::Union, BooleanOp::Intersection, BooleanOp::Difference] {
        let seq = seq_a.boolean(&seq_b, op).unwrap();
        let par = par_a.boolean(&par_b, op).unwrap();
        assert_eq!(seq.triangle_count(), par.triangle_count());
        assert_relative_eq!(seq.signed_volume(), par.signed_volume(), epsilon = 1e-12);
    }
}

#[test]
fn result_carries_provenance_from_both_inputs() {
    let a = unit_cube_at(0.0, 0.0, 0.0);
    let b = unit_cube_at(0.5, 0.5, 0.5);

    let result = a.boolean(&b, BooleanOp::Union).unwrap();
    let relations = result.relations();
    assert_eq!(relations.len(), result.triangle_count());
    assert!(relations.iter().any(|r| r.mesh_id == 0));
    assert!(relations.iter().any(|r| r.mesh_id == 1));
    assert!(relations.iter().all(|r| r.original_face < 12));
}

#[test]
fn sphere_cube_booleans_stay_manifold() {
    let cube = solid(&Primitive::cube(Vector3::new(2.0, 2.0, 2.0), true).to_mesh());
    let mut ball = Primitive::sphere(0.8, 24).to_mesh();
    ball.transform(&Matrix4::new_translation(&Vector3::new(1.1, 0.3, 0.15)));
    let sphere = solid(&ball);

    let union = cube.boolean(&sphere, BooleanOp::Union).unwrap();
    assert!(union.is_manifold());
    let difference = cube.boolean(&sphere, BooleanOp::Difference).unwrap();
    assert!(difference.is_manifold());
    let intersection = cube.boolean(&sphere, BooleanOp::Intersection).unwrap();
    assert!(intersection.is_manifold());

    let cube_vol = cube.signed_volume();
    // The three pieces partition the union.
    assert_relative_eq!(
        difference.signed_volume() + intersection.signed_volume(),
        cube_vol,
        epsilon = 1e-6
    );
    assert!(union.signed_volume() > cube_vol);
    assert!(intersection.signed_volume() > 0.0);
}

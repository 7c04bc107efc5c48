// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Watertight Contributors

//! Geometric primitives generator
//!
//! Closed solids with shared vertices, used by the test suites and the
//! bench. All primitives pass manifold validation as constructed.

use super::{Mesh, Triangle, Vertex};
use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;

/// Geometric primitives
pub enum Primitive {
    Cube { size: Vector3<f64>, center: bool },
    Tetrahedron { scale: f64 },
    Sphere { r: f64, fn_: u32 },
}

impl Primitive {
    pub fn cube(size: Vector3<f64>, center: bool) -> Self {
        Self::Cube { size, center }
    }

    pub fn tetrahedron(scale: f64) -> Self {
        Self::Tetrahedron { scale }
    }

    pub fn sphere(r: f64, fn_: u32) -> Self {
        let segments = if fn_ > 2 { fn_ } else { 32 };
        Self::Sphere { r, fn_: segments }
    }

    pub fn to_mesh(&self) -> Mesh {
        match self {
            Self::Cube { size, center } => generate_cube_mesh(*size, *center),
            Self::Tetrahedron { scale } => generate_tetrahedron_mesh(*scale),
            Self::Sphere { r, fn_ } => generate_sphere_mesh(*r, *fn_),
        }
    }
}

fn generate_cube_mesh(size: Vector3<f64>, center: bool) -> Mesh {
    let mut mesh = Mesh::with_capacity(8, 12);

    let (min, max) = if center {
        (
            Point3::new(-size.x / 2.0, -size.y / 2.0, -size.z / 2.0),
            Point3::new(size.x / 2.0, size.y / 2.0, size.z / 2.0),
        )
    } else {
        (Point3::new(0.0, 0.0, 0.0), Point3::new(size.x, size.y, size.z))
    };

    let positions = [
        Point3::new(min.x, min.y, min.z),
        Point3::new(max.x, min.y, min.z),
        Point3::new(max.x, max.y, min.z),
        Point3::new(min.x, max.y, min.z),
        Point3::new(min.x, min.y, max.z),
        Point3::new(max.x, min.y, max.z),
        Point3::new(max.x, max.y, max.z),
        Point3::new(min.x, max.y, max.z),
    ];

    for position in positions {
        let normal = (position - box_center(&min, &max)).normalize();
        mesh.add_vertex(Vertex::new(position, normal));
    }

    // Outward-wound faces sharing the 8 corner vertices.
    let faces: [[usize; 3]; 12] = [
        [4, 5, 6],
        [4, 6, 7], // z+
        [1, 0, 3],
        [1, 3, 2], // z-
        [5, 1, 2],
        [5, 2, 6], // x+
        [0, 4, 7],
        [0, 7, 3], // x-
        [7, 6, 2],
        [7, 2, 3], // y+
        [0, 1, 5],
        [0, 5, 4], // y-
    ];
    for indices in faces {
        mesh.add_triangle(Triangle::new(indices));
    }

    mesh
}

fn box_center(min: &Point3<f64>, max: &Point3<f64>) -> Point3<f64> {
    Point3::new(
        (min.x + max.x) / 2.0,
        (min.y + max.y) / 2.0,
        (min.z + max.z) / 2.0,
    )
}

fn generate_tetrahedron_mesh(scale: f64) -> Mesh {
    let mut mesh = Mesh::with_capacity(4, 4);
    let positions = [
        Point3::new(-scale, -scale, scale),
        Point3::new(-scale, scale, -scale),
        Point3::new(scale, -scale, -scale),
        Point3::new(scale, scale, scale),
    ];
    for position in positions {
        mesh.add_vertex(Vertex::new(position, position.coords.normalize()));
    }
    for indices in [[2, 0, 1], [0, 3, 1], [2, 3, 0], [3, 2, 1]] {
        mesh.add_triangle(Triangle::new(indices));
    }
    mesh
}

fn generate_sphere_mesh(radius: f64, segments: u32) -> Mesh {
    let stacks = segments;
    let slices = segments;
    let mut mesh = Mesh::new();

    // Single pole vertices; interior rings share their seam vertex so the
    // surface closes without welding.
    let top = mesh.add_vertex(Vertex::new(
        Point3::new(0.0, radius, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
    ));

    let mut rings: Vec<Vec<usize>> = Vec::new();
    for i in 1..stacks {
        let phi = PI * i as f64 / stacks as f64;
        let y = radius * phi.cos();
        let r = radius * phi.sin();
        let mut ring = Vec::with_capacity(slices as usize);
        for j in 0..slices {
            let theta = 2.0 * PI * j as f64 / slices as f64;
            let position = Point3::new(r * theta.cos(), y, r * theta.sin());
            ring.push(mesh.add_vertex(Vertex::new(position, position.coords.normalize())));
        }
        rings.push(ring);
    }

    let bottom = mesh.add_vertex(Vertex::new(
        Point3::new(0.0, -radius, 0.0),
        Vector3::new(0.0, -1.0, 0.0),
    ));

    let n = slices as usize;
    // Top cap
    for j in 0..n {
        mesh.add_triangle(Triangle::new([top, rings[0][(j + 1) % n], rings[0][j]]));
    }
    // Quads between rings
    for i in 0..rings.len().saturating_sub(1) {
        for j in 0..n {
            let a = rings[i][j];
            let b = rings[i][(j + 1) % n];
            let c = rings[i + 1][j];
            let d = rings[i + 1][(j + 1) % n];
            mesh.add_triangle(Triangle::new([a, b, d]));
            mesh.add_triangle(Triangle::new([a, d, c]));
        }
    }
    // Bottom cap
    let last = rings.len() - 1;
    for j in 0..n {
        mesh.add_triangle(Triangle::new([bottom, rings[last][j], rings[last][(j + 1) % n]]));
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cube_counts() {
        let mesh = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh();
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        assert_relative_eq!(mesh.signed_volume(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tetrahedron_positive_volume() {
        let mesh = Primitive::tetrahedron(1.0).to_mesh();
        assert_eq!(mesh.triangle_count(), 4);
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn test_sphere_volume_converges() {
        let mesh = Primitive::sphere(1.0, 48).to_mesh();
        let expected = 4.0 / 3.0 * PI;
        let volume = mesh.signed_volume();
        assert!((volume - expected).abs() / expected < 0.02, "volume {volume}");
    }
}

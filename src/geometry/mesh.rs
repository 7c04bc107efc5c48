// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Watertight Contributors

//! Triangle-soup mesh representation
//!
//! This is the import/export surface: plain vertex and triangle arrays with
//! no connectivity. The half-edge engine (`Solid`) is built from it and
//! emits it back; on-disk formats are left to external collaborators.

use super::bbox::Aabb;
use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Vertex with position and normal
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Vertex {
    pub fn new(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { position, normal }
    }

    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        self.position = matrix.transform_point(&self.position);
        // Normals transform by the inverse transpose.
        let normal_matrix = matrix
            .try_inverse()
            .map(|m| m.transpose())
            .unwrap_or(*matrix);
        self.normal = normal_matrix.transform_vector(&self.normal).normalize();
    }
}

/// Triangle defined by three vertex indices
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [usize; 3],
}

impl Triangle {
    pub fn new(indices: [usize; 3]) -> Self {
        Self { indices }
    }
}

/// Triangular mesh
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
        }
    }

    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            triangles: Vec::with_capacity(triangle_count),
        }
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, vertex: Vertex) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Transform all vertices by a matrix
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for vertex in &mut self.vertices {
            vertex.transform(matrix);
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        let positions: Vec<Point3<f64>> = self.vertices.iter().map(|v| v.position).collect();
        Aabb::from_points(&positions)
    }

    /// Signed enclosed volume by the divergence theorem. Positive for a
    /// closed surface with outward-facing winding.
    pub fn signed_volume(&self) -> f64 {
        let mut volume = 0.0;
        for triangle in &self.triangles {
            let v0 = self.vertices[triangle.indices[0]].position.coords;
            let v1 = self.vertices[triangle.indices[1]].position.coords;
            let v2 = self.vertices[triangle.indices[2]].position.coords;
            volume += v0.dot(&v1.cross(&v2));
        }
        volume / 6.0
    }

    /// Weld vertices within epsilon of each other, updating triangle
    /// indices. Returns the number of vertices removed.
    pub fn weld_vertices(&mut self, epsilon: f64) -> usize {
        if self.vertices.is_empty() {
            return 0;
        }

        let original_count = self.vertices.len();
        let mut new_vertices: Vec<Vertex> = Vec::new();
        let mut new_indices: Vec<usize> = vec![0; original_count];

        // Quantized grid keys so the scan stays near-linear; each vertex
        // checks only its own and neighboring cells.
        use std::collections::HashMap;
        let cell = epsilon.max(f64::MIN_POSITIVE) * 2.0;
        let key_of = |p: &Point3<f64>| -> (i64, i64, i64) {
            (
                (p.x / cell).floor() as i64,
                (p.y / cell).floor() as i64,
                (p.z / cell).floor() as i64,
            )
        };
        let mut grid: HashMap<(i64, i64, i64), Vec<usize>> = HashMap::new();

        for i in 0..original_count {
            let pos = self.vertices[i].position;
            let (kx, ky, kz) = key_of(&pos);
            let mut found = None;

            'search: for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        if let Some(bucket) = grid.get(&(kx + dx, ky + dy, kz + dz)) {
                            for &j in bucket {
                                if (new_vertices[j].position - pos).norm() < epsilon {
                                    found = Some(j);
                                    break 'search;
                                }
                            }
                        }
                    }
                }
            }

            match found {
                Some(j) => new_indices[i] = j,
                None => {
                    let j = new_vertices.len();
                    new_indices[i] = j;
                    new_vertices.push(self.vertices[i]);
                    grid.entry((kx, ky, kz)).or_default().push(j);
                }
            }
        }

        for triangle in &mut self.triangles {
            for idx in &mut triangle.indices {
                *idx = new_indices[*idx];
            }
        }

        self.vertices = new_vertices;
        original_count - self.vertices.len()
    }

    /// Recompute vertex normals as area-weighted averages of incident face
    /// normals.
    pub fn recompute_normals(&mut self) {
        if self.vertices.is_empty() || self.triangles.is_empty() {
            return;
        }

        let mut normal_sums: Vec<Vector3<f64>> = vec![Vector3::zeros(); self.vertices.len()];

        for triangle in &self.triangles {
            let v0 = self.vertices[triangle.indices[0]].position;
            let v1 = self.vertices[triangle.indices[1]].position;
            let v2 = self.vertices[triangle.indices[2]].position;

            let face_normal = (v1 - v0).cross(&(v2 - v0));
            if face_normal.norm() > 1e-12 {
                for &idx in &triangle.indices {
                    normal_sums[idx] += face_normal;
                }
            }
        }

        for (i, vertex) in self.vertices.iter_mut().enumerate() {
            let norm = normal_sums[i].norm();
            vertex.normal = if norm > 1e-12 {
                normal_sums[i] / norm
            } else {
                Vector3::new(0.0, 0.0, 1.0)
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_cube_volume() {
        let cube = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh();
        assert_relative_eq!(cube.signed_volume(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_weld_vertices() {
        let mut mesh = Mesh::new();
        let n = Vector3::new(0.0, 0.0, 1.0);
        let a = mesh.add_vertex(Vertex::new(Point3::new(0.0, 0.0, 0.0), n));
        let b = mesh.add_vertex(Vertex::new(Point3::new(1.0, 0.0, 0.0), n));
        let c = mesh.add_vertex(Vertex::new(Point3::new(0.0, 1.0, 0.0), n));
        // Duplicate of b within epsilon.
        let b2 = mesh.add_vertex(Vertex::new(Point3::new(1.0 + 1e-10, 0.0, 0.0), n));
        mesh.add_triangle(Triangle::new([a, b, c]));
        mesh.add_triangle(Triangle::new([b2, a, c]));

        let removed = mesh.weld_vertices(1e-8);
        assert_eq!(removed, 1);
        assert_eq!(mesh.triangles[1].indices[0], b);
    }

    #[test]
    fn test_recompute_normals_unit_length() {
        let mut mesh = Primitive::sphere(2.0, 16).to_mesh();
        mesh.recompute_normals();
        assert!(mesh
            .vertices
            .iter()
            .all(|v| (v.normal.norm() - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_transform_translates_volume_invariant() {
        let mut cube = Primitive::cube(Vector3::new(2.0, 2.0, 2.0), true).to_mesh();
        let before = cube.signed_volume();
        cube.transform(&Matrix4::new_translation(&Vector3::new(5.0, -3.0, 1.0)));
        assert_relative_eq!(cube.signed_volume(), before, epsilon = 1e-9);
    }
}

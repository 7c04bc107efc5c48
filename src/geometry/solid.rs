// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Watertight Contributors

//! Half-edge mesh engine
//!
//! A `Solid` owns its vertex positions, directed-edge connectivity,
//! per-triangle provenance, precision tolerance, and an embedded collider
//! over its face boxes. Topology is created wholesale during construction
//! or result assembly and replaced wholesale on any change; there is no
//! incremental edit API. The collider is rebuilt on every geometry change.

use super::bbox::Aabb;
use super::collider::{morton_code, Collider};
use super::halfedge::{
    build_halfedges, next_halfedge, pair_halfedges, pair_halfedges_with_repair, Halfedge,
};
use super::mesh::{Mesh, Triangle, Vertex};
use super::triangulate::Triangulator;
use crate::error::{DegeneracyWarning, GeometryError};
use crate::params::ExecutionParams;
use nalgebra::{Matrix4, Point3, Vector3};
use rayon::prelude::*;

/// Per-triangle provenance: originating mesh id and original face index.
/// Read-only after build; carried through Boolean reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriRelation {
    pub mesh_id: u32,
    pub original_face: u32,
}

/// Relative tolerance applied to the bounding-box scale when no explicit
/// precision is given.
const BASE_TOLERANCE: f64 = 1e-9;

/// Half-edge mesh with validated topology.
#[derive(Debug, Clone)]
pub struct Solid {
    pub(crate) vert_pos: Vec<Point3<f64>>,
    pub(crate) halfedges: Vec<Halfedge>,
    pub(crate) relations: Vec<TriRelation>,
    pub(crate) face_normals: Vec<Vector3<f64>>,
    pub(crate) vert_normals: Vec<Vector3<f64>>,
    pub(crate) precision: f64,
    pub(crate) collider: Collider,
    pub(crate) bbox: Aabb,
    warnings: Vec<DegeneracyWarning>,
    params: ExecutionParams,
}

impl Solid {
    /// Build a solid from a triangle-soup mesh. Positions are welded at the
    /// derived precision, winding is repaired where that enables pairing,
    /// and the result passes terminal validation or an error is returned.
    pub fn from_mesh(mesh: &Mesh, params: ExecutionParams) -> Result<Self, GeometryError> {
        Self::from_mesh_with_id(mesh, 0, params)
    }

    pub fn from_mesh_with_id(
        mesh: &Mesh,
        mesh_id: u32,
        params: ExecutionParams,
    ) -> Result<Self, GeometryError> {
        for vertex in &mesh.vertices {
            if !vertex.position.coords.iter().all(|c| c.is_finite()) {
                return Err(GeometryError::input("non-finite vertex coordinate"));
            }
        }
        for triangle in &mesh.triangles {
            for &idx in &triangle.indices {
                if idx >= mesh.vertices.len() {
                    return Err(GeometryError::input(format!(
                        "triangle index {idx} out of range ({} vertices)",
                        mesh.vertices.len()
                    )));
                }
            }
        }

        let mut welded = mesh.clone();
        let scale = welded.bounding_box().scale();
        welded.weld_vertices(scale.max(1.0) * BASE_TOLERANCE);

        let positions: Vec<Point3<f64>> = welded.vertices.iter().map(|v| v.position).collect();
        let triangles: Vec<[u32; 3]> = welded
            .triangles
            .iter()
            .map(|t| [t.indices[0] as u32, t.indices[1] as u32, t.indices[2] as u32])
            .collect();
        let relations: Vec<TriRelation> = (0..triangles.len() as u32)
            .map(|face| TriRelation {
                mesh_id,
                original_face: face,
            })
            .collect();

        Self::from_triangles(positions, triangles, relations, None, params)
    }

    /// Build from polygon faces, handing non-triangular faces to the
    /// external triangulation collaborator.
    pub fn from_polygons(
        positions: Vec<Point3<f64>>,
        faces: &[Vec<u32>],
        triangulator: &dyn Triangulator,
        params: ExecutionParams,
    ) -> Result<Self, GeometryError> {
        let mut triangles: Vec<[u32; 3]> = Vec::new();
        let mut relations: Vec<TriRelation> = Vec::new();

        for (face_index, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(GeometryError::input(format!(
                    "face {face_index} has fewer than 3 vertices"
                )));
            }
            for &idx in face {
                if idx as usize >= positions.len() {
                    return Err(GeometryError::input(format!(
                        "face {face_index} references vertex {idx} out of range"
                    )));
                }
            }

            if face.len() == 3 {
                triangles.push([face[0], face[1], face[2]]);
                relations.push(TriRelation {
                    mesh_id: 0,
                    original_face: face_index as u32,
                });
            } else {
                let polygon: Vec<Point3<f64>> =
                    face.iter().map(|&i| positions[i as usize]).collect();
                for tri in triangulator.triangulate(&polygon)? {
                    triangles.push([face[tri[0]], face[tri[1]], face[tri[2]]]);
                    relations.push(TriRelation {
                        mesh_id: 0,
                        original_face: face_index as u32,
                    });
                }
            }
        }

        Self::from_triangles(positions, triangles, relations, None, params)
    }

    /// Core constructor shared by all entry points. Triangles and relations
    /// must be parallel arrays. Runs the terminal validation step.
    pub(crate) fn from_triangles(
        positions: Vec<Point3<f64>>,
        mut triangles: Vec<[u32; 3]>,
        mut relations: Vec<TriRelation>,
        precision: Option<f64>,
        params: ExecutionParams,
    ) -> Result<Self, GeometryError> {
        if triangles.len() != relations.len() {
            return Err(GeometryError::input(format!(
                "relation count {} does not match triangle count {}",
                relations.len(),
                triangles.len()
            )));
        }

        let mut warnings = Vec::new();

        // Index-degenerate triangles never contribute geometry.
        let mut kept = Vec::with_capacity(triangles.len());
        let mut kept_relations = Vec::with_capacity(relations.len());
        for (face, (tri, rel)) in triangles.drain(..).zip(relations.drain(..)).enumerate() {
            if tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2] {
                kept.push(tri);
                kept_relations.push(rel);
            } else {
                warnings.push(DegeneracyWarning::DegenerateCollapse { face, area: 0.0 });
            }
        }
        let mut triangles = kept;
        let (halfedges, unpaired) = pair_halfedges_with_repair(&mut triangles);
        if !unpaired.is_empty() {
            warnings.push(DegeneracyWarning::BoundaryEdges {
                count: unpaired.len(),
            });
        }

        let mut solid = Self {
            vert_pos: positions,
            halfedges,
            relations: kept_relations,
            face_normals: Vec::new(),
            vert_normals: Vec::new(),
            precision: 0.0,
            collider: Collider::default(),
            bbox: Aabb::empty(),
            warnings,
            params,
        };
        solid.set_precision(precision);
        solid.collapse_degenerates();
        solid.finish()?;
        Ok(solid)
    }

    pub fn vertex_count(&self) -> usize {
        self.vert_pos.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.halfedges.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.halfedges.is_empty()
    }

    pub fn precision(&self) -> f64 {
        self.precision
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    pub fn warnings(&self) -> &[DegeneracyWarning] {
        &self.warnings
    }

    pub(crate) fn record_warning(&mut self, warning: DegeneracyWarning) {
        self.warnings.push(warning);
    }

    pub fn relations(&self) -> &[TriRelation] {
        &self.relations
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.vert_pos
    }

    pub fn params(&self) -> ExecutionParams {
        self.params
    }

    /// Triangle index triples reconstructed from the halfedge array.
    pub fn triangles(&self) -> Vec<[u32; 3]> {
        (0..self.triangle_count())
            .map(|face| {
                [
                    self.halfedges[face * 3].start_vert,
                    self.halfedges[face * 3 + 1].start_vert,
                    self.halfedges[face * 3 + 2].start_vert,
                ]
            })
            .collect()
    }

    /// Explicit precision, or one derived from the bounding-box scale.
    /// Every coincidence test in the engine goes through this value.
    pub(crate) fn set_precision(&mut self, precision: Option<f64>) {
        self.bbox = Aabb::from_points(&self.vert_pos);
        let scale = if self.bbox.is_finite() {
            self.bbox.scale().max(1.0)
        } else {
            1.0 // empty solid
        };
        let derived = scale * BASE_TOLERANCE;
        self.precision = match precision {
            Some(p) if p > derived => p,
            _ => derived,
        };
    }

    /// True iff every halfedge is paired and every vertex's incident faces
    /// form a single connected fan.
    pub fn is_manifold(&self) -> bool {
        if self.halfedges.iter().any(|he| he.paired_halfedge.is_none()) {
            return false;
        }

        // One outgoing halfedge per start vertex, plus the outgoing count.
        let mut first_out: Vec<Option<u32>> = vec![None; self.vert_pos.len()];
        let mut out_count: Vec<u32> = vec![0; self.vert_pos.len()];
        for (index, he) in self.halfedges.iter().enumerate() {
            let v = he.start_vert as usize;
            out_count[v] += 1;
            if first_out[v].is_none() {
                first_out[v] = Some(index as u32);
            }
        }

        // Walk the fan: the next outgoing halfedge around a vertex is the
        // in-face successor of the incoming pair.
        for v in 0..self.vert_pos.len() {
            let Some(start) = first_out[v] else {
                continue; // orphaned vertices are pruned by finish()
            };
            let mut current = start;
            let mut steps = 0u32;
            loop {
                steps += 1;
                if steps > out_count[v] {
                    return false; // fan longer than incident count
                }
                let paired = match self.halfedges[current as usize].paired_halfedge {
                    Some(p) => p,
                    None => return false,
                };
                current = next_halfedge(paired);
                if current == start {
                    break;
                }
            }
            if steps != out_count[v] {
                return false; // disconnected fan
            }
        }
        true
    }

    /// Per-triangle normals from winding, then per-vertex normals as
    /// angle-weighted averages of incident triangle normals.
    pub fn calculate_normals(&mut self) {
        let triangles = self.triangles();
        let compute = |tri: &[u32; 3]| -> Vector3<f64> {
            let v0 = self.vert_pos[tri[0] as usize];
            let v1 = self.vert_pos[tri[1] as usize];
            let v2 = self.vert_pos[tri[2] as usize];
            let normal = (v1 - v0).cross(&(v2 - v0));
            let len = normal.norm();
            if len > f64::MIN_POSITIVE {
                normal / len
            } else {
                Vector3::zeros()
            }
        };
        self.face_normals = if self.params.parallel {
            triangles.par_iter().map(compute).collect()
        } else {
            triangles.iter().map(compute).collect()
        };

        let mut sums: Vec<Vector3<f64>> = vec![Vector3::zeros(); self.vert_pos.len()];
        for (face, tri) in triangles.iter().enumerate() {
            for i in 0..3 {
                let prev = self.vert_pos[tri[(i + 2) % 3] as usize];
                let here = self.vert_pos[tri[i] as usize];
                let next = self.vert_pos[tri[(i + 1) % 3] as usize];
                let a = (next - here).normalize();
                let b = (prev - here).normalize();
                let angle = a.dot(&b).clamp(-1.0, 1.0).acos();
                sums[tri[i] as usize] += self.face_normals[face] * angle;
            }
        }
        self.vert_normals = sums
            .into_iter()
            .map(|n| {
                let len = n.norm();
                if len > f64::MIN_POSITIVE {
                    n / len
                } else {
                    Vector3::new(0.0, 0.0, 1.0)
                }
            })
            .collect();
    }

    /// One box per triangle, a data-parallel pass feeding the collider.
    pub fn face_boxes(&self) -> Vec<Aabb> {
        let triangles = self.triangles();
        let compute = |tri: &[u32; 3]| {
            let mut bbox = Aabb::empty();
            for &v in tri {
                bbox.expand_to_include(&self.vert_pos[v as usize]);
            }
            bbox
        };
        if self.params.parallel {
            triangles.par_iter().map(compute).collect()
        } else {
            triangles.iter().map(compute).collect()
        }
    }

    /// Forward halfedges (start < end) with their boxes: one entry per
    /// undirected edge, paired with the halfedge index it came from.
    pub fn edge_boxes(&self) -> (Vec<u32>, Vec<Aabb>) {
        let forward: Vec<u32> = (0..self.halfedges.len() as u32)
            .filter(|&i| self.halfedges[i as usize].is_forward())
            .collect();
        let compute = |&index: &u32| {
            let he = &self.halfedges[index as usize];
            let mut bbox = Aabb::empty();
            bbox.expand_to_include(&self.vert_pos[he.start_vert as usize]);
            bbox.expand_to_include(&self.vert_pos[he.end_vert as usize]);
            bbox
        };
        let boxes = if self.params.parallel {
            forward.par_iter().map(compute).collect()
        } else {
            forward.iter().map(compute).collect()
        };
        (forward, boxes)
    }

    /// Collapse triangles whose area falls below the precision threshold.
    /// Zero-length edges are resolved by merging their endpoints and
    /// re-pairing the freed edges; slivers with three distinct corners are
    /// kept and reported, never silently hidden.
    pub fn collapse_degenerates(&mut self) {
        if self.halfedges.is_empty() {
            return;
        }
        let mut triangles = self.triangles();

        // Union-find style vertex remap for below-precision edges.
        let mut remap: Vec<u32> = (0..self.vert_pos.len() as u32).collect();
        let mut merged_any = false;
        for tri in &triangles {
            for i in 0..3 {
                let a = tri[i] as usize;
                let b = tri[(i + 1) % 3] as usize;
                if a != b && (self.vert_pos[a] - self.vert_pos[b]).norm() < self.precision {
                    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
                    remap[hi] = remap[lo];
                    merged_any = true;
                }
            }
        }
        let resolve = |remap: &[u32], mut v: u32| -> u32 {
            while remap[v as usize] != v {
                v = remap[v as usize];
            }
            v
        };

        let mut kept_triangles = Vec::with_capacity(triangles.len());
        let mut kept_relations = Vec::with_capacity(self.relations.len());
        let mut warnings = Vec::new();
        for (face, tri) in triangles.drain(..).enumerate() {
            let mapped = [
                resolve(&remap, tri[0]),
                resolve(&remap, tri[1]),
                resolve(&remap, tri[2]),
            ];
            if mapped[0] == mapped[1] || mapped[1] == mapped[2] || mapped[0] == mapped[2] {
                let v0 = self.vert_pos[tri[0] as usize];
                let v1 = self.vert_pos[tri[1] as usize];
                let v2 = self.vert_pos[tri[2] as usize];
                let area = (v1 - v0).cross(&(v2 - v0)).norm() / 2.0;
                warnings.push(DegeneracyWarning::DegenerateCollapse { face, area });
                continue;
            }

            let v0 = self.vert_pos[mapped[0] as usize];
            let v1 = self.vert_pos[mapped[1] as usize];
            let v2 = self.vert_pos[mapped[2] as usize];
            let area = (v1 - v0).cross(&(v2 - v0)).norm() / 2.0;
            let longest = (v1 - v0)
                .norm()
                .max((v2 - v1).norm())
                .max((v0 - v2).norm());
            if area < self.precision * longest / 2.0 {
                // A sliver: removal would open a hole, so keep and report.
                warnings.push(DegeneracyWarning::UnresolvedDegenerate { face });
            }
            kept_triangles.push(mapped);
            kept_relations.push(self.relations[face]);
        }

        if merged_any || kept_triangles.len() != self.triangle_count() {
            self.halfedges = build_halfedges(&kept_triangles);
            let unpaired = pair_halfedges(&mut self.halfedges);
            if !unpaired.is_empty() {
                warnings.push(DegeneracyWarning::BoundaryEdges {
                    count: unpaired.len(),
                });
            }
            self.relations = kept_relations;
        }
        self.warnings.extend(warnings);
    }

    /// Drop vertices not referenced by any face, remapping indices.
    fn prune_orphans(&mut self) {
        let mut used = vec![false; self.vert_pos.len()];
        for he in &self.halfedges {
            used[he.start_vert as usize] = true;
            used[he.end_vert as usize] = true;
        }
        if used.iter().all(|&u| u) {
            return;
        }

        let mut new_index = vec![u32::MAX; self.vert_pos.len()];
        let mut new_pos = Vec::new();
        for (old, &keep) in used.iter().enumerate() {
            if keep {
                new_index[old] = new_pos.len() as u32;
                new_pos.push(self.vert_pos[old]);
            }
        }
        for he in &mut self.halfedges {
            he.start_vert = new_index[he.start_vert as usize];
            he.end_vert = new_index[he.end_vert as usize];
        }
        self.vert_pos = new_pos;
    }

    /// Reorder vertices and faces along the Morton curve for locality and
    /// downstream hierarchy quality. Pairing and provenance are preserved;
    /// the result is round-trip equivalent to the input.
    pub fn reindex_spatial(&mut self) {
        if self.halfedges.is_empty() {
            return;
        }
        let extent = self.bbox;

        // Vertex permutation by spatial code.
        let mut vert_order: Vec<(u32, u32)> = if self.params.parallel {
            self.vert_pos
                .par_iter()
                .enumerate()
                .map(|(i, p)| (morton_code(p, &extent), i as u32))
                .collect()
        } else {
            self.vert_pos
                .iter()
                .enumerate()
                .map(|(i, p)| (morton_code(p, &extent), i as u32))
                .collect()
        };
        vert_order.sort_unstable();

        let mut new_of_old = vec![0u32; self.vert_pos.len()];
        let mut new_pos = Vec::with_capacity(self.vert_pos.len());
        for (new, &(_, old)) in vert_order.iter().enumerate() {
            new_of_old[old as usize] = new as u32;
            new_pos.push(self.vert_pos[old as usize]);
        }
        self.vert_pos = new_pos;

        // Face permutation by face-box center code.
        let triangles: Vec<[u32; 3]> = self
            .triangles()
            .iter()
            .map(|tri| {
                [
                    new_of_old[tri[0] as usize],
                    new_of_old[tri[1] as usize],
                    new_of_old[tri[2] as usize],
                ]
            })
            .collect();
        let mut face_order: Vec<(u32, u32)> = triangles
            .iter()
            .enumerate()
            .map(|(face, tri)| {
                let mut bbox = Aabb::empty();
                for &v in tri {
                    bbox.expand_to_include(&self.vert_pos[v as usize]);
                }
                (morton_code(&bbox.center(), &extent), face as u32)
            })
            .collect();
        face_order.sort_unstable();

        let mut new_triangles = Vec::with_capacity(triangles.len());
        let mut new_relations = Vec::with_capacity(self.relations.len());
        for &(_, old_face) in &face_order {
            new_triangles.push(triangles[old_face as usize]);
            new_relations.push(self.relations[old_face as usize]);
        }

        self.halfedges = build_halfedges(&new_triangles);
        pair_halfedges(&mut self.halfedges);
        self.relations = new_relations;
        self.finish_internal();
    }

    /// Apply an affine transform to all positions, then refresh derived
    /// state (normals, boxes, collider, precision).
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for p in &mut self.vert_pos {
            *p = matrix.transform_point(p);
        }
        self.finish_internal();
    }

    fn finish_internal(&mut self) {
        self.set_precision(Some(self.precision));
        self.calculate_normals();
        self.collider = Collider::new(self.face_boxes(), &self.params);
    }

    /// Terminal validation: refresh collider boxes and derived state, then
    /// assert manifoldness. On failure the structural error is returned
    /// instead of a silently corrupt mesh.
    pub fn finish(&mut self) -> Result<(), GeometryError> {
        self.prune_orphans();
        self.finish_internal();

        if !self.is_manifold() {
            let unpaired = self
                .halfedges
                .iter()
                .filter(|he| he.paired_halfedge.is_none())
                .count();
            return Err(GeometryError::structural(format!(
                "mesh failed manifoldness validation ({unpaired} unpaired halfedges, {} faces)",
                self.triangle_count()
            )));
        }
        if self.params.strict_validation
            && self
                .warnings
                .iter()
                .any(|w| matches!(w, DegeneracyWarning::UnresolvedDegenerate { .. }))
        {
            return Err(GeometryError::structural(
                "unresolved degenerate triangles under strict validation".to_string(),
            ));
        }
        Ok(())
    }

    /// Signed enclosed volume by the divergence theorem.
    pub fn signed_volume(&self) -> f64 {
        let mut volume = 0.0;
        for tri in self.triangles() {
            let v0 = self.vert_pos[tri[0] as usize].coords;
            let v1 = self.vert_pos[tri[1] as usize].coords;
            let v2 = self.vert_pos[tri[2] as usize].coords;
            volume += v0.dot(&v1.cross(&v2));
        }
        volume / 6.0
    }

    /// Export back to a triangle-soup mesh with vertex normals.
    pub fn to_mesh(&self) -> Mesh {
        let mut mesh = Mesh::with_capacity(self.vert_pos.len(), self.triangle_count());
        for (i, &position) in self.vert_pos.iter().enumerate() {
            let normal = self
                .vert_normals
                .get(i)
                .copied()
                .unwrap_or_else(|| Vector3::new(0.0, 0.0, 1.0));
            mesh.add_vertex(Vertex::new(position, normal));
        }
        for tri in self.triangles() {
            mesh.add_triangle(Triangle::new([
                tri[0] as usize,
                tri[1] as usize,
                tri[2] as usize,
            ]));
        }
        mesh
    }
}

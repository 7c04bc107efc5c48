// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Watertight Contributors

//! Bounding-volume hierarchy over axis-aligned boxes
//!
//! Built by sorting box centers along a Morton space-filling curve and
//! assembling a balanced tree directly from sort order, the same principle
//! as parallel BVH construction from sorted codes. The hierarchy is rebuilt
//! in full on every geometry change; box counts change on every operation,
//! so rebuild-from-sort is cheaper than maintaining incremental balance and
//! queries stay trivially parallel and read-only.

use super::bbox::Aabb;
use super::sparse::CandidatePairs;
use crate::error::GeometryError;
use crate::params::ExecutionParams;
use nalgebra::{Matrix4, Point3};
use rayon::prelude::*;

/// Spread the low 10 bits of x so there are two zero bits between each.
fn expand_bits(x: u32) -> u32 {
    let mut x = x & 0x3ff;
    x = (x | (x << 16)) & 0x030000ff;
    x = (x | (x << 8)) & 0x0300f00f;
    x = (x | (x << 4)) & 0x030c30c3;
    x = (x | (x << 2)) & 0x09249249;
    x
}

/// 30-bit Morton code of a point within the global extent. Coordinates are
/// quantized to 10 bits per axis and bit-interleaved, yielding a 1D order
/// that preserves spatial locality.
pub fn morton_code(position: &Point3<f64>, extent: &Aabb) -> u32 {
    let size = extent.size();
    let quantize = |value: f64, min: f64, range: f64| -> u32 {
        if range <= 0.0 {
            return 0;
        }
        let normalized = ((value - min) / range).clamp(0.0, 1.0);
        (normalized * 1023.0) as u32
    };
    let x = quantize(position.x, extent.min.x, size.x);
    let y = quantize(position.y, extent.min.y, size.y);
    let z = quantize(position.z, extent.min.z, size.z);
    (expand_bits(x) << 2) | (expand_bits(y) << 1) | expand_bits(z)
}

#[derive(Debug, Clone)]
enum Node {
    /// Index into the stored box array.
    Leaf { bbox: Aabb, index: u32 },
    Internal { bbox: Aabb, left: u32, right: u32 },
}

impl Node {
    fn bbox(&self) -> &Aabb {
        match self {
            Node::Leaf { bbox, .. } => bbox,
            Node::Internal { bbox, .. } => bbox,
        }
    }
}

/// BVH collider answering bulk box-overlap queries.
///
/// Invariant: the hierarchy always reflects the most recently set boxes;
/// each update triggers a full rebuild.
#[derive(Debug, Clone, Default)]
pub struct Collider {
    boxes: Vec<Aabb>,
    nodes: Vec<Node>,
    root: u32,
}

impl Collider {
    pub fn new(boxes: Vec<Aabb>, params: &ExecutionParams) -> Self {
        let mut collider = Self {
            boxes,
            nodes: Vec::new(),
            root: 0,
        };
        collider.rebuild(params);
        collider
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn boxes(&self) -> &[Aabb] {
        &self.boxes
    }

    /// Replace the stored geometry and rebuild. Fails if the count differs
    /// from the original; a changed count means the caller should construct
    /// a new collider instead.
    pub fn update_boxes(
        &mut self,
        boxes: Vec<Aabb>,
        params: &ExecutionParams,
    ) -> Result<(), GeometryError> {
        if boxes.len() != self.boxes.len() {
            return Err(GeometryError::input(format!(
                "update_boxes count mismatch: expected {}, got {}",
                self.boxes.len(),
                boxes.len()
            )));
        }
        self.boxes = boxes;
        self.rebuild(params);
        Ok(())
    }

    /// Apply an affine map to every box, then rebuild.
    pub fn transform(&mut self, matrix: &Matrix4<f64>, params: &ExecutionParams) {
        for bbox in &mut self.boxes {
            *bbox = bbox.transform(matrix);
        }
        self.rebuild(params);
    }

    fn rebuild(&mut self, params: &ExecutionParams) {
        self.nodes.clear();
        if self.boxes.is_empty() {
            return;
        }

        // Global extent over box centers, then a Morton code per center.
        let mut extent = Aabb::empty();
        for bbox in &self.boxes {
            extent.expand_to_include(&bbox.center());
        }

        let mut order: Vec<(u32, u32)> = if params.parallel {
            self.boxes
                .par_iter()
                .enumerate()
                .map(|(i, bbox)| (morton_code(&bbox.center(), &extent), i as u32))
                .collect()
        } else {
            self.boxes
                .iter()
                .enumerate()
                .map(|(i, bbox)| (morton_code(&bbox.center(), &extent), i as u32))
                .collect()
        };
        order.sort_unstable();

        let leaves: Vec<u32> = order.into_iter().map(|(_, i)| i).collect();
        self.root = self.build_range(&leaves);
    }

    /// Assemble a balanced subtree over a contiguous run of the sorted leaf
    /// order. Midpoint splits over the Morton order keep the tree balanced
    /// without any cost evaluation.
    fn build_range(&mut self, leaves: &[u32]) -> u32 {
        if leaves.len() == 1 {
            let index = leaves[0];
            self.nodes.push(Node::Leaf {
                bbox: self.boxes[index as usize],
                index,
            });
            return (self.nodes.len() - 1) as u32;
        }

        let mid = leaves.len() / 2;
        let left = self.build_range(&leaves[..mid]);
        let right = self.build_range(&leaves[mid..]);
        let bbox = self.nodes[left as usize]
            .bbox()
            .union(self.nodes[right as usize].bbox());
        self.nodes.push(Node::Internal { bbox, left, right });
        (self.nodes.len() - 1) as u32
    }

    /// Collect every stored index whose box overlaps the query box under the
    /// tolerance margin. Stack-based traversal pruning subtrees whose box
    /// misses the query; returns all true overlaps, since later stages
    /// cheaply reject false positives but cannot recover missed candidates.
    fn collisions_single(&self, query_index: u32, query: &Aabb, tolerance: f64, out: &mut CandidatePairs) {
        if self.nodes.is_empty() {
            return;
        }
        let mut stack = vec![self.root];
        while let Some(node_index) = stack.pop() {
            match &self.nodes[node_index as usize] {
                Node::Leaf { bbox, index } => {
                    if bbox.overlaps(query, tolerance) {
                        out.add(query_index, *index);
                    }
                }
                Node::Internal { bbox, left, right } => {
                    if bbox.overlaps(query, tolerance) {
                        stack.push(*left);
                        stack.push(*right);
                    }
                }
            }
        }
    }

    /// Bulk overlap query: one candidate set covering every (query, stored)
    /// overlap. Queries are independent read-only traversals, so the pass is
    /// data-parallel.
    pub fn collisions(&self, queries: &[Aabb], tolerance: f64, params: &ExecutionParams) -> CandidatePairs {
        if self.nodes.is_empty() || queries.is_empty() {
            return CandidatePairs::new();
        }

        if params.parallel {
            queries
                .par_iter()
                .enumerate()
                .map(|(i, query)| {
                    let mut local = CandidatePairs::new();
                    self.collisions_single(i as u32, query, tolerance, &mut local);
                    local
                })
                .reduce(CandidatePairs::new, |mut acc, local| {
                    acc.extend(&local);
                    acc
                })
        } else {
            let mut out = CandidatePairs::new();
            for (i, query) in queries.iter().enumerate() {
                self.collisions_single(i as u32, query, tolerance, &mut out);
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box_at(x: f64, y: f64, z: f64) -> Aabb {
        Aabb::new(Point3::new(x, y, z), Point3::new(x + 1.0, y + 1.0, z + 1.0))
    }

    #[test]
    fn test_morton_ordering_preserves_locality() {
        let extent = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(8.0, 8.0, 8.0));
        let near_origin = morton_code(&Point3::new(0.1, 0.1, 0.1), &extent);
        let far_corner = morton_code(&Point3::new(7.9, 7.9, 7.9), &extent);
        assert!(near_origin < far_corner);
    }

    #[test]
    fn test_collisions_exhaustive() {
        let stored: Vec<Aabb> = (0..16).map(|i| unit_box_at(i as f64 * 2.0, 0.0, 0.0)).collect();
        let collider = Collider::new(stored.clone(), &ExecutionParams::sequential());

        let queries = vec![unit_box_at(3.5, 0.0, 0.0), unit_box_at(100.0, 0.0, 0.0)];
        let mut pairs = collider.collisions(&queries, 0.0, &ExecutionParams::sequential());
        pairs.unique();

        // Brute-force reference: no false negatives, no spurious positives.
        let mut expected = Vec::new();
        for (qi, query) in queries.iter().enumerate() {
            for (si, bbox) in stored.iter().enumerate() {
                if bbox.overlaps(query, 0.0) {
                    expected.push((qi as u32, si as u32));
                }
            }
        }
        let collected: Vec<_> = pairs.iter().collect();
        assert_eq!(collected, expected);
        assert!(!expected.is_empty());
    }

    #[test]
    fn test_update_boxes_count_mismatch() {
        let mut collider = Collider::new(vec![unit_box_at(0.0, 0.0, 0.0)], &ExecutionParams::sequential());
        let result = collider.update_boxes(
            vec![unit_box_at(0.0, 0.0, 0.0), unit_box_at(2.0, 0.0, 0.0)],
            &ExecutionParams::sequential(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_update_boxes_rebuilds() {
        let mut collider = Collider::new(vec![unit_box_at(0.0, 0.0, 0.0)], &ExecutionParams::sequential());
        collider
            .update_boxes(vec![unit_box_at(10.0, 0.0, 0.0)], &ExecutionParams::sequential())
            .unwrap();

        let queries = vec![unit_box_at(10.2, 0.0, 0.0)];
        let pairs = collider.collisions(&queries, 0.0, &ExecutionParams::sequential());
        assert_eq!(pairs.len(), 1);

        let stale = vec![unit_box_at(0.2, 0.0, 0.0)];
        let pairs = collider.collisions(&stale, 0.0, &ExecutionParams::sequential());
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_empty_collider() {
        let collider = Collider::new(Vec::new(), &ExecutionParams::default());
        let pairs = collider.collisions(&[unit_box_at(0.0, 0.0, 0.0)], 0.0, &ExecutionParams::default());
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_sequential_build_matches_parallel() {
        let stored: Vec<Aabb> = (0..64)
            .map(|i| unit_box_at((i % 8) as f64 * 1.5, (i / 8) as f64 * 1.5, 0.0))
            .collect();
        let sequential = Collider::new(stored.clone(), &ExecutionParams::sequential());
        let parallel = Collider::new(stored.clone(), &ExecutionParams::default());

        let queries: Vec<Aabb> = (0..8).map(|i| unit_box_at(i as f64 * 1.2, 1.0, 0.0)).collect();
        let mut from_seq = sequential.collisions(&queries, 0.0, &ExecutionParams::sequential());
        let mut from_par = parallel.collisions(&queries, 0.0, &ExecutionParams::sequential());
        from_seq.unique();
        from_par.unique();
        let seq_pairs: Vec<_> = from_seq.iter().collect();
        let par_pairs: Vec<_> = from_par.iter().collect();
        assert_eq!(seq_pairs, par_pairs);
        assert!(!seq_pairs.is_empty());
    }

    #[test]
    fn test_tolerance_margin() {
        let collider = Collider::new(vec![unit_box_at(0.0, 0.0, 0.0)], &ExecutionParams::sequential());
        let query = vec![unit_box_at(1.05, 0.0, 0.0)]; // 0.05 gap
        assert!(collider
            .collisions(&query, 0.0, &ExecutionParams::sequential())
            .is_empty());
        assert_eq!(
            collider
                .collisions(&query, 0.1, &ExecutionParams::sequential())
                .len(),
            1
        );
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Watertight Contributors

//! Half-edge records and edge pairing
//!
//! Halfedges are stored three per triangle in face order, so the face and
//! in-face position are implied by the index. Pairing matches each directed
//! edge with its opposite by endpoint pair; the repair variant first
//! propagates a consistent winding across the mesh so flipped input faces
//! can still pair.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Directed edge record. A paired halfedge of `None` marks an edge that is
/// invalid during construction or lies on an open boundary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Halfedge {
    pub start_vert: u32,
    pub end_vert: u32,
    pub paired_halfedge: Option<u32>,
    pub face: u32,
}

impl Halfedge {
    /// Canonical undirected key for matching opposites.
    pub fn key(&self) -> (u32, u32) {
        if self.start_vert < self.end_vert {
            (self.start_vert, self.end_vert)
        } else {
            (self.end_vert, self.start_vert)
        }
    }

    pub fn is_forward(&self) -> bool {
        self.start_vert < self.end_vert
    }
}

/// Next halfedge within the same triangle.
pub fn next_halfedge(index: u32) -> u32 {
    let base = index / 3 * 3;
    base + (index + 1) % 3
}

/// Previous halfedge within the same triangle.
pub fn prev_halfedge(index: u32) -> u32 {
    let base = index / 3 * 3;
    base + (index + 2) % 3
}

/// Build the directed-edge array from a triangle list, three halfedges per
/// face, pairing unset.
pub fn build_halfedges(triangles: &[[u32; 3]]) -> Vec<Halfedge> {
    let mut halfedges = Vec::with_capacity(triangles.len() * 3);
    for (face, tri) in triangles.iter().enumerate() {
        for i in 0..3 {
            halfedges.push(Halfedge {
                start_vert: tri[i],
                end_vert: tri[(i + 1) % 3],
                paired_halfedge: None,
                face: face as u32,
            });
        }
    }
    halfedges
}

/// Match opposite directed edges by endpoint pair. Returns the indices of
/// halfedges left unpaired (boundary or non-manifold edges), sorted.
pub fn pair_halfedges(halfedges: &mut [Halfedge]) -> Vec<u32> {
    // Key -> halfedges waiting for an opposite-direction partner.
    let mut open: HashMap<(u32, u32), Vec<u32>> = HashMap::new();

    for index in 0..halfedges.len() as u32 {
        let he = halfedges[index as usize];
        let key = he.key();
        let bucket = open.entry(key).or_default();

        // Find a waiting halfedge running the opposite direction.
        if let Some(pos) = bucket.iter().position(|&other| {
            let o = &halfedges[other as usize];
            o.start_vert == he.end_vert && o.end_vert == he.start_vert
        }) {
            let other = bucket.swap_remove(pos);
            halfedges[index as usize].paired_halfedge = Some(other);
            halfedges[other as usize].paired_halfedge = Some(index);
        } else {
            bucket.push(index);
        }
    }

    let mut unpaired: Vec<u32> = open.into_values().flatten().collect();
    unpaired.sort_unstable();
    unpaired
}

/// Pair with winding repair: if plain pairing leaves edges open, propagate a
/// consistent winding across the triangles and pair again. Returns the built
/// halfedge array and the indices still unpaired (true boundary edges).
pub fn pair_halfedges_with_repair(triangles: &mut [[u32; 3]]) -> (Vec<Halfedge>, Vec<u32>) {
    let mut halfedges = build_halfedges(triangles);
    let unpaired = pair_halfedges(&mut halfedges);
    if unpaired.is_empty() {
        return (halfedges, unpaired);
    }

    orient_triangles(triangles);
    let mut halfedges = build_halfedges(triangles);
    let unpaired = pair_halfedges(&mut halfedges);
    (halfedges, unpaired)
}

fn effective_winding(tri: [u32; 3], flip: bool) -> [u32; 3] {
    if flip {
        [tri[0], tri[2], tri[1]]
    } else {
        tri
    }
}

/// Propagate a consistent winding across the triangle list by flooding over
/// shared edges, flipping faces whose shared edge runs the same direction as
/// the seed component. Returns the number of faces flipped.
pub fn orient_triangles(triangles: &mut [[u32; 3]]) -> usize {
    if triangles.is_empty() {
        return 0;
    }

    // Undirected edge -> adjacent (face, directed start, directed end).
    let mut edge_faces: HashMap<(u32, u32), Vec<(u32, u32, u32)>> = HashMap::new();
    for (face, tri) in triangles.iter().enumerate() {
        for i in 0..3 {
            let a = tri[i];
            let b = tri[(i + 1) % 3];
            let key = if a < b { (a, b) } else { (b, a) };
            edge_faces.entry(key).or_default().push((face as u32, a, b));
        }
    }

    let mut visited = vec![false; triangles.len()];
    let mut flipped = vec![false; triangles.len()];
    let mut flip_count = 0;

    for seed in 0..triangles.len() {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        let mut queue = vec![seed as u32];

        while let Some(face) = queue.pop() {
            let this = effective_winding(triangles[face as usize], flipped[face as usize]);

            for i in 0..3 {
                let a = this[i];
                let b = this[(i + 1) % 3];
                let key = if a < b { (a, b) } else { (b, a) };
                let Some(entries) = edge_faces.get(&key) else {
                    continue;
                };
                for &(other, _, _) in entries {
                    if other == face || visited[other as usize] {
                        continue;
                    }
                    let other_tri =
                        effective_winding(triangles[other as usize], flipped[other as usize]);
                    // A consistently wound neighbor traverses the shared
                    // edge in the opposite direction.
                    let same_direction = (0..3).any(|j| {
                        other_tri[j] == a && other_tri[(j + 1) % 3] == b
                    });
                    if same_direction {
                        flipped[other as usize] = true;
                        flip_count += 1;
                    }
                    visited[other as usize] = true;
                    queue.push(other);
                }
            }
        }
    }

    for (face, tri) in triangles.iter_mut().enumerate() {
        if flipped[face] {
            tri.swap(1, 2);
        }
    }
    flip_count
}

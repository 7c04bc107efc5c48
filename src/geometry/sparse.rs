// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Watertight Contributors

//! Candidate-pair bookkeeping for collider queries
//!
//! A `CandidatePairs` collects (query, stored) index pairs cheaply during
//! traversal; callers sort, deduplicate, and filter before the pairs reach
//! any intersection predicate.

use nalgebra::Point3;

/// Reserved sentinel marking an index with no referent.
pub const INVALID_INDEX: u32 = u32::MAX;

/// A sortable, deduplicatable collection of (left, right) index pairs.
#[derive(Debug, Clone, Default)]
pub struct CandidatePairs {
    pairs: Vec<(u32, u32)>,
}

impl CandidatePairs {
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pairs: Vec::with_capacity(capacity),
        }
    }

    /// Append a pair. No uniqueness is required at insertion.
    pub fn add(&mut self, left: u32, right: u32) {
        self.pairs.push((left, right));
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.pairs.iter().copied()
    }

    /// Sort lexicographically by (left, right) and remove duplicates in
    /// place. Returns the resulting count.
    pub fn unique(&mut self) -> usize {
        self.pairs.sort_unstable();
        self.pairs.dedup();
        self.pairs.len()
    }

    /// Silently drop pairs referencing non-finite geometry on either side.
    /// Deliberate no-error policy: NaN/Inf propagated from upstream must not
    /// reach the intersection predicates, and there is nothing useful to
    /// report about them here.
    pub fn keep_finite(&mut self, left_positions: &[Point3<f64>], right_positions: &[Point3<f64>]) {
        let finite = |positions: &[Point3<f64>], idx: u32| -> bool {
            match positions.get(idx as usize) {
                Some(p) => p.coords.iter().all(|c| c.is_finite()),
                None => true, // index does not reference this array
            }
        };
        self.pairs.retain(|&(l, r)| {
            finite(left_positions, l) && finite(right_positions, r)
        });
    }

    /// Drop pairs carrying the reserved sentinel on either side. After this
    /// no (sentinel, sentinel) pair survives.
    pub fn remove_invalid(&mut self) {
        self.pairs
            .retain(|&(l, r)| l != INVALID_INDEX && r != INVALID_INDEX);
    }

    /// Sorted, deduplicated projection of the left column: every left entity
    /// that participated in any candidate.
    pub fn left_indices(&self) -> Vec<u32> {
        let mut out: Vec<u32> = self.pairs.iter().map(|&(l, _)| l).collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Sorted, deduplicated projection of the right column.
    pub fn right_indices(&self) -> Vec<u32> {
        let mut out: Vec<u32> = self.pairs.iter().map(|&(_, r)| r).collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn extend(&mut self, other: &CandidatePairs) {
        self.pairs.extend_from_slice(&other.pairs);
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Watertight Contributors

//! Error taxonomy for mesh construction and Boolean operations

use thiserror::Error;

/// Hard failures surfaced to the caller.
///
/// `Input` aborts before any processing; `Structural` is detected only by
/// terminal validation and replaces a corrupt result.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// Mismatched array sizes or non-finite coordinates, detected at entry.
    #[error("input error: {0}")]
    Input(String),

    /// The assembled result failed manifoldness validation.
    #[error("structural error: {0}")]
    Structural(String),
}

/// Recoverable degeneracies recorded on a result while processing continues.
#[derive(Debug, Clone, PartialEq)]
pub enum DegeneracyWarning {
    /// A below-precision-area triangle was collapsed.
    DegenerateCollapse { face: usize, area: f64 },
    /// A degenerate triangle could not be re-paired and was dropped as-is.
    UnresolvedDegenerate { face: usize },
    /// Two coplanar overlapping faces were resolved by the deterministic
    /// tie-break rule.
    CoplanarTieBreak { face: usize },
    /// Edges left unpaired after the repair pass (open boundary).
    BoundaryEdges { count: usize },
}

impl GeometryError {
    pub fn input(msg: impl Into<String>) -> Self {
        GeometryError::Input(msg.into())
    }

    pub fn structural(msg: impl Into<String>) -> Self {
        GeometryError::Structural(msg.into())
    }
}

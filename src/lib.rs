// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Watertight Contributors

//! Watertight
//!
//! A robust Boolean (CSG) engine over closed triangle meshes. Solids are
//! half-edge meshes validated for manifoldness, collision narrowing runs on
//! a Morton-sorted bounding-volume hierarchy, and Union, Intersection, and
//! Difference reconstruct watertight results with per-face provenance.

pub mod error;
pub mod geometry;
pub mod params;

pub use error::{DegeneracyWarning, GeometryError};
pub use geometry::{Aabb, BooleanOp, Collider, Mesh, Primitive, Solid};
pub use params::ExecutionParams;

use anyhow::Result;

/// Convenience entry point: apply a Boolean operation to two triangle-soup
/// meshes, validating both and returning the result as a mesh.
pub fn boolean_mesh(a: &Mesh, b: &Mesh, op: BooleanOp) -> Result<Mesh> {
    let params = ExecutionParams::default();
    let left = Solid::from_mesh_with_id(a, 0, params)?;
    let right = Solid::from_mesh_with_id(b, 1, params)?;
    Ok(left.boolean(&right, op)?.to_mesh())
}

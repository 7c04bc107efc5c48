// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Watertight Contributors

//! Geometry module - mesh representation, collision, and Boolean operations

mod bbox;
mod boolean;
mod collider;
mod halfedge;
mod mesh;
mod predicates;
mod primitives;
mod solid;
mod sparse;
mod triangulate;

pub use bbox::Aabb;
pub use boolean::{boolean, BooleanOp};
pub use collider::{morton_code, Collider};
pub use halfedge::{
    build_halfedges, next_halfedge, orient_triangles, pair_halfedges,
    pair_halfedges_with_repair, prev_halfedge, Halfedge,
};
pub use mesh::{Mesh, Triangle, Vertex};
pub use predicates::{intersect_edge_triangle, EdgeClass, EdgeTriHit, PlaneSide, PointClass};
pub use primitives::Primitive;
pub use solid::{Solid, TriRelation};
pub use sparse::{CandidatePairs, INVALID_INDEX};
pub use triangulate::{FanTriangulator, Triangulator};

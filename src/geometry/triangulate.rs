// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Watertight Contributors

//! Polygon triangulation seam
//!
//! Non-triangular faces arriving through the polygon entry point are handed
//! to a `Triangulator`. The built-in fan triangulator covers convex faces;
//! callers with concave or holed input supply their own implementation.

use crate::error::GeometryError;
use nalgebra::Point3;

/// Splits a planar polygon into triangles, returned as index triples into
/// the input vertex slice.
pub trait Triangulator {
    fn triangulate(&self, polygon: &[Point3<f64>]) -> Result<Vec<[usize; 3]>, GeometryError>;
}

/// Fan triangulation from the first vertex. Correct for convex polygons
/// only; the triangles inherit the polygon's winding.
#[derive(Debug, Clone, Copy, Default)]
pub struct FanTriangulator;

impl Triangulator for FanTriangulator {
    fn triangulate(&self, polygon: &[Point3<f64>]) -> Result<Vec<[usize; 3]>, GeometryError> {
        if polygon.len() < 3 {
            return Err(GeometryError::input(format!(
                "cannot triangulate polygon with {} vertices",
                polygon.len()
            )));
        }
        Ok((1..polygon.len() - 1).map(|i| [0, i, i + 1]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_quad() {
        let quad = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let tris = FanTriangulator.triangulate(&quad).unwrap();
        assert_eq!(tris, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_degenerate_polygon_rejected() {
        let line = [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        assert!(FanTriangulator.triangulate(&line).is_err());
    }
}

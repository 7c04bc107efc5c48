// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Watertight Contributors

//! Precision-tolerant geometric predicates
//!
//! Every coincidence decision goes through an explicit epsilon instead of
//! exact equality; the epsilon comes from the owning mesh's precision, which
//! is derived from its bounding-box scale.

use nalgebra::{Point3, Vector3};

/// Side of a plane, under epsilon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    Front,
    Back,
    On,
}

/// How an edge relates to a candidate face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeClass {
    /// The edge pierces the face interior transversally.
    Crossing,
    /// An endpoint or the edge line lies on the face within epsilon.
    Touching,
    /// No interaction.
    Missing,
}

/// Classification of a point against a closed solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointClass {
    Inside,
    Outside,
    OnBoundary,
}

/// Plane through three points; `None` if they are collinear under epsilon.
pub fn triangle_plane(
    tri: &[Point3<f64>; 3],
    epsilon: f64,
) -> Option<(Vector3<f64>, f64)> {
    let normal = (tri[1] - tri[0]).cross(&(tri[2] - tri[0]));
    let len = normal.norm();
    if len < epsilon * epsilon {
        return None;
    }
    let normal = normal / len;
    Some((normal, normal.dot(&tri[0].coords)))
}

pub fn classify_point_plane(
    point: &Point3<f64>,
    normal: &Vector3<f64>,
    d: f64,
    epsilon: f64,
) -> PlaneSide {
    let dist = normal.dot(&point.coords) - d;
    if dist > epsilon {
        PlaneSide::Front
    } else if dist < -epsilon {
        PlaneSide::Back
    } else {
        PlaneSide::On
    }
}

/// Parameter and point where segment p0..p1 crosses the plane, or `None`
/// when both endpoints sit on the same side (including both on-plane, the
/// parallel case the caller must treat as touching).
pub fn edge_plane_crossing(
    p0: &Point3<f64>,
    p1: &Point3<f64>,
    normal: &Vector3<f64>,
    d: f64,
    epsilon: f64,
) -> Option<(f64, Point3<f64>)> {
    let d0 = normal.dot(&p0.coords) - d;
    let d1 = normal.dot(&p1.coords) - d;

    let s0 = if d0 > epsilon {
        1
    } else if d0 < -epsilon {
        -1
    } else {
        0
    };
    let s1 = if d1 > epsilon {
        1
    } else if d1 < -epsilon {
        -1
    } else {
        0
    };

    if s0 == s1 {
        return None;
    }

    let t = if s0 == 0 {
        0.0
    } else if s1 == 0 {
        1.0
    } else {
        (d0 / (d0 - d1)).clamp(0.0, 1.0)
    };
    Some((t, p0 + (p1 - p0) * t))
}

/// Dominant projection axis for a plane normal: the coordinate to drop when
/// flattening to 2D.
pub fn dominant_axis(normal: &Vector3<f64>) -> usize {
    let abs = normal.map(|x| x.abs());
    if abs.x > abs.y && abs.x > abs.z {
        0
    } else if abs.y > abs.z {
        1
    } else {
        2
    }
}

/// Project a point to 2D by dropping the given axis.
pub fn project_2d(point: &Point3<f64>, axis: usize) -> (f64, f64) {
    match axis {
        0 => (point.y, point.z),
        1 => (point.x, point.z),
        _ => (point.x, point.y),
    }
}

/// Barycentric point-in-triangle test in the dominant-axis projection.
pub fn point_in_triangle(
    point: &Point3<f64>,
    tri: &[Point3<f64>; 3],
    normal: &Vector3<f64>,
    epsilon: f64,
) -> bool {
    let axis = dominant_axis(normal);
    let (px, py) = project_2d(point, axis);
    let (v0x, v0y) = project_2d(&tri[0], axis);
    let (v1x, v1y) = project_2d(&tri[1], axis);
    let (v2x, v2y) = project_2d(&tri[2], axis);

    let denom = (v1y - v2y) * (v0x - v2x) + (v2x - v1x) * (v0y - v2y);
    if denom.abs() < epsilon * epsilon {
        return false;
    }

    let a = ((v1y - v2y) * (px - v2x) + (v2x - v1x) * (py - v2y)) / denom;
    let b = ((v2y - v0y) * (px - v2x) + (v0x - v2x) * (py - v2y)) / denom;
    let c = 1.0 - a - b;

    a >= -epsilon && b >= -epsilon && c >= -epsilon
}

/// Result of intersecting an edge against a triangle.
#[derive(Debug, Clone, Copy)]
pub struct EdgeTriHit {
    pub class: EdgeClass,
    /// Crossing point when `class == Crossing`.
    pub point: Option<Point3<f64>>,
}

/// Intersect an edge against a triangle's plane and interior, using the
/// precision epsilon for on-plane and parallel decisions.
pub fn intersect_edge_triangle(
    p0: &Point3<f64>,
    p1: &Point3<f64>,
    tri: &[Point3<f64>; 3],
    epsilon: f64,
) -> EdgeTriHit {
    let miss = EdgeTriHit {
        class: EdgeClass::Missing,
        point: None,
    };

    let Some((normal, d)) = triangle_plane(tri, epsilon) else {
        return miss; // degenerate face cannot be crossed
    };

    let side0 = classify_point_plane(p0, &normal, d, epsilon);
    let side1 = classify_point_plane(p1, &normal, d, epsilon);

    // Parallel/coincident edge, or an endpoint resting on the face.
    if side0 == PlaneSide::On || side1 == PlaneSide::On {
        let touching = (side0 == PlaneSide::On && point_in_triangle(p0, tri, &normal, epsilon))
            || (side1 == PlaneSide::On && point_in_triangle(p1, tri, &normal, epsilon));
        return if touching {
            EdgeTriHit {
                class: EdgeClass::Touching,
                point: None,
            }
        } else {
            miss
        };
    }

    if side0 == side1 {
        return miss;
    }

    let Some((_, point)) = edge_plane_crossing(p0, p1, &normal, d, epsilon) else {
        return miss;
    };

    if point_in_triangle(&point, tri, &normal, epsilon) {
        EdgeTriHit {
            class: EdgeClass::Crossing,
            point: Some(point),
        }
    } else {
        miss
    }
}

/// Fixed skewed ray direction for crossing tallies. Not axis-aligned, so it
/// cannot graze the axis-aligned edges common in CAD input.
pub fn tally_ray_direction() -> Vector3<f64> {
    Vector3::new(0.840_170_3, 0.423_541_7, 0.338_812_9).normalize()
}

/// Möller–Trumbore ray-triangle hit test, forward hits only.
pub fn ray_hits_triangle(
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    tri: &[Point3<f64>; 3],
    epsilon: f64,
) -> bool {
    let edge1 = tri[1] - tri[0];
    let edge2 = tri[2] - tri[0];
    let h = direction.cross(&edge2);
    let a = edge1.dot(&h);

    if a.abs() < epsilon * epsilon {
        return false; // parallel
    }

    let f = 1.0 / a;
    let s = origin - tri[0];
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return false;
    }

    let q = s.cross(&edge1);
    let v = f * direction.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return false;
    }

    f * edge2.dot(&q) > epsilon
}

/// Squared distance from a point to a triangle, for boundary detection.
pub fn point_triangle_distance_sq(point: &Point3<f64>, tri: &[Point3<f64>; 3]) -> f64 {
    // Project onto the plane, then clamp into the triangle via edge checks.
    let normal = (tri[1] - tri[0]).cross(&(tri[2] - tri[0]));
    let len_sq = normal.norm_squared();
    if len_sq < f64::MIN_POSITIVE {
        // Degenerate: fall back to the nearest vertex.
        return tri
            .iter()
            .map(|v| (point - v).norm_squared())
            .fold(f64::INFINITY, f64::min);
    }
    let normal = normal / len_sq.sqrt();
    let plane_dist = normal.dot(&(point - tri[0]));
    let projected = point - normal * plane_dist;

    if point_in_triangle(&projected, tri, &normal, 1e-12) {
        return plane_dist * plane_dist;
    }

    // Nearest point on each edge segment.
    let mut best = f64::INFINITY;
    for i in 0..3 {
        let a = tri[i];
        let b = tri[(i + 1) % 3];
        let ab = b - a;
        let t = ((point - a).dot(&ab) / ab.norm_squared()).clamp(0.0, 1.0);
        let closest = a + ab * t;
        best = best.min((point - closest).norm_squared());
    }
    best
}

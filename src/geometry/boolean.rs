// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Watertight Contributors

//! Boolean reconstruction
//!
//! Union, Intersection, and Difference over two closed solids. The pipeline:
//! collider queries narrow face pairs, each surviving pair contributes its
//! cut chords (one transversal segment computed once and attributed to both
//! faces, plus the other triangle's in-plane edges for coplanar contact),
//! faces are split along their chords in a dominant-axis 2D projection, cut
//! points on shared original edges are propagated into both incident faces,
//! fragments are classified by a crossing tally from their centroid, and the
//! kept fragments are welded and re-validated into the result. Computing each
//! seam segment a single time, clipping it to the mutual span of its face
//! pair, and synchronizing edge splits is what keeps every cut coordinate
//! matched across the seam, so welding closes it without T-junctions.

use super::bbox::Aabb;
use super::halfedge::prev_halfedge;
use super::mesh::{Mesh, Triangle, Vertex};
use super::predicates::{
    classify_point_plane, dominant_axis, edge_plane_crossing, point_triangle_distance_sq,
    project_2d, ray_hits_triangle, tally_ray_direction, triangle_plane, PlaneSide, PointClass,
};
use super::solid::{Solid, TriRelation};
use super::sparse::{CandidatePairs, INVALID_INDEX};
use crate::error::{DegeneracyWarning, GeometryError};
use crate::params::ExecutionParams;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// The three supported set operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Union,
    Intersection,
    Difference,
}

impl Solid {
    /// Apply a Boolean operation against another solid, producing a new
    /// validated solid. Inputs are not modified.
    pub fn boolean(&self, other: &Solid, op: BooleanOp) -> Result<Solid, GeometryError> {
        boolean(self, other, op, self.params())
    }
}

/// Full Boolean pipeline over two closed solids.
pub fn boolean(
    a: &Solid,
    b: &Solid,
    op: BooleanOp,
    params: ExecutionParams,
) -> Result<Solid, GeometryError> {
    if a.is_empty() || b.is_empty() {
        return match op {
            BooleanOp::Union => Ok(if a.is_empty() { b.clone() } else { a.clone() }),
            BooleanOp::Intersection => empty_solid(params),
            BooleanOp::Difference => {
                if a.is_empty() {
                    empty_solid(params)
                } else {
                    Ok(a.clone())
                }
            }
        };
    }

    let tolerance = a.precision().max(b.precision());
    let face_pairs = candidate_face_pairs(a, b, tolerance, &params);

    // Cut chords per surviving face pair. The transversal segment is
    // computed once and attributed to both faces, which is what keeps the
    // two sides' seam coordinates identical. The pair list is sorted, so
    // the result is deterministic regardless of how the queries were
    // scheduled.
    let cuts: Vec<PairCuts> = if params.parallel {
        face_pairs
            .par_iter()
            .filter_map(|&(fa, fb)| pair_cuts(a, b, fa, fb, tolerance))
            .collect()
    } else {
        face_pairs
            .iter()
            .filter_map(|&(fa, fb)| pair_cuts(a, b, fa, fb, tolerance))
            .collect()
    };

    let mut segs_a: HashMap<u32, Vec<Segment>> = HashMap::new();
    let mut segs_b: HashMap<u32, Vec<Segment>> = HashMap::new();
    for cut in cuts {
        if !cut.for_a.is_empty() {
            segs_a.entry(cut.fa).or_default().extend(cut.for_a);
        }
        if !cut.for_b.is_empty() {
            segs_b.entry(cut.fb).or_default().extend(cut.for_b);
        }
    }

    let frags_a = split_side(a, &segs_a, tolerance);
    let frags_b = split_side(b, &segs_b, tolerance);

    let vert_class_a = classify_vertices(a, b, tolerance, &params);
    let vert_class_b = classify_vertices(b, a, tolerance, &params);

    let mut out = FragmentSink::default();
    collect_side(a, b, &frags_a, &vert_class_a, op, Side::Left, tolerance, &mut out);
    collect_side(b, a, &frags_b, &vert_class_b, op, Side::Right, tolerance, &mut out);

    assemble(out, tolerance, params)
}

fn empty_solid(params: ExecutionParams) -> Result<Solid, GeometryError> {
    Solid::from_triangles(Vec::new(), Vec::new(), Vec::new(), None, params)
}

type Segment = (Point3<f64>, Point3<f64>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

fn face_points(solid: &Solid, face: u32) -> [Point3<f64>; 3] {
    let base = face as usize * 3;
    [
        solid.positions()[solid.halfedges[base].start_vert as usize],
        solid.positions()[solid.halfedges[base + 1].start_vert as usize],
        solid.positions()[solid.halfedges[base + 2].start_vert as usize],
    ]
}

fn face_centroids(solid: &Solid) -> Vec<Point3<f64>> {
    (0..solid.triangle_count() as u32)
        .map(|face| {
            let tri = face_points(solid, face);
            Point3::from((tri[0].coords + tri[1].coords + tri[2].coords) / 3.0)
        })
        .collect()
}

/// Narrow-phase input: candidate (a_face, b_face) pairs from querying each
/// mesh's edge boxes against the other's face-box hierarchy. Both directions
/// run so no crossing can be missed, then the pair set is deduplicated.
fn candidate_face_pairs(
    a: &Solid,
    b: &Solid,
    tolerance: f64,
    params: &ExecutionParams,
) -> Vec<(u32, u32)> {
    let mut face_pairs = CandidatePairs::new();

    let (b_edges, b_boxes) = b.edge_boxes();
    let hits = a.collider.collisions(&b_boxes, tolerance, params);
    for (edge_query, a_face) in hits.iter() {
        let he = &b.halfedges[b_edges[edge_query as usize] as usize];
        face_pairs.add(a_face, he.face);
        if let Some(pair) = he.paired_halfedge {
            face_pairs.add(a_face, b.halfedges[pair as usize].face);
        }
    }

    let (a_edges, a_boxes) = a.edge_boxes();
    let hits = b.collider.collisions(&a_boxes, tolerance, params);
    for (edge_query, b_face) in hits.iter() {
        let he = &a.halfedges[a_edges[edge_query as usize] as usize];
        face_pairs.add(he.face, b_face);
        if let Some(pair) = he.paired_halfedge {
            face_pairs.add(a.halfedges[pair as usize].face, b_face);
        }
    }

    face_pairs.remove_invalid();
    face_pairs.keep_finite(&face_centroids(a), &face_centroids(b));
    face_pairs.unique();
    face_pairs.iter().collect()
}

/// Everything one candidate face pair cuts: the shared transversal segment
/// (attributed to both faces) plus coplanar edge chords (attributed to the
/// face whose plane contains the other's edge).
struct PairCuts {
    fa: u32,
    fb: u32,
    for_a: Vec<Segment>,
    for_b: Vec<Segment>,
}

fn pair_cuts(a: &Solid, b: &Solid, fa: u32, fb: u32, tolerance: f64) -> Option<PairCuts> {
    let ta = face_points(a, fa);
    let tb = face_points(b, fb);

    let mut for_a = coplanar_chords(&tb, &ta, tolerance);
    let mut for_b = coplanar_chords(&ta, &tb, tolerance);
    if let Some(seg) = pair_segment(&ta, &tb, tolerance) {
        for_a.push(seg);
        for_b.push(seg);
    }

    if for_a.is_empty() && for_b.is_empty() {
        None
    } else {
        Some(PairCuts { fa, fb, for_a, for_b })
    }
}

/// Edges of `source` lying entirely in `target`'s plane become cut chords
/// for the target face. This is how a face partially covered by coplanar
/// geometry gets split where that geometry ends; the splitter clips the
/// chord, so edges outside the face or along its own edges are no-ops.
fn coplanar_chords(
    source: &[Point3<f64>; 3],
    target: &[Point3<f64>; 3],
    epsilon: f64,
) -> Vec<Segment> {
    let Some((normal, d)) = triangle_plane(target, epsilon) else {
        return Vec::new();
    };
    let mut chords = Vec::new();
    for i in 0..3 {
        let p0 = source[i];
        let p1 = source[(i + 1) % 3];
        if classify_point_plane(&p0, &normal, d, epsilon) == PlaneSide::On
            && classify_point_plane(&p1, &normal, d, epsilon) == PlaneSide::On
            && (p1 - p0).norm() > epsilon
        {
            chords.push((p0, p1));
        }
    }
    chords
}

/// Intersection segment of two triangles, computed as the overlap of their
/// spans along the plane-intersection line. Each triangle's span comes from
/// its edges crossing the other plane; the overlap is the mutual part, so
/// the chord never extends past either triangle and the subdivision points
/// both meshes produce along a shared seam line agree. Coplanar pairs yield
/// no line and no segment; the chord pass and the classification tie-break
/// handle them.
fn pair_segment(
    ta: &[Point3<f64>; 3],
    tb: &[Point3<f64>; 3],
    epsilon: f64,
) -> Option<Segment> {
    let (na, da) = triangle_plane(ta, epsilon)?;
    let (nb, db) = triangle_plane(tb, epsilon)?;

    let line = na.cross(&nb);
    if line.norm() < epsilon {
        return None; // parallel or coplanar
    }
    let line = line.normalize();

    let span_a = triangle_line_span(ta, &nb, db, &line, epsilon)?;
    let span_b = triangle_line_span(tb, &na, da, &line, epsilon)?;

    let lo = if span_a.0 .0 >= span_b.0 .0 { span_a.0 } else { span_b.0 };
    let hi = if span_a.1 .0 <= span_b.1 .0 { span_a.1 } else { span_b.1 };
    if hi.0 - lo.0 < epsilon {
        return None; // disjoint along the line, or a corner graze
    }
    Some((lo.1, hi.1))
}

/// Span of a triangle along its intersection line with another plane: the
/// crossing points of the triangle's edges against that plane, parameterized
/// along the line direction. `None` when the triangle only touches the plane
/// at a vertex.
fn triangle_line_span(
    tri: &[Point3<f64>; 3],
    normal: &Vector3<f64>,
    d: f64,
    line: &Vector3<f64>,
    epsilon: f64,
) -> Option<((f64, Point3<f64>), (f64, Point3<f64>))> {
    let mut hits: Vec<(f64, Point3<f64>)> = Vec::with_capacity(2);
    for i in 0..3 {
        if let Some((_, point)) =
            edge_plane_crossing(&tri[i], &tri[(i + 1) % 3], normal, d, epsilon)
        {
            let t = line.dot(&point.coords);
            if !hits.iter().any(|&(seen, _)| (seen - t).abs() < epsilon) {
                hits.push((t, point));
            }
        }
    }
    if hits.len() < 2 {
        return None;
    }
    hits.sort_by(|x, y| x.0.total_cmp(&y.0));
    Some((hits[0], hits[hits.len() - 1]))
}

/// Where a chord endpoint sits on a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Loc {
    Vertex(usize),
    Edge(usize),
    Interior,
}

fn point_segment_distance_sq(point: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < f64::MIN_POSITIVE {
        return (point - a).norm_squared();
    }
    let t = ((point - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (point - (a + ab * t)).norm_squared()
}

fn locate(point: &Point3<f64>, frag: &[Point3<f64>; 3], epsilon: f64) -> Loc {
    for i in 0..3 {
        if (point - frag[i]).norm() < epsilon {
            return Loc::Vertex(i);
        }
    }
    for i in 0..3 {
        if point_segment_distance_sq(point, &frag[i], &frag[(i + 1) % 3]) < epsilon * epsilon {
            return Loc::Edge(i);
        }
    }
    Loc::Interior
}

fn push_tri(out: &mut Vec<[Point3<f64>; 3]>, tri: [Point3<f64>; 3], epsilon: f64) {
    // Sub-triangles whose corners weld together contribute nothing.
    if (tri[0] - tri[1]).norm() < epsilon
        || (tri[1] - tri[2]).norm() < epsilon
        || (tri[0] - tri[2]).norm() < epsilon
    {
        return;
    }
    out.push(tri);
}

const MAX_SPLIT_DEPTH: u32 = 8;

/// Split one fragment along the chord where segment p..q crosses it. The
/// work happens in the face's dominant-axis projection; output triangles
/// keep the fragment's winding. Endpoints landing in the interior insert a
/// fan vertex first and re-dispatch, so every cut terminates on fragment
/// boundaries and adjacent fragments receive bitwise-matching cut points.
fn split_fragment(
    frag: [Point3<f64>; 3],
    p: &Point3<f64>,
    q: &Point3<f64>,
    axis: usize,
    epsilon: f64,
    depth: u32,
    out: &mut Vec<[Point3<f64>; 3]>,
) {
    let v2: [(f64, f64); 3] = [
        project_2d(&frag[0], axis),
        project_2d(&frag[1], axis),
        project_2d(&frag[2], axis),
    ];
    let p2 = project_2d(p, axis);
    let q2 = project_2d(q, axis);

    let area2 = (v2[1].0 - v2[0].0) * (v2[2].1 - v2[0].1)
        - (v2[1].1 - v2[0].1) * (v2[2].0 - v2[0].0);
    if area2.abs() < epsilon * epsilon {
        out.push(frag);
        return;
    }
    let orient = area2.signum();

    // Clip the segment's parameter interval against the three edge
    // half-planes. Distances within the epsilon band count as on-edge so a
    // chord running along an edge never cuts.
    let mut tmin = 0.0f64;
    let mut tmax = 1.0f64;
    for i in 0..3 {
        let a = v2[i];
        let b = v2[(i + 1) % 3];
        let ex = b.0 - a.0;
        let ey = b.1 - a.1;
        let band = epsilon * (ex * ex + ey * ey).sqrt();

        let dp = (ex * (p2.1 - a.1) - ey * (p2.0 - a.0)) * orient;
        let dq = (ex * (q2.1 - a.1) - ey * (q2.0 - a.0)) * orient;
        if dp.abs() <= band && dq.abs() <= band {
            out.push(frag); // collinear with this edge
            return;
        }
        let dp_eff = if dp.abs() <= band { 0.0 } else { dp };
        let dq_eff = if dq.abs() <= band { 0.0 } else { dq };
        if dp_eff < 0.0 && dq_eff < 0.0 {
            out.push(frag); // entirely outside this edge
            return;
        }
        if dp_eff < 0.0 {
            tmin = tmin.max(dp_eff / (dp_eff - dq_eff));
        } else if dq_eff < 0.0 {
            tmax = tmax.min(dp_eff / (dp_eff - dq_eff));
        }
    }
    if tmin >= tmax - 1e-12 {
        out.push(frag);
        return;
    }

    let a3 = p + (q - p) * tmin;
    let b3 = p + (q - p) * tmax;
    if (b3 - a3).norm() < epsilon {
        out.push(frag);
        return;
    }

    let loc_a = locate(&a3, &frag, epsilon);
    let loc_b = locate(&b3, &frag, epsilon);

    // Interior endpoint: fan the fragment at that point, then re-dispatch
    // the same segment into the sub-fragments where it now ends on a vertex.
    if loc_a == Loc::Interior || loc_b == Loc::Interior {
        if depth >= MAX_SPLIT_DEPTH {
            out.push(frag);
            return;
        }
        let x = if loc_a == Loc::Interior { a3 } else { b3 };
        let mut fan = Vec::with_capacity(3);
        push_tri(&mut fan, [frag[0], frag[1], x], epsilon);
        push_tri(&mut fan, [frag[1], frag[2], x], epsilon);
        push_tri(&mut fan, [frag[2], frag[0], x], epsilon);
        for sub in fan {
            split_fragment(sub, p, q, axis, epsilon, depth + 1, out);
        }
        return;
    }

    match (loc_a, loc_b) {
        (Loc::Vertex(_), Loc::Vertex(_)) => {
            out.push(frag); // chord coincides with an existing edge
        }
        (Loc::Vertex(i), Loc::Edge(k)) | (Loc::Edge(k), Loc::Vertex(i)) => {
            if k == i || k == (i + 2) % 3 {
                out.push(frag); // chord runs along an incident edge
                return;
            }
            let m = if matches!(loc_a, Loc::Vertex(_)) { b3 } else { a3 };
            push_tri(out, [frag[i], frag[(i + 1) % 3], m], epsilon);
            push_tri(out, [frag[i], m, frag[(i + 2) % 3]], epsilon);
        }
        (Loc::Edge(j), Loc::Edge(k)) => {
            if j == k {
                out.push(frag); // both endpoints on the same edge
                return;
            }
            // Normalize so the chord runs from edge j to its successor.
            let (j, m, k, n) = if (j + 1) % 3 == k {
                (j, a3, k, b3)
            } else {
                (k, b3, j, a3)
            };
            let corner = frag[k]; // vertex shared by the two cut edges
            push_tri(out, [m, corner, n], epsilon);
            push_tri(out, [frag[j], m, n], epsilon);
            push_tri(out, [frag[j], n, frag[(j + 2) % 3]], epsilon);
        }
        _ => out.push(frag),
    }
}

/// Split a face along all of its segments, one chord at a time.
fn split_face(
    tri: [Point3<f64>; 3],
    segments: &[Segment],
    epsilon: f64,
) -> Vec<[Point3<f64>; 3]> {
    let normal = (tri[1] - tri[0]).cross(&(tri[2] - tri[0]));
    let axis = dominant_axis(&normal);

    let mut fragments = vec![tri];
    for (p, q) in segments {
        let mut next = Vec::with_capacity(fragments.len() + 2);
        for frag in fragments {
            split_fragment(frag, p, q, axis, epsilon, 0, &mut next);
        }
        fragments = next;
    }
    fragments
}

type Fragments = HashMap<u32, Vec<[Point3<f64>; 3]>>;

/// Split every chorded face, then make the edge splits topological: any cut
/// point landing strictly inside an original edge must appear in both
/// incident faces, or pairing would leave the seam open after welding. The
/// neighbor gets a chord from the point to its opposite vertex and is
/// re-split; such chords end on existing vertices, so one pass suffices.
fn split_side(
    solid: &Solid,
    segs: &HashMap<u32, Vec<Segment>>,
    tolerance: f64,
) -> Fragments {
    let mut fragments: Fragments = HashMap::with_capacity(segs.len());
    let mut faces: Vec<u32> = segs.keys().copied().collect();
    faces.sort_unstable();
    for &face in &faces {
        fragments.insert(
            face,
            split_face(face_points(solid, face), &segs[&face], tolerance),
        );
    }

    // Cut points strictly inside an original edge, keyed by undirected edge.
    let mut edge_points: BTreeMap<(u32, u32), Vec<Point3<f64>>> = BTreeMap::new();
    for &face in &faces {
        let base = face as usize * 3;
        for frag in &fragments[&face] {
            for v in frag {
                for he in &solid.halfedges[base..base + 3] {
                    let a = solid.positions()[he.start_vert as usize];
                    let b = solid.positions()[he.end_vert as usize];
                    if (v - a).norm() < tolerance || (v - b).norm() < tolerance {
                        continue;
                    }
                    if point_segment_distance_sq(v, &a, &b) < tolerance * tolerance {
                        let bucket = edge_points.entry(he.key()).or_default();
                        if !bucket.iter().any(|p| (p - v).norm() < tolerance) {
                            bucket.push(*v);
                        }
                    }
                }
            }
        }
    }
    if edge_points.is_empty() {
        return fragments;
    }

    let mut forward_of: HashMap<(u32, u32), u32> = HashMap::new();
    for (index, he) in solid.halfedges.iter().enumerate() {
        if he.is_forward() {
            forward_of.insert(he.key(), index as u32);
        }
    }

    let mut inserts: BTreeMap<u32, Vec<Segment>> = BTreeMap::new();
    for (key, points) in &edge_points {
        let Some(&forward) = forward_of.get(key) else {
            continue;
        };
        let mut incident = vec![forward];
        if let Some(pair) = solid.halfedges[forward as usize].paired_halfedge {
            incident.push(pair);
        }
        for he_index in incident {
            let face = solid.halfedges[he_index as usize].face;
            let opposite = solid.positions()
                [solid.halfedges[prev_halfedge(he_index) as usize].start_vert as usize];
            for point in points {
                let covered = fragments.get(&face).is_some_and(|frags| {
                    frags
                        .iter()
                        .any(|f| f.iter().any(|v| (v - point).norm() < tolerance))
                });
                if !covered {
                    inserts.entry(face).or_default().push((*point, opposite));
                }
            }
        }
    }

    // Re-split the faces that were missing cuts, original chords first so
    // the replay reproduces the pass above before the insertions apply.
    for (face, extra) in inserts {
        let mut chords = segs.get(&face).cloned().unwrap_or_default();
        chords.extend(extra);
        fragments.insert(
            face,
            split_face(face_points(solid, face), &chords, tolerance),
        );
    }
    fragments
}

/// Classify a point against a closed solid. Boundary proximity is checked
/// first through the collider, then a crossing tally decides inside or
/// outside. Returns the nearest face when on the boundary.
fn classify_point(point: &Point3<f64>, solid: &Solid, epsilon: f64) -> (PointClass, u32) {
    if solid.is_empty() {
        return (PointClass::Outside, INVALID_INDEX);
    }

    let sequential = ExecutionParams::sequential();
    let probe = Aabb::new(
        Point3::new(point.x - epsilon, point.y - epsilon, point.z - epsilon),
        Point3::new(point.x + epsilon, point.y + epsilon, point.z + epsilon),
    );
    let nearby = solid.collider.collisions(&[probe], epsilon, &sequential);
    let mut nearest = INVALID_INDEX;
    let mut nearest_d2 = epsilon * epsilon;
    for (_, face) in nearby.iter() {
        let tri = face_points(solid, face);
        let d2 = point_triangle_distance_sq(point, &tri);
        if d2 < nearest_d2 {
            nearest_d2 = d2;
            nearest = face;
        }
    }
    if nearest != INVALID_INDEX {
        return (PointClass::OnBoundary, nearest);
    }

    let direction = tally_ray_direction();
    let bbox = solid.bounding_box();
    let reach = bbox.size().norm() + (point - bbox.center()).norm() + 1.0;
    let far = point + direction * (reach * 2.0);
    let ray_box = Aabb::from_points(&[*point, far]);
    let candidates = solid.collider.collisions(&[ray_box], epsilon, &sequential);

    let mut crossings = 0usize;
    for (_, face) in candidates.iter() {
        let tri = face_points(solid, face);
        if ray_hits_triangle(point, &direction, &tri, epsilon) {
            crossings += 1;
        }
    }
    if crossings % 2 == 1 {
        (PointClass::Inside, INVALID_INDEX)
    } else {
        (PointClass::Outside, INVALID_INDEX)
    }
}

/// Classify every vertex of one solid against the other, a data-parallel
/// read-only pass.
fn classify_vertices(
    solid: &Solid,
    other: &Solid,
    epsilon: f64,
    params: &ExecutionParams,
) -> Vec<PointClass> {
    let compute = |p: &Point3<f64>| classify_point(p, other, epsilon).0;
    if params.parallel {
        solid.positions().par_iter().map(compute).collect()
    } else {
        solid.positions().iter().map(compute).collect()
    }
}

/// Which fragments survive, per side and operation. `same_facing` only
/// matters on the boundary: the left copy of coincident surface wins, and
/// Difference wants the opposite-facing coincidence instead.
fn keep_fragment(op: BooleanOp, side: Side, class: PointClass, same_facing: bool) -> bool {
    use BooleanOp::*;
    use PointClass::*;
    match (side, op) {
        (Side::Left, Union) => class == Outside || (class == OnBoundary && same_facing),
        (Side::Left, Intersection) => class == Inside || (class == OnBoundary && same_facing),
        (Side::Left, Difference) => class == Outside || (class == OnBoundary && !same_facing),
        (Side::Right, Union) => class == Outside,
        (Side::Right, Intersection) => class == Inside,
        (Side::Right, Difference) => class == Inside,
    }
}

#[derive(Default)]
struct FragmentSink {
    positions: Vec<Point3<f64>>,
    triangles: Vec<[u32; 3]>,
    relations: Vec<TriRelation>,
    warnings: Vec<DegeneracyWarning>,
}

impl FragmentSink {
    fn emit(&mut self, frag: [Point3<f64>; 3], flip: bool, relation: TriRelation) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&frag);
        if flip {
            self.triangles.push([base, base + 2, base + 1]);
        } else {
            self.triangles.push([base, base + 1, base + 2]);
        }
        self.relations.push(relation);
    }
}

#[allow(clippy::too_many_arguments)]
fn collect_side(
    solid: &Solid,
    other: &Solid,
    frags: &Fragments,
    vert_class: &[PointClass],
    op: BooleanOp,
    side: Side,
    tolerance: f64,
    out: &mut FragmentSink,
) {
    let mesh_id = match side {
        Side::Left => 0,
        Side::Right => 1,
    };
    let flip = side == Side::Right && op == BooleanOp::Difference;
    let triangles = solid.triangles();

    for (face, tri) in triangles.iter().enumerate() {
        let pts = face_points(solid, face as u32);
        let relation = TriRelation {
            mesh_id,
            original_face: solid.relations()[face].original_face,
        };

        let fragments = match frags.get(&(face as u32)) {
            Some(list) => list.clone(),
            None => {
                // Uncut face: any strictly inside/outside vertex decides the
                // whole face without another ray tally.
                let decisive = tri
                    .iter()
                    .map(|&v| vert_class[v as usize])
                    .find(|c| *c != PointClass::OnBoundary);
                if let Some(class) = decisive {
                    if keep_fragment(op, side, class, true) {
                        out.emit(pts, flip, relation);
                    }
                    continue;
                }
                vec![pts]
            }
        };

        for frag in fragments {
            let centroid =
                Point3::from((frag[0].coords + frag[1].coords + frag[2].coords) / 3.0);
            let (class, nearest) = classify_point(&centroid, other, tolerance);
            let same_facing = if class == PointClass::OnBoundary && nearest != INVALID_INDEX {
                let normal = (frag[1] - frag[0]).cross(&(frag[2] - frag[0]));
                normal.dot(&other.face_normals[nearest as usize]) > 0.0
            } else {
                true
            };
            if class == PointClass::OnBoundary {
                out.warnings.push(DegeneracyWarning::CoplanarTieBreak { face });
            }
            if keep_fragment(op, side, class, same_facing) {
                out.emit(frag, flip, relation);
            }
        }
    }
}

/// Weld the kept fragments into a single indexed mesh and run it through
/// construction, which re-pairs edges and validates manifoldness.
fn assemble(
    sink: FragmentSink,
    tolerance: f64,
    params: ExecutionParams,
) -> Result<Solid, GeometryError> {
    let mut mesh = Mesh::with_capacity(sink.positions.len(), sink.triangles.len());
    for position in &sink.positions {
        mesh.add_vertex(Vertex::new(*position, Vector3::zeros()));
    }
    for tri in &sink.triangles {
        mesh.add_triangle(Triangle::new([
            tri[0] as usize,
            tri[1] as usize,
            tri[2] as usize,
        ]));
    }
    mesh.weld_vertices(tolerance);

    let positions: Vec<Point3<f64>> = mesh.vertices.iter().map(|v| v.position).collect();
    let triangles: Vec<[u32; 3]> = mesh
        .triangles
        .iter()
        .map(|t| [t.indices[0] as u32, t.indices[1] as u32, t.indices[2] as u32])
        .collect();

    let mut solid =
        Solid::from_triangles(positions, triangles, sink.relations, Some(tolerance), params)?;
    for warning in sink.warnings {
        solid.record_warning(warning);
    }
    Ok(solid)
}

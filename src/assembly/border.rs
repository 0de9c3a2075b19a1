use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use crate::error::{AssemblyError, Result};
use crate::geometry::{End, Frame};
use crate::math::distance_2d::project_on_segment;
use crate::math::intersect_2d::line_segment_intersect_2d;
use crate::math::polygon_2d::signed_area_2d;
use crate::math::{distance_sq, Point2, Rect, TOLERANCE};

use super::fragments::{FragmentId, FragmentSet};
use super::pairing::Site;

/// A position along a boundary: an edge index and the parameter along it.
///
/// Positions order by edge first, then parameter, which is the traversal
/// order of the boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryPosition {
    pub edge: usize,
    /// Parameter along the edge, in `[0, 1)`.
    pub t: f64,
}

impl BoundaryPosition {
    #[must_use]
    pub fn new(edge: usize, t: f64) -> Self {
        Self { edge, t }
    }

    /// Compares two positions in traversal order.
    #[must_use]
    pub fn cmp_along(&self, other: &Self) -> Ordering {
        self.edge.cmp(&other.edge).then(self.t.total_cmp(&other.t))
    }

    /// Moves a position sitting on the end of an edge to the start of the
    /// next one, so each boundary point has a single position.
    fn normalized(edge: usize, t: f64, edge_count: usize) -> Self {
        if t >= 1.0 - TOLERANCE && edge_count > 0 {
            Self::new((edge + 1) % edge_count, 0.0)
        } else {
            Self::new(edge, t.max(0.0))
        }
    }
}

/// Nearest boundary point to some query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryProjection {
    pub position: BoundaryPosition,
    pub point: Point2,
    pub distance: f64,
}

/// A closed clip path in the target frame.
///
/// Edge `i` runs from vertex `i` to vertex `i + 1`, the last edge closing
/// back to vertex 0. Implementors only supply the vertices.
pub trait Boundary: fmt::Debug + Send + Sync {
    /// Vertices in traversal order, without a repeated closing vertex.
    fn vertices(&self) -> &[Point2];

    fn edge_count(&self) -> usize {
        self.vertices().len()
    }

    fn edge(&self, index: usize) -> Option<(Point2, Point2)> {
        let v = self.vertices();
        let a = *v.get(index)?;
        let b = *v.get((index + 1) % v.len())?;
        Some((a, b))
    }

    fn point_at(&self, position: BoundaryPosition) -> Option<Point2> {
        let (a, b) = self.edge(position.edge)?;
        Some(a + (b - a) * position.t)
    }

    /// Projects `p` onto the nearest edge. Ties go to the lower edge index.
    fn project(&self, p: &Point2) -> Option<BoundaryProjection> {
        let n = self.edge_count();
        let mut best: Option<BoundaryProjection> = None;
        for i in 0..n {
            let Some((a, b)) = self.edge(i) else { continue };
            let proj = project_on_segment(p, &a, &b);
            let distance = proj.distance_sq.sqrt();
            if best.is_none_or(|so_far| distance < so_far.distance) {
                best = Some(BoundaryProjection {
                    position: BoundaryPosition::normalized(i, proj.t, n),
                    point: proj.point,
                    distance,
                });
            }
        }
        best
    }

    /// Every point where the infinite line through `from → to` meets an edge.
    fn intersect_line(&self, from: &Point2, to: &Point2) -> Vec<(BoundaryPosition, Point2)> {
        let n = self.edge_count();
        (0..n)
            .filter_map(|i| {
                let (a, b) = self.edge(i)?;
                let (point, _, u) = line_segment_intersect_2d(from, to, &a, &b)?;
                Some((BoundaryPosition::normalized(i, u, n), point))
            })
            .collect()
    }

    /// Walks the boundary forward from `from` to `to`, returning both end
    /// points and every vertex passed on the way.
    ///
    /// When `to` lies before `from` the walk wraps around past vertex 0.
    fn trace(&self, from: BoundaryPosition, to: BoundaryPosition) -> Vec<Point2> {
        let n = self.edge_count();
        let (Some(start), Some(end)) = (self.point_at(from), self.point_at(to)) else {
            return Vec::new();
        };
        let vertices = self.vertices();

        let mut out = vec![start];
        let same_edge_forward = from.edge == to.edge && to.t >= from.t;
        if !same_edge_forward {
            let mut e = from.edge;
            loop {
                e = (e + 1) % n;
                out.push(vertices[e]);
                if e == to.edge {
                    break;
                }
            }
        }
        out.push(end);
        out.dedup_by(|b, a| distance_sq(a, b) <= TOLERANCE * TOLERANCE);
        out
    }
}

/// A polygonal clip boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipBoundary {
    vertices: Vec<Point2>,
}

impl ClipBoundary {
    /// Boundary of a map window, walked counter-clockwise from its minimum
    /// corner.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::DegenerateBoundary`] if the rectangle has no
    /// area.
    pub fn from_rect(rect: &Rect) -> std::result::Result<Self, AssemblyError> {
        if rect.width() <= TOLERANCE || rect.height() <= TOLERANCE {
            return Err(AssemblyError::DegenerateBoundary(format!(
                "window {} x {} has no area",
                rect.width(),
                rect.height()
            )));
        }
        Ok(Self {
            vertices: rect.corners().to_vec(),
        })
    }

    /// Boundary following an arbitrary ring. A repeated closing vertex and
    /// consecutive duplicates are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::DegenerateBoundary`] if fewer than three
    /// distinct vertices remain or the ring has no area.
    pub fn from_ring(points: &[Point2]) -> std::result::Result<Self, AssemblyError> {
        let mut vertices = points.to_vec();
        vertices.dedup_by(|b, a| distance_sq(a, b) <= TOLERANCE * TOLERANCE);
        if let (Some(first), Some(last)) = (vertices.first(), vertices.last()) {
            if vertices.len() > 1 && distance_sq(first, last) <= TOLERANCE * TOLERANCE {
                vertices.pop();
            }
        }
        if vertices.len() < 3 {
            return Err(AssemblyError::DegenerateBoundary(format!(
                "ring has {} distinct vertices",
                vertices.len()
            )));
        }
        if signed_area_2d(&vertices).abs() <= TOLERANCE {
            return Err(AssemblyError::DegenerateBoundary("ring has no area".into()));
        }
        Ok(Self { vertices })
    }
}

impl Boundary for ClipBoundary {
    fn vertices(&self) -> &[Point2] {
        &self.vertices
    }
}

/// A fragment end found on the boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionPoint {
    pub fragment: FragmentId,
    pub end: End,
    pub position: BoundaryPosition,
    /// Where the fragment meets the boundary, in the target frame.
    pub point: Point2,
    /// Distance from the fragment's end point to the boundary.
    pub distance: f64,
}

impl IntersectionPoint {
    fn site(&self) -> Site {
        Site::new(self.fragment, self.end)
    }
}

/// Locates the reference point of a border level on the boundary.
///
/// # Errors
///
/// Returns [`AssemblyError::ReferenceTooFar`] if the point is farther than
/// `limit` from the boundary, or [`AssemblyError::DegenerateBoundary`] if
/// the boundary has no edges.
pub(crate) fn locate_reference(
    boundary: &dyn Boundary,
    reference: &Point2,
    limit: f64,
) -> std::result::Result<BoundaryPosition, AssemblyError> {
    let proj = boundary
        .project(reference)
        .ok_or_else(|| AssemblyError::DegenerateBoundary("boundary has no edges".into()))?;
    if proj.distance > limit {
        return Err(AssemblyError::ReferenceTooFar {
            distance: proj.distance,
            limit,
        });
    }
    Ok(proj.position)
}

/// Sites of open fragments whose end point lies on the boundary.
pub(crate) fn border_sites(
    fragments: &FragmentSet,
    boundary: &dyn Boundary,
    tolerance: f64,
) -> Result<HashSet<Site>> {
    Ok(collect_intersections(fragments, boundary, tolerance)?
        .iter()
        .map(IntersectionPoint::site)
        .collect())
}

/// Finds every open fragment end within `tolerance` of the boundary.
///
/// The recorded point is where the fragment's terminal segment, extended,
/// crosses the boundary; if that crossing is not within `tolerance` of the
/// end point, the end point's projection is used instead.
pub(crate) fn collect_intersections(
    fragments: &FragmentSet,
    boundary: &dyn Boundary,
    tolerance: f64,
) -> Result<Vec<IntersectionPoint>> {
    let mut found = Vec::new();
    for id in fragments.open_ids() {
        let Some(line) = fragments.get(id) else {
            continue;
        };
        let points = line.target_points()?;
        for end in [End::Start, End::End] {
            let Some((tip, inner)) = terminal(&points, end) else {
                continue;
            };
            let Some(proj) = boundary.project(&tip) else {
                continue;
            };
            if proj.distance > tolerance {
                continue;
            }
            let (position, point) = inner
                .and_then(|inner| refine(boundary, &inner, &tip, tolerance))
                .unwrap_or((proj.position, proj.point));
            found.push(IntersectionPoint {
                fragment: id,
                end,
                position,
                point,
                distance: proj.distance,
            });
        }
    }
    Ok(found)
}

/// End point at `end` and its neighbour, if any.
fn terminal(points: &[Point2], end: End) -> Option<(Point2, Option<Point2>)> {
    match end {
        End::Start => Some((*points.first()?, points.get(1).copied())),
        End::End => {
            let n = points.len();
            Some((*points.last()?, n.checked_sub(2).and_then(|i| points.get(i)).copied()))
        }
    }
}

fn refine(
    boundary: &dyn Boundary,
    inner: &Point2,
    tip: &Point2,
    tolerance: f64,
) -> Option<(BoundaryPosition, Point2)> {
    boundary
        .intersect_line(inner, tip)
        .into_iter()
        .map(|(pos, pt)| (pos, pt, distance_sq(&pt, tip)))
        .filter(|(_, _, d)| *d <= tolerance * tolerance)
        .min_by(|x, y| x.2.total_cmp(&y.2))
        .map(|(pos, pt, _)| (pos, pt))
}

/// Drops the intersection whose end point is farthest from the boundary.
fn discard_farthest(points: &mut Vec<IntersectionPoint>) {
    let Some((i, worst)) = points
        .iter()
        .enumerate()
        .max_by(|(_, x), (_, y)| x.distance.total_cmp(&y.distance))
    else {
        return;
    };
    tracing::warn!(
        fragment = ?worst.fragment,
        end = ?worst.end,
        distance = worst.distance,
        count = points.len(),
        "odd number of border intersections, discarding the farthest"
    );
    points.remove(i);
}

/// Sorts intersections in traversal order, starting just after `reference`.
/// With `inside` the sequence starts one intersection later, so that the
/// stretch containing the reference point is the one being completed.
fn order_from(points: &mut [IntersectionPoint], reference: BoundaryPosition, inside: bool) {
    points.sort_by(|a, b| a.position.cmp_along(&b.position));
    let start = points
        .iter()
        .position(|ip| ip.position.cmp_along(&reference) == Ordering::Greater)
        .unwrap_or(0);
    points.rotate_left(start);
    if inside && !points.is_empty() {
        points.rotate_left(1);
    }
}

/// Extends fragments cut by the boundary with traces along it.
///
/// Consecutive intersections, taken in traversal order from the reference
/// position, are paired; each pair is joined by the boundary stretch
/// between them, spliced onto the first fragment's end. Returns the number
/// of stretches added.
///
/// # Errors
///
/// Returns a geometry or transform error if a fragment cannot be extended.
pub(crate) fn complete_border(
    fragments: &mut FragmentSet,
    boundary: &dyn Boundary,
    reference: BoundaryPosition,
    inside: bool,
    tolerance: f64,
    coincidence_tolerance: f64,
) -> Result<usize> {
    let mut points = collect_intersections(fragments, boundary, tolerance)?;
    if points.len() % 2 == 1 {
        discard_farthest(&mut points);
    }
    order_from(&mut points, reference, inside);

    let coincident_sq = coincidence_tolerance * coincidence_tolerance;
    for pair in points.chunks_exact(2) {
        attach_trail(fragments, boundary, &pair[0], &pair[1], coincident_sq)?;
    }
    Ok(points.len() / 2)
}

fn attach_trail(
    fragments: &mut FragmentSet,
    boundary: &dyn Boundary,
    from: &IntersectionPoint,
    to: &IntersectionPoint,
    coincident_sq: f64,
) -> Result<()> {
    let same_fragment = from.fragment == to.fragment;
    let close = |a: Option<Point2>, b: Option<&Point2>| {
        a.zip(b).is_some_and(|(a, b)| distance_sq(&a, b) <= coincident_sq)
    };

    let mut trail = boundary.trace(from.position, to.position);
    let Some(line) = fragments.get_mut(from.fragment) else {
        return Ok(());
    };
    if close(line.end_point(from.end)?, trail.first()) {
        trail.remove(0);
    }
    // The ring closes by itself: do not repeat its other end.
    if same_fragment && close(line.end_point(to.end)?, trail.last()) {
        trail.pop();
    }
    match from.end {
        End::End => line.append_border(&trail, Frame::Target)?,
        End::Start => {
            trail.reverse();
            line.prepend_border(&trail, Frame::Target)?;
        }
    }
    tracing::debug!(
        fragment = ?from.fragment,
        partner = ?to.fragment,
        points = trail.len(),
        "border stretch attached"
    );

    if !same_fragment {
        let Some(partner) = fragments.get_mut(to.fragment) else {
            return Ok(());
        };
        if !close(partner.end_point(to.end)?, Some(&to.point)) {
            match to.end {
                End::End => partner.append_border(&[to.point], Frame::Target)?,
                End::Start => partner.prepend_border(&[to.point], Frame::Target)?,
            }
        }
    }
    Ok(())
}

/// Closes every fragment still open. Returns how many were closed.
pub(crate) fn close_remaining(fragments: &mut FragmentSet) -> Result<usize> {
    let open = fragments.open_ids();
    for id in &open {
        if let Some(line) = fragments.get_mut(*id) {
            line.close()?;
        }
    }
    Ok(open.len())
}

use super::{distance_sq, Point2};

/// Projection of a point onto a line segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    /// Parameter along the segment, clamped to `[0, 1]`.
    pub t: f64,
    /// Closest point on the segment.
    pub point: Point2,
    /// Squared distance from the query point to `point`.
    pub distance_sq: f64,
}

/// Projects `p` onto the segment `a → b`.
///
/// Degenerate (zero-length) segments project everything onto `a`.
#[must_use]
pub fn project_on_segment(p: &Point2, a: &Point2, b: &Point2) -> SegmentProjection {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;

    if len_sq < 1e-20 {
        return SegmentProjection {
            t: 0.0,
            point: *a,
            distance_sq: distance_sq(p, a),
        };
    }

    // Project point onto the infinite line, clamp to [0, 1].
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    let point = Point2::new(a.x + t * dx, a.y + t * dy);

    SegmentProjection {
        t,
        point,
        distance_sq: distance_sq(p, &point),
    }
}

/// Returns the minimum distance from `p` to the segment `a → b`.
#[must_use]
pub fn point_to_segment_dist(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    project_on_segment(p, a, b).distance_sq.sqrt()
}

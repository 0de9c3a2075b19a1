use super::{Point2, TOLERANCE};

/// Bounded segment-segment intersection in 2D.
///
/// Returns `(intersection_point, t, u)` where `t` and `u` are the parameters
/// along `a0 → a1` and `b0 → b1`, both in `[0, 1]`. Parallel segments return
/// `None`, including collinear overlaps; use [`segments_intersect`] when only
/// a yes/no answer is needed.
#[must_use]
pub fn segment_segment_intersect_2d(
    a0: &Point2,
    a1: &Point2,
    b0: &Point2,
    b1: &Point2,
) -> Option<(Point2, f64, f64)> {
    let (dax, day) = (a1.x - a0.x, a1.y - a0.y);
    let (dbx, dby) = (b1.x - b0.x, b1.y - b0.y);

    let cross = dax * dby - day * dbx;
    if cross.abs() < TOLERANCE {
        return None;
    }

    let dx = b0.x - a0.x;
    let dy = b0.y - a0.y;
    let t = (dx * dby - dy * dbx) / cross;
    let u = (dx * day - dy * dax) / cross;

    // Use a small epsilon to include endpoints.
    let eps = TOLERANCE;
    if t >= -eps && t <= 1.0 + eps && u >= -eps && u <= 1.0 + eps {
        let t_clamped = t.clamp(0.0, 1.0);
        let pt = Point2::new(a0.x + dax * t_clamped, a0.y + day * t_clamped);
        Some((pt, t_clamped, u.clamp(0.0, 1.0)))
    } else {
        None
    }
}

/// Intersection of the infinite line through `p0 → p1` with the segment `b0 → b1`.
///
/// Returns `(intersection_point, t, u)` where `t` is the (unbounded) parameter
/// along the line and `u` the parameter along the segment, in `[0, 1]`.
#[must_use]
pub fn line_segment_intersect_2d(
    p0: &Point2,
    p1: &Point2,
    b0: &Point2,
    b1: &Point2,
) -> Option<(Point2, f64, f64)> {
    let (dpx, dpy) = (p1.x - p0.x, p1.y - p0.y);
    let (dbx, dby) = (b1.x - b0.x, b1.y - b0.y);

    let cross = dpx * dby - dpy * dbx;
    if cross.abs() < TOLERANCE {
        return None;
    }

    let dx = b0.x - p0.x;
    let dy = b0.y - p0.y;
    let t = (dx * dby - dy * dbx) / cross;
    let u = (dx * dpy - dy * dpx) / cross;

    if u >= -TOLERANCE && u <= 1.0 + TOLERANCE {
        let u = u.clamp(0.0, 1.0);
        Some((Point2::new(b0.x + dbx * u, b0.y + dby * u), t, u))
    } else {
        None
    }
}

/// Returns `true` if the closed segments `a0 → a1` and `b0 → b1` share at
/// least one point, collinear overlaps included.
#[must_use]
pub fn segments_intersect(a0: &Point2, a1: &Point2, b0: &Point2, b1: &Point2) -> bool {
    if segment_segment_intersect_2d(a0, a1, b0, b1).is_some() {
        return true;
    }

    // Parallel: only collinear segments can still touch.
    let (dax, day) = (a1.x - a0.x, a1.y - a0.y);
    let side = dax * (b0.y - a0.y) - day * (b0.x - a0.x);
    if side.abs() > TOLERANCE {
        return false;
    }

    let len_sq = dax * dax + day * day;
    if len_sq < TOLERANCE * TOLERANCE {
        // `a` is a single point lying on the line through `b`.
        let (dbx, dby) = (b1.x - b0.x, b1.y - b0.y);
        let lb = dbx * dbx + dby * dby;
        if lb < TOLERANCE * TOLERANCE {
            return (a0.x - b0.x).abs() < TOLERANCE && (a0.y - b0.y).abs() < TOLERANCE;
        }
        let s = ((a0.x - b0.x) * dbx + (a0.y - b0.y) * dby) / lb;
        return (-TOLERANCE..=1.0 + TOLERANCE).contains(&s);
    }

    let s0 = ((b0.x - a0.x) * dax + (b0.y - a0.y) * day) / len_sq;
    let s1 = ((b1.x - a0.x) * dax + (b1.y - a0.y) * day) / len_sq;
    let (lo, hi) = if s0 <= s1 { (s0, s1) } else { (s1, s0) };
    hi >= -TOLERANCE && lo <= 1.0 + TOLERANCE
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    #[test]
    fn crossing_segments() {
        let (pt, t, u) =
            segment_segment_intersect_2d(&p(0.0, 0.0), &p(2.0, 2.0), &p(0.0, 2.0), &p(2.0, 0.0))
                .unwrap();
        assert!((pt.x - 1.0).abs() < 1e-12);
        assert!((pt.y - 1.0).abs() < 1e-12);
        assert!((t - 0.5).abs() < 1e-12);
        assert!((u - 0.5).abs() < 1e-12);
    }

    #[test]
    fn disjoint_segments() {
        assert!(segment_segment_intersect_2d(
            &p(0.0, 0.0),
            &p(1.0, 0.0),
            &p(2.0, -1.0),
            &p(2.0, 1.0)
        )
        .is_none());
    }

    #[test]
    fn line_hits_segment_beyond_line_end() {
        let (pt, t, u) =
            line_segment_intersect_2d(&p(0.0, 0.0), &p(1.0, 0.0), &p(3.0, -1.0), &p(3.0, 1.0))
                .unwrap();
        assert!((pt.x - 3.0).abs() < 1e-12);
        assert!((t - 3.0).abs() < 1e-12);
        assert!((u - 0.5).abs() < 1e-12);
    }

    #[test]
    fn collinear_overlap_detected() {
        assert!(segments_intersect(
            &p(0.0, 0.0),
            &p(2.0, 0.0),
            &p(1.0, 0.0),
            &p(3.0, 0.0)
        ));
        assert!(!segments_intersect(
            &p(0.0, 0.0),
            &p(1.0, 0.0),
            &p(2.0, 0.0),
            &p(3.0, 0.0)
        ));
    }

    #[test]
    fn parallel_offset_segments_do_not_touch() {
        assert!(!segments_intersect(
            &p(0.0, 0.0),
            &p(2.0, 0.0),
            &p(0.0, 1.0),
            &p(2.0, 1.0)
        ));
    }
}

use super::intersect_2d::segments_intersect;
use super::Point2;

/// Computes the signed area of a closed ring (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
#[must_use]
pub fn signed_area_2d(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Ray-casting point-in-ring test.
///
/// Counts crossings of the horizontal ray going right from `(x, y)`. The ring
/// is implicitly closed (last point connects back to the first). A vertex
/// lying exactly at height `y` does not count by itself: the crossing is
/// suspended until the boundary leaves the scan line again, and only counts
/// if it leaves on the opposite side from where it arrived. Runs of
/// horizontal edges on the scan line are handled the same way, with the last
/// vertex of the run deciding whether the crossing lies right of `x`.
#[must_use]
pub fn ring_contains(points: &[Point2], x: f64, y: f64) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    // Starting off the scan line guarantees every suspended run is entered
    // from a known side and resolved before the walk ends.
    #[allow(clippy::float_cmp)]
    let Some(start) = points.iter().position(|p| p.y != y) else {
        return false;
    };

    let mut inside = false;
    let mut suspended: Option<bool> = None;
    let mut prev = points[start];

    for k in 1..=n {
        let curr = points[(start + k) % n];
        #[allow(clippy::float_cmp)]
        let (prev_on, curr_on) = (prev.y == y, curr.y == y);

        if curr_on {
            if !prev_on {
                suspended = Some(prev.y > y);
            }
        } else if prev_on {
            if let Some(was_above) = suspended.take() {
                if was_above != (curr.y > y) && prev.x > x {
                    inside = !inside;
                }
            }
        } else if (prev.y > y) != (curr.y > y) {
            let cx = prev.x + (y - prev.y) * (curr.x - prev.x) / (curr.y - prev.y);
            if cx > x {
                inside = !inside;
            }
        }
        prev = curr;
    }

    inside
}

/// Iterates over the segments of a point list, including the closing edge
/// when `closed` is set.
pub fn segments(points: &[Point2], closed: bool) -> impl Iterator<Item = (Point2, Point2)> + '_ {
    let n = points.len();
    let count = match n {
        0 | 1 => 0,
        _ if closed => n,
        _ => n - 1,
    };
    (0..count).map(move |i| (points[i], points[(i + 1) % n]))
}

/// Returns `true` if any segment of `a` touches any segment of `b`.
#[must_use]
pub fn boundaries_cross(a: &[Point2], a_closed: bool, b: &[Point2], b_closed: bool) -> bool {
    segments(a, a_closed).any(|(a0, a1)| {
        segments(b, b_closed).any(|(b0, b1)| segments_intersect(&a0, &a1, &b0, &b1))
    })
}

use crate::math::{distance_sq, Point2};

/// Drops points closer than `min_distance` to the previously kept point.
///
/// The first and last points are always kept. A non-positive
/// `min_distance` keeps everything.
#[must_use]
pub fn decimate(points: &[Point2], min_distance: f64) -> Vec<Point2> {
    if min_distance <= 0.0 || points.len() <= 2 {
        return points.to_vec();
    }
    let min_sq = min_distance * min_distance;
    let last_index = points.len() - 1;

    let mut kept = Vec::with_capacity(points.len());
    kept.push(points[0]);
    for (i, p) in points.iter().enumerate().skip(1) {
        let Some(prev) = kept.last() else { break };
        if i == last_index || distance_sq(prev, p) >= min_sq {
            kept.push(*p);
        }
    }
    kept
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(n: usize, step: f64) -> Vec<Point2> {
        #[allow(clippy::cast_precision_loss)]
        (0..n).map(|i| Point2::new(i as f64 * step, 0.0)).collect()
    }

    #[test]
    fn zero_resolution_keeps_everything() {
        let pts = line(10, 0.1);
        assert_eq!(decimate(&pts, 0.0).len(), 10);
    }

    #[test]
    fn dense_points_are_thinned() {
        let pts = line(11, 0.1);
        let kept = decimate(&pts, 0.45);
        // 0.0, 0.5, 1.0 plus the forced last point (1.0 is already last).
        assert_eq!(kept.first(), pts.first());
        assert_eq!(kept.last(), pts.last());
        assert!(kept.len() < pts.len());
        for w in kept.windows(2).take(kept.len() - 2) {
            assert!(distance_sq(&w[0], &w[1]) >= 0.45 * 0.45);
        }
    }

    #[test]
    fn short_inputs_untouched() {
        let pts = line(2, 0.01);
        assert_eq!(decimate(&pts, 10.0), pts);
    }
}

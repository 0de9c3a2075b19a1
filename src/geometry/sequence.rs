use std::sync::Arc;

use crate::error::GeometryError;
use crate::math::Point2;

/// An ordered list of native-frame points with copy-on-write sharing.
///
/// Several sequences may view the same reference-counted buffer, each through
/// its own `lower..upper` window. Any mutation first makes the buffer
/// exclusive: the window is copied out when the buffer is shared or only
/// partially viewed, and mutated in place otherwise.
#[derive(Debug, Clone, Default)]
pub struct PointSequence {
    data: Arc<Vec<Point2>>,
    lower: usize,
    upper: usize,
}

impl PointSequence {
    /// Creates a sequence owning `points`.
    #[must_use]
    pub fn new(points: Vec<Point2>) -> Self {
        let upper = points.len();
        Self {
            data: Arc::new(points),
            lower: 0,
            upper,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.upper - self.lower
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upper == self.lower
    }

    /// Returns the viewed points.
    #[must_use]
    pub fn as_slice(&self) -> &[Point2] {
        &self.data[self.lower..self.upper]
    }

    #[must_use]
    pub fn first(&self) -> Option<&Point2> {
        self.as_slice().first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Point2> {
        self.as_slice().last()
    }

    /// Returns `true` if the underlying buffer is referenced by another sequence.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.data) > 1
    }

    /// Returns `true` if both sequences view the same buffer.
    #[must_use]
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Returns a view of `lower..upper` sharing this sequence's buffer.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::RangeOutOfBounds`] if the range is empty,
    /// reversed, or extends past the end.
    pub fn slice(&self, lower: usize, upper: usize) -> Result<Self, GeometryError> {
        if lower >= upper || upper > self.len() {
            return Err(GeometryError::RangeOutOfBounds {
                lower,
                upper,
                len: self.len(),
            });
        }
        Ok(Self {
            data: Arc::clone(&self.data),
            lower: self.lower + lower,
            upper: self.lower + upper,
        })
    }

    /// Appends points after the last one.
    pub fn append(&mut self, points: &[Point2]) {
        if points.is_empty() {
            return;
        }
        self.make_mut().extend_from_slice(points);
        self.sync_window();
    }

    /// Inserts points before the first one.
    pub fn prepend(&mut self, points: &[Point2]) {
        if points.is_empty() {
            return;
        }
        self.make_mut().splice(0..0, points.iter().copied());
        self.sync_window();
    }

    /// Reverses the point order.
    pub fn reverse(&mut self) {
        if self.len() < 2 {
            return;
        }
        self.make_mut().reverse();
    }

    /// Removes and returns the last point.
    pub fn pop(&mut self) -> Option<Point2> {
        if self.is_empty() {
            return None;
        }
        let p = self.make_mut().pop();
        self.sync_window();
        p
    }

    /// Returns the buffer for exclusive mutation, cloning the viewed window
    /// first if the buffer is shared or only partially viewed.
    fn make_mut(&mut self) -> &mut Vec<Point2> {
        if self.lower != 0 || self.upper != self.data.len() {
            self.data = Arc::new(self.as_slice().to_vec());
            self.lower = 0;
            self.upper = self.data.len();
        }
        Arc::make_mut(&mut self.data)
    }

    fn sync_window(&mut self) {
        self.lower = 0;
        self.upper = self.data.len();
    }
}

impl From<Vec<Point2>> for PointSequence {
    fn from(points: Vec<Point2>) -> Self {
        Self::new(points)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn seq(n: usize) -> PointSequence {
        #[allow(clippy::cast_precision_loss)]
        let pts = (0..n).map(|i| Point2::new(i as f64, 0.0)).collect();
        PointSequence::new(pts)
    }

    #[test]
    fn slice_shares_storage() {
        let s = seq(5);
        let sub = s.slice(1, 4).unwrap();
        assert_eq!(sub.len(), 3);
        assert!(sub.shares_storage_with(&s));
        assert!((sub.first().unwrap().x - 1.0).abs() < f64::EPSILON);
        assert!((sub.last().unwrap().x - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn slice_rejects_bad_ranges() {
        let s = seq(3);
        assert!(s.slice(2, 2).is_err());
        assert!(s.slice(2, 1).is_err());
        assert!(s.slice(0, 4).is_err());
    }

    #[test]
    fn mutating_a_shared_sequence_copies() {
        let a = seq(3);
        let mut b = a.clone();
        assert!(a.is_shared());
        b.append(&[Point2::new(9.0, 9.0)]);
        assert_eq!(a.len(), 3);
        assert_eq!(b.len(), 4);
        assert!(!b.shares_storage_with(&a));
    }

    #[test]
    fn mutating_a_slice_leaves_parent_untouched() {
        let parent = seq(5);
        let mut sub = parent.slice(1, 3).unwrap();
        sub.reverse();
        assert!((sub.as_slice()[0].x - 2.0).abs() < f64::EPSILON);
        assert!((parent.as_slice()[1].x - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn exclusive_mutation_is_in_place() {
        let mut a = seq(2);
        let before = Arc::as_ptr(&a.data);
        a.reverse();
        assert_eq!(before, Arc::as_ptr(&a.data));
    }

    #[test]
    fn prepend_and_pop() {
        let mut a = seq(2);
        a.prepend(&[Point2::new(-1.0, 0.0)]);
        assert_eq!(a.len(), 3);
        assert!((a.first().unwrap().x + 1.0).abs() < f64::EPSILON);
        let last = a.pop().unwrap();
        assert!((last.x - 1.0).abs() < f64::EPSILON);
        assert_eq!(a.len(), 2);
    }
}

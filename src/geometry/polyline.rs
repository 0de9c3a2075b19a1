use std::borrow::Cow;
use std::sync::OnceLock;

use crate::error::{GeometryError, Result, TransformError};
use crate::math::polygon_2d::{boundaries_cross, ring_contains};
use crate::math::{distance_sq, Point2, Rect};
use crate::render::{RenderArray, RenderingCache};
use crate::transform::{same_frame, AffineTransform, SharedTransform};

use super::sequence::PointSequence;

/// Identifies one end of an open polyline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum End {
    /// The first point.
    Start,
    /// The last point.
    End,
}

impl End {
    /// Returns the other end.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Start => Self::End,
            Self::End => Self::Start,
        }
    }
}

/// Coordinate frame in which points are supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// The polyline's own storage frame.
    Native,
    /// The frame points are reported in (after the polyline's transform).
    Target,
}

/// Running total of data segment lengths.
///
/// Border points never contribute, so the mean reflects the spacing of the
/// digitised geometry only.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ResolutionStats {
    length: f64,
    segments: usize,
}

impl ResolutionStats {
    fn of(points: &[Point2]) -> Self {
        points.windows(2).fold(Self::default(), |acc, w| {
            acc.with_segment(&w[0], &w[1])
        })
    }

    fn with_segment(self, a: &Point2, b: &Point2) -> Self {
        Self {
            length: self.length + distance_sq(a, b).sqrt(),
            segments: self.segments + 1,
        }
    }

    fn combine(self, other: Self) -> Self {
        Self {
            length: self.length + other.length,
            segments: self.segments + other.segments,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn mean(self) -> Option<f64> {
        (self.segments > 0).then(|| self.length / self.segments as f64)
    }
}

/// An open or closed sequence of points with cached bounds.
///
/// Points are stored in a native frame; an optional [`CoordinateTransform`]
/// maps them into the target frame in which every accessor except
/// [`native_points`](Self::native_points) reports them.
///
/// A polyline is mutable until it is frozen, either explicitly or by
/// [`close`](Self::close). Frozen polylines reject every mutation with
/// [`GeometryError::Immutable`]; their bound caches may still be filled
/// lazily, which is safe from several threads at once.
///
/// [`CoordinateTransform`]: crate::transform::CoordinateTransform
#[derive(Debug)]
pub struct Polyline {
    points: PointSequence,
    transform: Option<SharedTransform>,
    closed: bool,
    frozen: bool,
    resolution: ResolutionStats,
    rendering_resolution: f64,
    native_bounds: OnceLock<Option<Rect>>,
    target_bounds: OnceLock<Option<Rect>>,
    render_cache: RenderingCache,
}

impl Default for Polyline {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Polyline {
    /// Clones share point storage; the rendering cache is never shared.
    fn clone(&self) -> Self {
        Self {
            points: self.points.clone(),
            transform: self.transform.clone(),
            closed: self.closed,
            frozen: self.frozen,
            resolution: self.resolution,
            rendering_resolution: self.rendering_resolution,
            native_bounds: self.native_bounds.clone(),
            target_bounds: self.target_bounds.clone(),
            render_cache: RenderingCache::new(),
        }
    }
}

impl Polyline {
    /// Creates an empty, open polyline.
    #[must_use]
    pub fn new() -> Self {
        Self::from_sequence(PointSequence::default())
    }

    /// Creates an open polyline from native-frame points.
    #[must_use]
    pub fn from_points(points: Vec<Point2>) -> Self {
        Self::from_sequence(PointSequence::new(points))
    }

    fn from_sequence(points: PointSequence) -> Self {
        let resolution = ResolutionStats::of(points.as_slice());
        Self {
            points,
            transform: None,
            closed: false,
            frozen: false,
            resolution,
            rendering_resolution: 0.0,
            native_bounds: OnceLock::new(),
            target_bounds: OnceLock::new(),
            render_cache: RenderingCache::new(),
        }
    }

    /// Sets the native → target transform at construction time.
    #[must_use]
    pub fn with_transform(mut self, transform: SharedTransform) -> Self {
        self.transform = Some(transform);
        self.invalidate();
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns `true` if the last point connects back to the first.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[must_use]
    pub fn transform(&self) -> Option<&SharedTransform> {
        self.transform.as_ref()
    }

    /// Returns the points in the native frame, without transformation.
    #[must_use]
    pub fn native_points(&self) -> &[Point2] {
        self.points.as_slice()
    }

    /// Returns the points in the target frame.
    ///
    /// # Errors
    ///
    /// Returns a transform error if any point cannot be transformed.
    pub fn points(&self) -> Result<Vec<Point2>> {
        Ok(self.target_points()?.into_owned())
    }

    /// Returns the target-frame points, borrowing when no transform applies.
    pub(crate) fn target_points(&self) -> std::result::Result<Cow<'_, [Point2]>, TransformError> {
        match self.active_transform() {
            None => Ok(Cow::Borrowed(self.points.as_slice())),
            Some(t) => self
                .points
                .as_slice()
                .iter()
                .map(|p| t.transform(*p))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Cow::Owned),
        }
    }

    /// Returns the requested end point in the target frame.
    ///
    /// # Errors
    ///
    /// Returns a transform error if the point cannot be transformed.
    pub fn end_point(&self, end: End) -> Result<Option<Point2>> {
        let native = match end {
            End::Start => self.points.first(),
            End::End => self.points.last(),
        };
        match (native, self.active_transform()) {
            (None, _) => Ok(None),
            (Some(p), None) => Ok(Some(*p)),
            (Some(p), Some(t)) => Ok(Some(t.transform(*p)?)),
        }
    }

    /// Returns the first point in the target frame.
    ///
    /// # Errors
    ///
    /// Returns a transform error if the point cannot be transformed.
    pub fn first_point(&self) -> Result<Option<Point2>> {
        self.end_point(End::Start)
    }

    /// Returns the last point in the target frame.
    ///
    /// # Errors
    ///
    /// Returns a transform error if the point cannot be transformed.
    pub fn last_point(&self) -> Result<Option<Point2>> {
        self.end_point(End::End)
    }

    /// Returns the bounding rectangle in the native frame.
    #[must_use]
    pub fn native_bounds(&self) -> Option<Rect> {
        *self
            .native_bounds
            .get_or_init(|| Rect::from_points(self.points.as_slice()))
    }

    /// Returns the bounding rectangle in the target frame.
    ///
    /// # Errors
    ///
    /// Returns a transform error if any point cannot be transformed.
    pub fn bounds(&self) -> Result<Option<Rect>> {
        Ok(self.try_bounds()?)
    }

    pub(crate) fn try_bounds(&self) -> std::result::Result<Option<Rect>, TransformError> {
        if let Some(bounds) = self.target_bounds.get() {
            return Ok(*bounds);
        }
        let bounds = match self.active_transform() {
            None => self.native_bounds(),
            Some(_) => Rect::from_points(self.target_points()?.iter()),
        };
        // A concurrent reader may have won the race with the same value.
        let _ = self.target_bounds.set(bounds);
        Ok(bounds)
    }

    /// Mean length of the data segments, ignoring border points.
    #[must_use]
    pub fn resolution(&self) -> Option<f64> {
        self.resolution.mean()
    }

    /// Minimum spacing between points kept when building rendering arrays.
    #[must_use]
    pub fn rendering_resolution(&self) -> f64 {
        self.rendering_resolution
    }

    /// Sets the rendering decimation hint. Non-positive values disable decimation.
    pub fn set_rendering_resolution(&mut self, resolution: f64) {
        self.rendering_resolution = resolution.max(0.0);
        self.render_cache.invalidate();
    }

    /// Replaces the native → target transform.
    ///
    /// The new target bounds are computed before anything is committed, so a
    /// failing transform leaves the polyline unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Immutable`] if the polyline is frozen, or a
    /// transform error if any point cannot be transformed.
    pub fn set_transform(&mut self, transform: Option<SharedTransform>) -> Result<()> {
        self.ensure_mutable()?;
        let bounds = self.prepare_transform(transform.as_ref())?;
        self.commit_transform(transform, bounds);
        Ok(())
    }

    /// Computes the target bounds this polyline would have under `transform`.
    pub(crate) fn prepare_transform(
        &self,
        transform: Option<&SharedTransform>,
    ) -> std::result::Result<Option<Rect>, TransformError> {
        match transform.filter(|t| !t.is_identity()) {
            None => Ok(self.native_bounds()),
            Some(t) => {
                let mut rect: Option<Rect> = None;
                for p in self.points.as_slice() {
                    let q = t.transform(*p)?;
                    match rect.as_mut() {
                        Some(r) => r.expand(&q),
                        None => rect = Some(Rect::new(q, q)),
                    }
                }
                Ok(rect)
            }
        }
    }

    pub(crate) fn commit_transform(&mut self, transform: Option<SharedTransform>, bounds: Option<Rect>) {
        let native = self.native_bounds.get().copied();
        self.transform = transform;
        self.invalidate();
        if let Some(native) = native {
            let _ = self.native_bounds.set(native);
        }
        let _ = self.target_bounds.set(bounds);
    }

    /// Appends native-frame data points.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Immutable`] if the polyline is frozen or closed.
    pub fn append_points(&mut self, points: &[Point2]) -> Result<()> {
        self.ensure_mutable()?;
        if points.is_empty() {
            return Ok(());
        }
        let mut stats = ResolutionStats::of(points);
        if let Some(last) = self.points.last() {
            stats = stats.with_segment(last, &points[0]);
        }
        self.points.append(points);
        self.resolution = self.resolution.combine(stats);
        self.invalidate();
        Ok(())
    }

    /// Inserts native-frame data points before the first point.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Immutable`] if the polyline is frozen or closed.
    pub fn prepend_points(&mut self, points: &[Point2]) -> Result<()> {
        self.ensure_mutable()?;
        if points.is_empty() {
            return Ok(());
        }
        let mut stats = ResolutionStats::of(points);
        if let (Some(last), Some(first)) = (points.last(), self.points.first()) {
            stats = stats.with_segment(last, first);
        }
        self.points.prepend(points);
        self.resolution = self.resolution.combine(stats);
        self.invalidate();
        Ok(())
    }

    /// Appends all points of `other` after the last point.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Immutable`] if `self` is frozen, or a
    /// transform error if `other` lives in a different frame and its points
    /// cannot be brought into this one.
    pub fn append(&mut self, other: &Self) -> Result<()> {
        self.join(other, End::End, false)
    }

    /// Inserts all points of `other` before the first point.
    ///
    /// # Errors
    ///
    /// Same conditions as [`append`](Self::append).
    pub fn prepend(&mut self, other: &Self) -> Result<()> {
        self.join(other, End::Start, false)
    }

    /// Joins `other` onto the given end of `self`.
    ///
    /// With `drop_duplicate`, the point of `other` touching the join (its
    /// first point when appending, its last when prepending) is skipped.
    pub(crate) fn join(&mut self, other: &Self, at: End, drop_duplicate: bool) -> Result<()> {
        self.ensure_mutable()?;
        let shared_frame = same_frame(self.transform.as_ref(), other.transform.as_ref());
        let incoming: Cow<'_, [Point2]> = if shared_frame {
            Cow::Borrowed(other.native_points())
        } else {
            Cow::Owned(self.to_native(&other.target_points()?)?)
        };
        let incoming: &[Point2] = match (drop_duplicate, at) {
            (false, _) => &incoming,
            (true, End::End) => incoming.get(1..).unwrap_or_default(),
            (true, End::Start) => incoming.get(..incoming.len().saturating_sub(1)).unwrap_or_default(),
        };

        let mut stats = self.resolution.combine(other.resolution);
        if !drop_duplicate {
            let junction = match at {
                End::End => self.points.last().zip(incoming.first()),
                End::Start => incoming.last().zip(self.points.first()),
            };
            if let Some((a, b)) = junction {
                stats = stats.with_segment(a, b);
            }
        }

        // Both bounds already known: the union avoids a rescan.
        let bounds = shared_frame
            .then(|| {
                let native = union_cached(&self.native_bounds, &other.native_bounds)?;
                let target = union_cached(&self.target_bounds, &other.target_bounds);
                Some((native, target))
            })
            .flatten();

        match at {
            End::End => self.points.append(incoming),
            End::Start => self.points.prepend(incoming),
        }
        self.resolution = stats;
        self.invalidate();
        if let Some((native, target)) = bounds {
            let _ = self.native_bounds.set(Some(native));
            if let Some(target) = target {
                let _ = self.target_bounds.set(Some(target));
            }
        }
        Ok(())
    }

    /// Appends border points (map-edge traces) after the last point.
    ///
    /// Border points are converted into the native frame if supplied in the
    /// target frame, and never contribute to [`resolution`](Self::resolution).
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Immutable`] if the polyline is frozen, or a
    /// transform error if the points cannot be converted.
    pub fn append_border(&mut self, points: &[Point2], frame: Frame) -> Result<()> {
        self.add_border(points, frame, End::End)
    }

    /// Inserts border points before the first point.
    ///
    /// # Errors
    ///
    /// Same conditions as [`append_border`](Self::append_border).
    pub fn prepend_border(&mut self, points: &[Point2], frame: Frame) -> Result<()> {
        self.add_border(points, frame, End::Start)
    }

    fn add_border(&mut self, points: &[Point2], frame: Frame, at: End) -> Result<()> {
        self.ensure_mutable()?;
        if points.is_empty() {
            return Ok(());
        }
        let native: Cow<'_, [Point2]> = match frame {
            Frame::Native => Cow::Borrowed(points),
            Frame::Target => Cow::Owned(self.to_native(points)?),
        };
        match at {
            End::End => self.points.append(&native),
            End::Start => self.points.prepend(&native),
        }
        self.invalidate();
        Ok(())
    }

    /// Reverses the point order.
    ///
    /// Storage shared with another polyline is copied first. Callers keeping
    /// endpoint references (such as the pairing index) must swap their end
    /// flags for this polyline.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Immutable`] if the polyline is frozen.
    pub fn reverse(&mut self) -> Result<()> {
        self.ensure_mutable()?;
        self.points.reverse();
        // Bounds are order-independent; only the drawing order changes.
        self.render_cache.invalidate();
        Ok(())
    }

    /// Returns a reversed copy. Works on frozen polylines too.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let mut copy = self.clone();
        copy.points.reverse();
        copy
    }

    /// Marks the polyline closed and freezes it. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Immutable`] if the polyline was frozen while
    /// still open.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.ensure_mutable()?;
        self.closed = true;
        self.frozen = true;
        Ok(())
    }

    /// Freezes the polyline without closing it.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Returns a mutable copy sharing storage with `self`. Closed polylines
    /// stay closed.
    pub(crate) fn thawed(&self) -> Self {
        let mut copy = self.clone();
        copy.frozen = self.closed;
        copy
    }

    /// Removes the last point; used to drop a point duplicating the first
    /// one before closing. The closing edge then spans the removed segment,
    /// so the resolution statistic is left as is.
    pub(crate) fn pop_point(&mut self) -> Result<Option<Point2>> {
        self.ensure_mutable()?;
        let p = self.points.pop();
        self.invalidate();
        Ok(p)
    }

    /// Returns the points `lower..upper` as a new open polyline sharing
    /// storage with `self`.
    ///
    /// Asking for the whole range returns a frozen clone instead.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::RangeOutOfBounds`] for an empty or
    /// out-of-range request.
    pub fn subpoly(&self, lower: usize, upper: usize) -> Result<Self> {
        if lower == 0 && upper == self.len() && !self.is_empty() {
            let mut whole = self.clone();
            whole.frozen = true;
            return Ok(whole);
        }
        let points = self.points.slice(lower, upper)?;
        let mut sub = Self::from_sequence(points);
        sub.transform = self.transform.clone();
        sub.rendering_resolution = self.rendering_resolution;
        Ok(sub)
    }

    /// Returns `true` if the target-frame point `(x, y)` lies inside this
    /// closed polyline. Open polylines contain nothing.
    ///
    /// A point that cannot be tested because of a transform failure is
    /// reported as outside.
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if !self.closed {
            return false;
        }
        match self.try_bounds() {
            Ok(Some(bounds)) if bounds.contains_point(&Point2::new(x, y)) => {}
            _ => return false,
        }
        self.target_points()
            .is_ok_and(|points| ring_contains(&points, x, y))
    }

    /// Same as [`contains`](Self::contains) for a point value.
    #[must_use]
    pub fn contains_point(&self, p: &Point2) -> bool {
        self.contains(p.x, p.y)
    }

    /// Returns `true` if the two polylines share any point, or one closed
    /// polyline encloses the other's first point.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.try_intersects(other).unwrap_or(false)
    }

    fn try_intersects(&self, other: &Self) -> std::result::Result<bool, TransformError> {
        let (Some(a), Some(b)) = (self.try_bounds()?, other.try_bounds()?) else {
            return Ok(false);
        };
        if !a.intersects(&b) {
            return Ok(false);
        }
        let mine = self.target_points()?;
        let theirs = other.target_points()?;
        if self.closed && theirs.first().is_some_and(|p| ring_contains(&mine, p.x, p.y)) {
            return Ok(true);
        }
        if other.closed && mine.first().is_some_and(|p| ring_contains(&theirs, p.x, p.y)) {
            return Ok(true);
        }
        Ok(boundaries_cross(&mine, self.closed, &theirs, other.closed))
    }

    /// Returns `true` if `other` lies entirely inside this closed polyline
    /// without touching its boundary.
    #[must_use]
    pub fn contains_polyline(&self, other: &Self) -> bool {
        self.closed && self.try_contains_polyline(other).unwrap_or(false)
    }

    fn try_contains_polyline(&self, other: &Self) -> std::result::Result<bool, TransformError> {
        let (Some(a), Some(b)) = (self.try_bounds()?, other.try_bounds()?) else {
            return Ok(false);
        };
        if !a.contains_rect(&b) {
            return Ok(false);
        }
        let mine = self.target_points()?;
        let theirs = other.target_points()?;
        if !theirs.first().is_some_and(|p| ring_contains(&mine, p.x, p.y)) {
            return Ok(false);
        }
        Ok(!boundaries_cross(&mine, true, &theirs, other.closed))
    }

    /// Checks out the decimated, device-space coordinate array for `transform`.
    ///
    /// # Errors
    ///
    /// Returns a transform error if the array has to be rebuilt and a point
    /// cannot be transformed.
    pub fn checkout_rendering(&self, transform: &AffineTransform) -> Result<RenderArray<'_>> {
        self.render_cache.checkout(self, transform)
    }

    /// Drops the cached rendering array if nothing has it checked out.
    pub fn evict_rendering_cache(&self) -> bool {
        self.render_cache.evict()
    }

    fn active_transform(&self) -> Option<&SharedTransform> {
        self.transform.as_ref().filter(|t| !t.is_identity())
    }

    fn to_native(&self, points: &[Point2]) -> std::result::Result<Vec<Point2>, TransformError> {
        match self.active_transform() {
            None => Ok(points.to_vec()),
            Some(t) => points.iter().map(|p| t.inverse(*p)).collect(),
        }
    }

    fn ensure_mutable(&self) -> std::result::Result<(), GeometryError> {
        if self.closed {
            Err(GeometryError::Immutable("polyline is closed"))
        } else if self.frozen {
            Err(GeometryError::Immutable("polyline is frozen"))
        } else {
            Ok(())
        }
    }

    fn invalidate(&mut self) {
        self.native_bounds = OnceLock::new();
        self.target_bounds = OnceLock::new();
        self.render_cache.invalidate();
    }
}

fn union_cached(a: &OnceLock<Option<Rect>>, b: &OnceLock<Option<Rect>>) -> Option<Rect> {
    match (a.get()?, b.get()?) {
        (Some(a), Some(b)) => Some(a.union(b)),
        (Some(r), None) | (None, Some(r)) => Some(*r),
        (None, None) => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::error::GeoseamError;
    use crate::transform::shared;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn square() -> Polyline {
        let mut sq = Polyline::from_points(vec![
            p(0.0, 0.0),
            p(10.0, 0.0),
            p(10.0, 10.0),
            p(0.0, 10.0),
        ]);
        sq.close().unwrap();
        sq
    }

    #[test]
    fn close_is_idempotent() {
        let mut a = Polyline::from_points(vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)]);
        a.close().unwrap();
        let once: Vec<Point2> = a.native_points().to_vec();
        a.close().unwrap();
        assert!(a.is_closed());
        assert!(a.is_frozen());
        assert_eq!(a.native_points(), once.as_slice());
    }

    #[test]
    fn append_after_close_is_rejected() {
        let mut sq = square();
        let err = sq.append_points(&[p(5.0, 5.0)]).unwrap_err();
        assert!(matches!(
            err,
            GeoseamError::Geometry(GeometryError::Immutable(_))
        ));
        assert_eq!(sq.len(), 4);
    }

    #[test]
    fn frozen_polyline_rejects_reverse_but_offers_copy() {
        let mut a = Polyline::from_points(vec![p(0.0, 0.0), p(1.0, 0.0)]);
        a.freeze();
        assert!(a.reverse().is_err());
        let r = a.reversed();
        assert_eq!(r.native_points(), &[p(1.0, 0.0), p(0.0, 0.0)]);
        assert_eq!(a.native_points(), &[p(0.0, 0.0), p(1.0, 0.0)]);
        assert!(a.close().is_err());
    }

    #[test]
    fn append_unions_cached_bounds() {
        let mut a = Polyline::from_points(vec![p(0.0, 0.0), p(1.0, 1.0)]);
        let b = Polyline::from_points(vec![p(1.0, 1.0), p(5.0, -2.0)]);
        assert!(a.native_bounds().is_some());
        assert!(b.native_bounds().is_some());
        a.append(&b).unwrap();
        let bounds = a.native_bounds().unwrap();
        assert_eq!(bounds, Rect::new(p(0.0, -2.0), p(5.0, 1.0)));
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn join_drops_duplicate_point() {
        let mut a = Polyline::from_points(vec![p(0.0, 0.0), p(1.0, 0.0)]);
        let b = Polyline::from_points(vec![p(1.0, 0.0), p(2.0, 0.0), p(3.0, 0.0)]);
        a.join(&b, End::End, true).unwrap();
        assert_eq!(a.len(), 4);
        assert_eq!(
            a.native_points(),
            &[p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0), p(3.0, 0.0)]
        );

        let mut c = Polyline::from_points(vec![p(3.0, 0.0), p(4.0, 0.0)]);
        let d = Polyline::from_points(vec![p(2.0, 0.0), p(3.0, 0.0)]);
        c.join(&d, End::Start, true).unwrap();
        assert_eq!(c.native_points(), &[p(2.0, 0.0), p(3.0, 0.0), p(4.0, 0.0)]);
    }

    #[test]
    fn border_points_do_not_change_resolution() {
        let mut a = Polyline::from_points(vec![p(0.0, 0.0), p(2.0, 0.0), p(4.0, 0.0)]);
        assert_relative_eq!(a.resolution().unwrap(), 2.0);
        a.append_border(&[p(100.0, 0.0), p(100.0, 100.0)], Frame::Native)
            .unwrap();
        assert_eq!(a.len(), 5);
        assert_relative_eq!(a.resolution().unwrap(), 2.0);
        a.append_points(&[p(100.0, 101.0)]).unwrap();
        // One new data segment of length 1.
        assert_relative_eq!(a.resolution().unwrap(), 5.0 / 3.0);
    }

    #[test]
    fn border_in_target_frame_is_converted() {
        let t = shared(AffineTransform::translation(10.0, 0.0));
        let mut a = Polyline::from_points(vec![p(0.0, 0.0), p(1.0, 0.0)]).with_transform(t);
        a.append_border(&[p(11.0, 5.0)], Frame::Target).unwrap();
        assert_eq!(a.native_points()[2], p(1.0, 5.0));
        assert_eq!(a.last_point().unwrap(), Some(p(11.0, 5.0)));
    }

    #[test]
    fn points_are_reported_in_target_frame() {
        let t = shared(AffineTransform::scale(2.0, 3.0));
        let a = Polyline::from_points(vec![p(1.0, 1.0), p(2.0, 2.0)]).with_transform(t);
        assert_eq!(a.points().unwrap(), vec![p(2.0, 3.0), p(4.0, 6.0)]);
        assert_eq!(a.native_points(), &[p(1.0, 1.0), p(2.0, 2.0)]);
        assert_eq!(
            a.bounds().unwrap().unwrap(),
            Rect::new(p(2.0, 3.0), p(4.0, 6.0))
        );
    }

    #[test]
    fn failing_set_transform_leaves_state_unchanged() {
        let mut a = Polyline::from_points(vec![p(1.0, 1.0), p(2.0, 2.0)]);
        let before = a.bounds().unwrap();
        let bad = shared(AffineTransform::scale(f64::INFINITY, 1.0));
        assert!(a.set_transform(Some(bad)).is_err());
        assert!(a.transform().is_none());
        assert_eq!(a.bounds().unwrap(), before);

        let good = shared(AffineTransform::translation(1.0, 1.0));
        a.set_transform(Some(good)).unwrap();
        assert_eq!(
            a.bounds().unwrap().unwrap(),
            Rect::new(p(2.0, 2.0), p(3.0, 3.0))
        );
    }

    #[test]
    fn append_from_other_frame_goes_through_target() {
        let mut a = Polyline::from_points(vec![p(0.0, 0.0)]);
        let b = Polyline::from_points(vec![p(0.0, 0.0)])
            .with_transform(shared(AffineTransform::translation(5.0, 0.0)));
        a.append(&b).unwrap();
        assert_eq!(a.native_points(), &[p(0.0, 0.0), p(5.0, 0.0)]);
    }

    #[test]
    fn reverse_shared_storage_copies() {
        let a = Polyline::from_points(vec![p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0)]);
        let mut b = a.subpoly(0, 2).unwrap();
        b.reverse().unwrap();
        assert_eq!(b.native_points(), &[p(1.0, 0.0), p(0.0, 0.0)]);
        assert_eq!(a.native_points()[0], p(0.0, 0.0));
    }

    #[test]
    fn subpoly_whole_range_is_frozen() {
        let a = Polyline::from_points(vec![p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0)]);
        let whole = a.subpoly(0, 3).unwrap();
        assert!(whole.is_frozen());
        assert_eq!(whole.native_points(), a.native_points());
        let part = a.subpoly(1, 3).unwrap();
        assert!(!part.is_frozen());
        assert_eq!(part.len(), 2);
        assert!(a.subpoly(2, 5).is_err());
    }

    #[test]
    fn contains_centroid_not_far_point() {
        let sq = square();
        assert!(sq.contains(5.0, 5.0));
        assert!(!sq.contains(500.0, 500.0));
        let open = Polyline::from_points(vec![p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0)]);
        assert!(!open.contains(9.0, 1.0));
    }

    #[test]
    fn contains_fails_closed_on_transform_error() {
        let mut ring = Polyline::from_points(vec![p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0)])
            .with_transform(shared(AffineTransform::scale(f64::NAN, 1.0)));
        ring.close().unwrap();
        assert!(!ring.contains(5.0, 1.0));
        assert!(!ring.intersects(&square()));
    }

    #[test]
    fn intersects_and_contains_polyline() {
        let sq = square();
        let inner = Polyline::from_points(vec![p(2.0, 2.0), p(3.0, 3.0)]);
        let crossing = Polyline::from_points(vec![p(5.0, 5.0), p(15.0, 5.0)]);
        let outside = Polyline::from_points(vec![p(20.0, 20.0), p(30.0, 30.0)]);

        assert!(sq.intersects(&inner));
        assert!(sq.contains_polyline(&inner));
        assert!(sq.intersects(&crossing));
        assert!(!sq.contains_polyline(&crossing));
        assert!(!sq.intersects(&outside));
        assert!(!sq.contains_polyline(&outside));
        assert!(!inner.contains_polyline(&sq));
    }
}

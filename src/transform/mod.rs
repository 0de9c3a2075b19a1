mod affine;

pub use affine::AffineTransform;

use std::fmt;
use std::sync::Arc;

use crate::error::TransformError;
use crate::math::Point2;

/// A forward/inverse 2D coordinate transform (native → target).
pub trait CoordinateTransform: fmt::Debug + Send + Sync {
    /// Maps a native point into the target frame.
    ///
    /// # Errors
    ///
    /// Returns a [`TransformError`] if the point cannot be transformed.
    fn transform(&self, p: Point2) -> Result<Point2, TransformError>;

    /// Maps a target-frame point back into the native frame.
    ///
    /// # Errors
    ///
    /// Returns a [`TransformError`] if the point cannot be transformed.
    fn inverse(&self, p: Point2) -> Result<Point2, TransformError>;

    /// Returns `true` if this transform leaves every point unchanged.
    fn is_identity(&self) -> bool {
        false
    }
}

/// Shared handle to a coordinate transform.
pub type SharedTransform = Arc<dyn CoordinateTransform>;

/// Wraps a concrete transform into a [`SharedTransform`].
#[must_use]
pub fn shared<T: CoordinateTransform + 'static>(transform: T) -> SharedTransform {
    Arc::new(transform)
}

/// Returns `true` if both optional transforms denote the same frame.
///
/// Identity transforms are equivalent to no transform at all; otherwise two
/// transforms are only considered equal when they are the same allocation.
#[must_use]
pub fn same_frame(a: Option<&SharedTransform>, b: Option<&SharedTransform>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(t), None) | (None, Some(t)) => t.is_identity(),
        (Some(a), Some(b)) => Arc::ptr_eq(a, b) || (a.is_identity() && b.is_identity()),
    }
}

/// Rejects NaN and infinite coordinates produced by a transform.
///
/// # Errors
///
/// Returns [`TransformError::NonFinite`] if either coordinate is not finite.
pub fn check_finite(p: Point2) -> Result<Point2, TransformError> {
    if p.x.is_finite() && p.y.is_finite() {
        Ok(p)
    } else {
        Err(TransformError::NonFinite)
    }
}

use super::{check_finite, CoordinateTransform};
use crate::error::TransformError;
use crate::math::{Matrix3, Point2, TOLERANCE};

/// A 2D affine transform stored as a homogeneous 3x3 matrix.
///
/// Equality is exact matrix equality; the rendering cache relies on it to
/// recognise a repeated draw with the same transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    matrix: Matrix3,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    /// Wraps a homogeneous matrix. The last row is expected to be `[0, 0, 1]`.
    #[must_use]
    pub fn from_matrix(matrix: Matrix3) -> Self {
        Self { matrix }
    }

    #[must_use]
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    #[must_use]
    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            matrix: Matrix3::new(1.0, 0.0, tx, 0.0, 1.0, ty, 0.0, 0.0, 1.0),
        }
    }

    #[must_use]
    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            matrix: Matrix3::new(sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0),
        }
    }

    /// Returns the underlying homogeneous matrix.
    #[must_use]
    pub fn matrix(&self) -> &Matrix3 {
        &self.matrix
    }

    /// Returns the transform that applies `self` first, then `next`.
    #[must_use]
    pub fn then(&self, next: &Self) -> Self {
        Self {
            matrix: next.matrix * self.matrix,
        }
    }

    /// Returns the inverse transform.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::NotInvertible`] if the matrix is singular.
    pub fn inverted(&self) -> Result<Self, TransformError> {
        if self.matrix.determinant().abs() < TOLERANCE {
            return Err(TransformError::NotInvertible);
        }
        self.matrix
            .try_inverse()
            .map(|matrix| Self { matrix })
            .ok_or(TransformError::NotInvertible)
    }

    /// Applies the transform to a point.
    #[must_use]
    pub fn apply(&self, p: &Point2) -> Point2 {
        let m = &self.matrix;
        Point2::new(
            m[(0, 0)] * p.x + m[(0, 1)] * p.y + m[(0, 2)],
            m[(1, 0)] * p.x + m[(1, 1)] * p.y + m[(1, 2)],
        )
    }
}

impl CoordinateTransform for AffineTransform {
    fn transform(&self, p: Point2) -> Result<Point2, TransformError> {
        check_finite(self.apply(&p))
    }

    fn inverse(&self, p: Point2) -> Result<Point2, TransformError> {
        check_finite(self.inverted()?.apply(&p))
    }

    fn is_identity(&self) -> bool {
        self.matrix == Matrix3::identity()
    }
}

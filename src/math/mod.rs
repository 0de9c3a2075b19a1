pub mod distance_2d;
pub mod intersect_2d;
pub mod polygon_2d;
pub mod rect;

pub use rect::Rect;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 3x3 homogeneous matrix used for 2D affine transforms.
pub type Matrix3 = nalgebra::Matrix3<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Squared Euclidean distance between two points.
#[must_use]
pub fn distance_sq(a: &Point2, b: &Point2) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dx * dx + dy * dy
}

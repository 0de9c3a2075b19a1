pub mod polygon;
pub mod polyline;
pub mod sequence;
pub mod shape;

pub use polygon::Polygon;
pub use polyline::{End, Frame, Polyline};
pub use sequence::PointSequence;
pub use shape::{Region, Shape};

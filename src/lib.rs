pub mod assembly;
pub mod error;
pub mod geometry;
pub mod math;
pub mod render;
pub mod transform;

pub use error::{GeoseamError, Result};

mod cache;
mod decimate;

pub use cache::{RenderArray, RenderingCache};
pub use decimate::decimate;

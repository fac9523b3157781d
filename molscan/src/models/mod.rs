mod image;
mod recognition;

pub use image::*;
pub use recognition::*;

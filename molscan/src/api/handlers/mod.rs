pub mod engines;
pub(crate) mod health;
pub mod images;
pub mod recognize;

pub use engines::list_engines;
pub use health::health_check;
pub use images::get_image;
pub use recognize::{recognize_all, recognize_with_engine};

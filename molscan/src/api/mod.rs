mod extractors;
mod handlers;
mod openapi;
pub mod response;
mod routes;
mod state;

pub use extractors::{ImageSubmission, IMAGE_FIELDS};
pub use openapi::ApiDoc;
pub use routes::create_router;
pub use state::AppState;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::openapi;
use super::AppState;

/// Multipart framing overhead allowed on top of the encoded image.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Largest request body for a given image size limit. Data URIs carry the
/// image base64-encoded, which inflates it by a third.
fn body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes
        .saturating_mul(4)
        .saturating_div(3)
        .saturating_add(FORM_OVERHEAD_BYTES)
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/recognize", post(handlers::recognize_all))
        .route("/recognize/{engine}", post(handlers::recognize_with_engine))
        .route("/image/{id}", get(handlers::get_image))
        .route("/engines", get(handlers::list_engines))
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(openapi::openapi_json))
        .merge(openapi::redoc_router())
        .layer(DefaultBodyLimit::max(body_limit(
            state.config.server.max_upload_bytes,
        )))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

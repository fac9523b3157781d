use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::handlers;
use super::response;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Molscan API",
        version = "0.1.0",
        description = "Content-addressed image store with parallel chemical structure recognition.",
    ),
    paths(
        handlers::recognize::recognize_with_engine,
        handlers::recognize::recognize_all,
        handlers::images::get_image,
        handlers::engines::list_engines,
        handlers::health::health_check,
    ),
    components(schemas(
        response::ErrorCode,
        response::ApiError,
        handlers::images::ImageData,
        handlers::engines::EngineInfo,
        handlers::engines::EnginesData,
        handlers::health::HealthData,
    )),
    tags(
        (name = "recognition", description = "Submit images for structure recognition"),
        (name = "images", description = "Stored image retrieval"),
        (name = "engines", description = "Registered recognition engines"),
        (name = "health", description = "Health check"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}

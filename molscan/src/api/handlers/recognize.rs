use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::info;

use crate::api::extractors::ImageSubmission;
use crate::api::state::AppState;
use crate::codec::Submission;
use crate::engines::EngineSelector;
use crate::error::MolscanError;

/// `POST /recognize/{engine}`
///
/// Runs the named engine (or every engine for `all` / `*`) on the submitted
/// image. Engine failures are reported per engine inside a 200 response.
#[utoipa::path(
    post,
    path = "/recognize/{engine}",
    tag = "recognition",
    params(
        ("engine" = String, Path, description = "Engine name, or `all` / `*` for every engine"),
    ),
    request_body(content_type = "multipart/form-data", content = String, description = "`image-data` or `image-src` field holding a data URI or URL; a raw image body with its Content-Type is also accepted"),
    responses(
        (status = 200, description = "Image id plus one outcome per engine, keyed by engine name"),
        (status = 400, description = "Missing or undecodable image data", body = crate::api::response::ApiError),
        (status = 502, description = "Remote image could not be fetched", body = crate::api::response::ApiError),
    )
)]
pub async fn recognize_with_engine(
    State(state): State<AppState>,
    Path(engine): Path<String>,
    ImageSubmission(submission): ImageSubmission,
) -> Result<Response, MolscanError> {
    recognize(&state, EngineSelector::parse(Some(&engine)), submission).await
}

/// `POST /recognize`
///
/// Same as `/recognize/all`.
#[utoipa::path(
    post,
    path = "/recognize",
    tag = "recognition",
    request_body(content_type = "multipart/form-data", content = String, description = "`image-data` or `image-src` field holding a data URI or URL; a raw image body with its Content-Type is also accepted"),
    responses(
        (status = 200, description = "Image id plus one outcome per engine, keyed by engine name"),
        (status = 400, description = "Missing or undecodable image data", body = crate::api::response::ApiError),
        (status = 502, description = "Remote image could not be fetched", body = crate::api::response::ApiError),
    )
)]
pub async fn recognize_all(
    State(state): State<AppState>,
    ImageSubmission(submission): ImageSubmission,
) -> Result<Response, MolscanError> {
    recognize(&state, EngineSelector::All, submission).await
}

async fn recognize(
    state: &AppState,
    selector: EngineSelector,
    submission: Submission,
) -> Result<Response, MolscanError> {
    let response = state
        .recognition
        .recognize_submission(&selector, submission)
        .await?;

    let succeeded = response.engines.values().filter(|o| o.is_success()).count();
    info!(
        image = %response.image,
        selector = %selector,
        engines = response.engines.len(),
        succeeded,
        "Recognition complete"
    );

    Ok(Json(response.as_ref()).into_response())
}

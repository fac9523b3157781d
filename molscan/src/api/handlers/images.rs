use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::Query;
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::error::MolscanError;

/// Query parameters for image retrieval.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ImageQuery {
    /// `image` (default) for the raw bytes or `json` for metadata plus a
    /// data URI.
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    pub size: usize,
    /// `data:<mediaType>;base64,<payload>`
    pub data: String,
}

enum ImageFormat {
    Image,
    Json,
}

impl ImageFormat {
    fn parse(raw: Option<&str>) -> Result<Self, MolscanError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::Image),
            Some(f) if f.eq_ignore_ascii_case("image") => Ok(Self::Image),
            Some(f) if f.eq_ignore_ascii_case("json") => Ok(Self::Json),
            Some(f) => Err(MolscanError::Validation(format!("Unknown data format: {f}"))),
        }
    }
}

/// `GET /image/{id}`
#[utoipa::path(
    get,
    path = "/image/{id}",
    tag = "images",
    params(
        ("id" = String, Path, description = "Content id (10 hex characters)"),
        ImageQuery,
    ),
    responses(
        (status = 200, description = "Raw image bytes, or metadata with `format=json`", body = ImageData),
        (status = 400, description = "Unknown data format", body = crate::api::response::ApiError),
        (status = 404, description = "Unknown image", body = crate::api::response::ApiError),
    )
)]
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ImageQuery>,
) -> Result<Response, MolscanError> {
    let format = ImageFormat::parse(query.format.as_deref())?;
    let image = state.store.fetch(&id).await?;

    match format {
        ImageFormat::Json => {
            let data = image.to_data_uri().unwrap_or_default();
            Ok(Json(ImageData {
                size: image.size().unwrap_or(0),
                id: image.id,
                media_type: image.media_type,
                encoding: image.encoding,
                data,
            })
            .into_response())
        }
        ImageFormat::Image => {
            let media_type = image.media_type_or_default().to_string();
            let bytes = image.bytes.unwrap_or_default();
            Ok(([(CONTENT_TYPE, media_type)], bytes).into_response())
        }
    }
}

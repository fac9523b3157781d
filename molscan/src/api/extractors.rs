use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::rejection::{BytesRejection, FormRejection};
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::Form;

use crate::codec::Submission;
use crate::error::MolscanError;

/// Form field carrying the image, in order of preference.
pub const IMAGE_FIELDS: [&str; 2] = ["image-data", "image-src"];

/// An image submission read from any of the accepted request bodies.
///
/// - `multipart/form-data`: text field `image-data` or `image-src` holding a
///   data URI or URL, or a file part named `image-data`.
/// - `application/x-www-form-urlencoded`: the same two fields.
/// - anything else: the body is the image, typed by its `Content-Type`.
#[derive(Debug)]
pub struct ImageSubmission(pub Submission);

impl<S> FromRequest<S> for ImageSubmission
where
    S: Send + Sync,
{
    type Rejection = MolscanError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let essence = content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();

        let submission = match essence.as_str() {
            "multipart/form-data" => {
                let multipart = Multipart::from_request(req, state)
                    .await
                    .map_err(map_multipart_rejection)?;
                from_multipart(multipart).await?
            }
            "application/x-www-form-urlencoded" => {
                let Form(mut fields) = Form::<HashMap<String, String>>::from_request(req, state)
                    .await
                    .map_err(map_form_rejection)?;
                let value = IMAGE_FIELDS
                    .iter()
                    .find_map(|name| fields.remove(*name).filter(|v| !v.trim().is_empty()))
                    .ok_or(MolscanError::NoImageData)?;
                Submission::from_form_value(value)?
            }
            _ => {
                let bytes = Bytes::from_request(req, state)
                    .await
                    .map_err(map_bytes_rejection)?;
                if bytes.is_empty() {
                    return Err(MolscanError::NoImageData);
                }
                Submission::Raw {
                    bytes: bytes.to_vec(),
                    media_type: content_type,
                }
            }
        };

        Ok(ImageSubmission(submission))
    }
}

async fn from_multipart(mut multipart: Multipart) -> Result<Submission, MolscanError> {
    let mut data: Option<Submission> = None;
    let mut src: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(map_multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "image-data" if field.file_name().is_some() => {
                let media_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(map_multipart_error)?;
                if !bytes.is_empty() {
                    data = Some(Submission::Raw {
                        bytes: bytes.to_vec(),
                        media_type,
                    });
                }
            }
            "image-data" => {
                let value = field.text().await.map_err(map_multipart_error)?;
                if !value.trim().is_empty() {
                    data = Some(Submission::from_form_value(value)?);
                }
            }
            "image-src" => {
                let value = field.text().await.map_err(map_multipart_error)?;
                if !value.trim().is_empty() {
                    src = Some(value);
                }
            }
            _ => {}
        }
    }

    match (data, src) {
        (Some(submission), _) => Ok(submission),
        (None, Some(value)) => Submission::from_form_value(value),
        (None, None) => Err(MolscanError::NoImageData),
    }
}

fn too_large() -> MolscanError {
    MolscanError::Validation("Image too large".to_string())
}

fn map_bytes_rejection(rejection: BytesRejection) -> MolscanError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large()
    } else {
        MolscanError::Validation(format!("Failed to read request body: {}", rejection.body_text()))
    }
}

fn map_form_rejection(rejection: FormRejection) -> MolscanError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large()
    } else {
        MolscanError::Validation(format!("Invalid form: {}", rejection.body_text()))
    }
}

fn map_multipart_rejection(rejection: MultipartRejection) -> MolscanError {
    MolscanError::Validation(format!("Invalid multipart body: {}", rejection.body_text()))
}

fn map_multipart_error(err: MultipartError) -> MolscanError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large()
    } else {
        MolscanError::Validation(format!("Invalid multipart field: {}", err.body_text()))
    }
}

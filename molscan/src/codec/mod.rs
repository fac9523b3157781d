//! Decoding of submitted images.
//!
//! A submission arrives as raw bytes, a data URI or a remote URL. Each is
//! turned into bytes plus a media type and persisted through the
//! [`ContentStore`] before the decoded [`Image`] is handed back.

mod data_uri;
mod fetch;

pub use data_uri::{DataUri, BASE64_ENCODING, DATA_URI_PREFIX};
pub use fetch::{FetchedImage, ImageFetcher};

use tracing::{debug, warn};

use crate::error::{MolscanError, Result};
use crate::models::Image;
use crate::storage::{content_id, ContentStore};

pub const RAW_ENCODING: &str = "raw";
pub const URL_ENCODING: &str = "url";

/// One inbound image, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Raw {
        bytes: Vec<u8>,
        media_type: Option<String>,
    },
    DataUri(String),
    Url(String),
}

impl Submission {
    /// Classify a form value as a data URI or an http(s) URL.
    pub fn from_form_value(value: impl Into<String>) -> Result<Self> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(MolscanError::NoImageData);
        }
        if value.starts_with(DATA_URI_PREFIX) {
            return Ok(Submission::DataUri(value));
        }
        if value.starts_with("http") {
            return match url::Url::parse(&value) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Submission::Url(value)),
                _ => Err(MolscanError::UnknownEncoding(truncate(&value))),
            };
        }
        warn!(value = %truncate(&value), "Unknown image encoding");
        Err(MolscanError::UnknownEncoding(truncate(&value)))
    }

    /// Hash of the submission as received.
    ///
    /// For raw uploads this is the image id; for data URIs and URLs it is
    /// the hash of the submitted string, which lets a repeated submission
    /// be answered without fetching or decoding anything.
    pub fn source_hash(&self) -> String {
        match self {
            Submission::Raw { bytes, .. } => content_id(bytes),
            Submission::DataUri(value) | Submission::Url(value) => content_id(value.as_bytes()),
        }
    }
}

fn truncate(value: &str) -> String {
    const MAX: usize = 64;
    match value.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &value[..idx]),
        None => value.to_string(),
    }
}

#[derive(Clone, Debug)]
pub struct ImageCodec {
    store: ContentStore,
    fetcher: ImageFetcher,
    max_bytes: usize,
}

impl ImageCodec {
    pub fn new(store: ContentStore, fetcher: ImageFetcher, max_bytes: usize) -> Self {
        Self {
            store,
            fetcher,
            max_bytes,
        }
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Decode and persist a submission.
    pub async fn decode(&self, submission: Submission) -> Result<Image> {
        match submission {
            Submission::Raw { bytes, media_type } => {
                self.persist(bytes, media_type, RAW_ENCODING).await
            }
            Submission::DataUri(value) => {
                let uri = DataUri::parse(&value)?;
                debug!(media_type = ?uri.media_type, encoding = ?uri.encoding, "Decoding data URI");
                let bytes = uri.decode()?;
                let media_type = uri.media_type.map(str::to_string);
                let encoding = uri.encoding.unwrap_or(BASE64_ENCODING).to_lowercase();
                self.persist(bytes, media_type, &encoding).await
            }
            Submission::Url(url) => {
                let fetched = self.fetcher.fetch(&url, self.max_bytes).await?;
                self.persist(fetched.bytes, fetched.media_type, URL_ENCODING)
                    .await
            }
        }
    }

    async fn persist(
        &self,
        bytes: Vec<u8>,
        media_type: Option<String>,
        encoding: &str,
    ) -> Result<Image> {
        if bytes.is_empty() {
            return Err(MolscanError::NoImageData);
        }
        if bytes.len() > self.max_bytes {
            return Err(MolscanError::Validation(format!(
                "Image too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_bytes
            )));
        }

        let media_type = resolve_media_type(media_type, &bytes);
        self.store
            .store(bytes, media_type, Some(encoding.to_string()))
            .await
    }
}

/// Declared media type (parameters stripped), else sniffed from magic bytes.
fn resolve_media_type(declared: Option<String>, bytes: &[u8]) -> Option<String> {
    let declared = declared
        .as_deref()
        .and_then(|m| m.split(';').next())
        .map(|m| m.trim().to_lowercase())
        .filter(|m| !m.is_empty() && m != "application/octet-stream");

    declared.or_else(|| infer::get(bytes).map(|kind| kind.mime_type().to_string()))
}

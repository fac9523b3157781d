use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// Media type used when an image has none recorded.
pub const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// One stored blob plus its interpretation.
///
/// `id` is the content address of `bytes` and never changes once assigned.
/// The bytes are absent when only the metadata record has been loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// How the submission was encoded (`base64`, `url`, `raw`). Informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(skip)]
    pub bytes: Option<Vec<u8>>,
}

impl Image {
    pub fn new(id: String, media_type: Option<String>, encoding: Option<String>) -> Self {
        Self {
            id,
            media_type,
            encoding,
            bytes: None,
        }
    }

    pub fn with_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.bytes = Some(bytes);
        self
    }

    /// An image carrying no usable data: no id, or loaded with zero bytes.
    pub fn is_empty(&self) -> bool {
        self.id.is_empty() || self.bytes.as_ref().is_some_and(|b| b.is_empty())
    }

    pub fn size(&self) -> Option<usize> {
        self.bytes.as_ref().map(Vec::len)
    }

    pub fn media_type_or_default(&self) -> &str {
        self.media_type.as_deref().unwrap_or(FALLBACK_MEDIA_TYPE)
    }

    /// Render the loaded bytes as `data:<mediaType>;base64,<payload>`.
    pub fn to_data_uri(&self) -> Option<String> {
        self.bytes.as_ref().map(|bytes| {
            format!(
                "data:{};base64,{}",
                self.media_type_or_default(),
                STANDARD.encode(bytes)
            )
        })
    }
}

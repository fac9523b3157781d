use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use crate::error::{MolscanError, Result};

/// Body and declared content type of a remote image.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub media_type: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ImageFetcher {
    client: Client,
}

impl ImageFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| MolscanError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// GET `url`; any transport failure or non-2xx status is a fetch error.
    ///
    /// The body is read chunk by chunk and abandoned as soon as it grows past
    /// `max_bytes`, so an oversized resource is never held in memory.
    pub async fn fetch(&self, url: &str, max_bytes: usize) -> Result<FetchedImage> {
        let mut response = self.client.get(url).send().await?.error_for_status()?;

        if let Some(length) = response.content_length() {
            if length > max_bytes as u64 {
                debug!(url = %url, length, max_bytes, "Remote image exceeds size limit");
                return Err(too_large(max_bytes));
            }
        }

        let media_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() + chunk.len() > max_bytes {
                debug!(url = %url, max_bytes, "Remote image body exceeds size limit");
                return Err(too_large(max_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }

        debug!(url = %url, size = bytes.len(), media_type = ?media_type, "Fetched remote image");
        Ok(FetchedImage { bytes, media_type })
    }
}

fn too_large(max_bytes: usize) -> MolscanError {
    MolscanError::Validation(format!(
        "Image too large: more than {max_bytes} bytes"
    ))
}

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, info};

use crate::error::{MolscanError, Result};
use crate::models::Image;

use super::RecognitionWorker;

const MAX_RETRIES: u32 = 3;

/// Engine backed by a remote recognition service.
///
/// The image bytes are POSTed as the request body with the image's media
/// type; a 2xx response body is the payload. Rate limiting (429) and server
/// errors are retried with exponential back-off.
#[derive(Clone, Debug)]
pub struct HttpWorker {
    name: String,
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpWorker {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let name = name.into();
        let url = url.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| MolscanError::Engine(format!("Failed to create HTTP client: {e}")))?;

        info!(engine = %name, url = %url, "HTTP engine initialized");
        Ok(Self {
            name,
            client,
            url,
            api_key,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, body: Vec<u8>, media_type: &str) -> Result<String> {
        let mut retries = 0;

        loop {
            let mut request = self
                .client
                .post(&self.url)
                .header(CONTENT_TYPE, media_type)
                .body(body.clone());
            if let Some(key) = &self.api_key {
                request = request.header(AUTHORIZATION, format!("Bearer {key}"));
            }

            match request.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let text = resp.text().await.map_err(|e| {
                            MolscanError::Engine(format!("Failed to read response: {e}"))
                        })?;
                        let payload = text.trim();
                        if payload.is_empty() {
                            return Err(MolscanError::Engine(format!(
                                "{} returned an empty response",
                                self.name
                            )));
                        }
                        return Ok(payload.to_string());
                    } else if status.as_u16() == 429 || status.is_server_error() {
                        retries += 1;
                        if retries >= MAX_RETRIES {
                            return Err(MolscanError::Engine(format!(
                                "{} request failed after {MAX_RETRIES} retries: {status}",
                                self.name
                            )));
                        }
                        let delay = Duration::from_millis(100 * (2_u64.pow(retries)));
                        debug!(engine = %self.name, %status, ?delay, "Retrying engine request");
                        tokio::time::sleep(delay).await;
                        continue;
                    } else {
                        let body = resp.text().await.unwrap_or_default();
                        return Err(MolscanError::Engine(format!(
                            "{} request failed: {status} - {}",
                            self.name,
                            body.trim()
                        )));
                    }
                }
                Err(e) => {
                    retries += 1;
                    if retries >= MAX_RETRIES {
                        return Err(MolscanError::Engine(format!(
                            "{} request failed after {MAX_RETRIES} retries: {e}",
                            self.name
                        )));
                    }
                    let delay = Duration::from_millis(100 * (2_u64.pow(retries)));
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl RecognitionWorker for HttpWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recognize_blob(&self, image: &Image, blob: &Path) -> Result<String> {
        let body = match &image.bytes {
            Some(bytes) => bytes.clone(),
            None => tokio::fs::read(blob).await?,
        };
        self.post(body, image.media_type_or_default()).await
    }
}

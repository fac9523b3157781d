use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::codec::{ImageCodec, Submission};
use crate::engines::EngineSelector;
use crate::error::Result;
use crate::models::RecognitionResponse;

use super::{aggregate, Dispatcher, RequestCache};

/// Decode, dispatch and aggregate behind the single-flight cache.
#[derive(Clone)]
pub struct RecognitionService {
    codec: ImageCodec,
    dispatcher: Dispatcher,
    cache: RequestCache,
}

impl RecognitionService {
    pub fn new(codec: ImageCodec, dispatcher: Dispatcher, cache: RequestCache) -> Self {
        Self {
            codec,
            dispatcher,
            cache,
        }
    }

    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    /// Recognize a submitted image with the selected engines.
    ///
    /// Keyed on the hash of the submission as received, so a repeat of an
    /// earlier data URI or URL is answered without decoding or fetching. A
    /// raw upload hashes to its image id. Decode errors propagate and are
    /// not cached.
    pub async fn recognize_submission(
        &self,
        selector: &EngineSelector,
        submission: Submission,
    ) -> Result<Arc<RecognitionResponse>> {
        let key = RequestCache::key(selector, &submission.source_hash());

        let codec = self.codec.clone();
        let dispatcher = self.dispatcher.clone();
        let engines = selector.clone();

        self.cache
            .get_or_compute(&key, || async move {
                let image = codec.decode(submission).await?;
                info!(image = %image.id, selector = %engines, "Image decoded");
                let image = Arc::new(image);
                let outcomes = dispatcher
                    .dispatch(&engines, Some(Arc::clone(&image)))
                    .await;
                Ok(aggregate(&image, outcomes))
            })
            .await
            .map_err(|e| {
                if e.is_client_error() {
                    debug!(selector = %selector, error = %e, "Submission rejected");
                } else {
                    warn!(selector = %selector, error = %e, "Recognition request failed");
                }
                e
            })
    }
}

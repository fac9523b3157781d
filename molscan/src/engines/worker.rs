use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{Image, RecognitionOutcome};
use crate::storage::ContentStore;

/// An external recognition capability.
///
/// Implementations turn a stored image into an engine-specific payload
/// (typically a molfile). They may fail freely: [`recognize`] converts every
/// error into a failed [`RecognitionOutcome`].
#[async_trait]
pub trait RecognitionWorker: Send + Sync {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool {
        true
    }

    /// Run the engine against `image`, whose blob lives at `blob`.
    async fn recognize_blob(&self, image: &Image, blob: &Path) -> Result<String>;
}

/// Run `worker` against `image` and time it. Never fails.
pub async fn recognize(
    worker: &dyn RecognitionWorker,
    store: &ContentStore,
    image: &Image,
) -> RecognitionOutcome {
    let engine = worker.name();

    let blob = match store.locate(&image.id).await {
        Ok(path) => path,
        Err(_) => {
            warn!(engine = %engine, image = %image.id, "Image blob missing");
            return RecognitionOutcome::failure(
                engine,
                None,
                format!("Image {} not found!", image.id),
            );
        }
    };

    let start = Instant::now();
    let result = worker.recognize_blob(image, &blob).await;
    let elapsed = start.elapsed().as_secs_f64();

    match result {
        Ok(payload) => {
            debug!(engine = %engine, image = %image.id, elapsed, "Recognition succeeded");
            RecognitionOutcome::success(engine, elapsed, payload)
        }
        Err(e) => {
            warn!(engine = %engine, image = %image.id, error = %e, "Recognition failed");
            RecognitionOutcome::failure(engine, Some(elapsed), e.to_string())
        }
    }
}

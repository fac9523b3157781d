use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, error, warn};

use crate::engines::{recognize, EngineRegistry, EngineSelector};
use crate::models::{Image, RecognitionOutcome, STATUS_TIMEOUT};
use crate::storage::ContentStore;

/// Fans a request out to every resolved engine in parallel.
#[derive(Clone)]
pub struct Dispatcher {
    registry: EngineRegistry,
    store: ContentStore,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: EngineRegistry, store: ContentStore, timeout: Duration) -> Self {
        Self {
            registry,
            store,
            timeout,
        }
    }

    /// Run every engine `selector` resolves to against `image`.
    ///
    /// Each engine runs on its own task and is waited on for at most the
    /// configured timeout. Returns once every engine has succeeded, failed or
    /// timed out; a timed-out engine keeps running detached and its outcome
    /// is recorded as `timeout`. Outcomes are unordered.
    pub async fn dispatch(
        &self,
        selector: &EngineSelector,
        image: Option<Arc<Image>>,
    ) -> Vec<RecognitionOutcome> {
        let image = match image {
            Some(image) if !image.is_empty() => image,
            _ => {
                warn!("Recognition not performed on empty or missing image");
                return Vec::new();
            }
        };

        let workers = self.registry.resolve(selector);
        if workers.is_empty() {
            debug!(selector = %selector, image = %image.id, "No engines to dispatch");
            return Vec::new();
        }

        debug!(
            selector = %selector,
            image = %image.id,
            engines = workers.len(),
            "Dispatching recognition"
        );

        let timeout = self.timeout;
        let waits = workers.into_iter().map(|worker| {
            let engine = worker.name().to_string();
            let store = self.store.clone();
            let image = Arc::clone(&image);
            let handle =
                tokio::spawn(async move { recognize(worker.as_ref(), &store, &image).await });

            async move {
                let started = Instant::now();
                match tokio::time::timeout(timeout, handle).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(e)) => {
                        error!(engine = %engine, error = %e, "Engine task failed");
                        RecognitionOutcome::failure(
                            engine,
                            Some(started.elapsed().as_secs_f64()),
                            format!("worker failed: {e}"),
                        )
                    }
                    Err(_) => {
                        warn!(engine = %engine, timeout_secs = timeout.as_secs_f64(), "Engine timed out");
                        RecognitionOutcome::failure(
                            engine,
                            Some(started.elapsed().as_secs_f64()),
                            STATUS_TIMEOUT,
                        )
                    }
                }
            }
        });

        join_all(waits).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use crate::engines::RecognitionWorker;
    use crate::error::{MolscanError, Result};

    struct Fixed {
        name: &'static str,
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl RecognitionWorker for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn recognize_blob(&self, image: &Image, _blob: &Path) -> Result<String> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                Err(MolscanError::Engine(format!("{} rejected", self.name)))
            } else {
                Ok(format!("{}:{}", self.name, image.id))
            }
        }
    }

    struct Panicking;

    #[async_trait]
    impl RecognitionWorker for Panicking {
        fn name(&self) -> &str {
            "panicky"
        }

        async fn recognize_blob(&self, _image: &Image, _blob: &Path) -> Result<String> {
            panic!("engine crashed");
        }
    }

    fn worker(name: &'static str, delay_ms: u64, fail: bool) -> Arc<dyn RecognitionWorker> {
        Arc::new(Fixed {
            name,
            delay: Duration::from_millis(delay_ms),
            fail,
        })
    }

    async fn setup(
        workers: Vec<Arc<dyn RecognitionWorker>>,
        timeout: Duration,
    ) -> (TempDir, Dispatcher, Arc<Image>) {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::open(dir.path()).await.unwrap();
        let image = store
            .store(b"molecule".to_vec(), Some("image/png".into()), None)
            .await
            .unwrap();
        let registry = EngineRegistry::new(workers).unwrap();
        (dir, Dispatcher::new(registry, store, timeout), Arc::new(image))
    }

    #[tokio::test]
    async fn one_outcome_per_engine() {
        let (_dir, dispatcher, image) = setup(
            vec![worker("a", 0, false), worker("b", 5, true), worker("c", 0, false)],
            Duration::from_secs(5),
        )
        .await;

        let mut outcomes = dispatcher
            .dispatch(&EngineSelector::All, Some(Arc::clone(&image)))
            .await;
        outcomes.sort_by(|x, y| x.engine.cmp(&y.engine));

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[0].payload.as_deref(), Some(format!("a:{}", image.id).as_str()));
        assert_eq!(outcomes[1].status, "Recognition failed: b rejected");
        assert!(outcomes[1].elapsed.is_some());
        assert!(outcomes[2].is_success());
    }

    #[tokio::test]
    async fn named_selector_runs_one_engine() {
        let (_dir, dispatcher, image) = setup(
            vec![worker("a", 0, false), worker("b", 0, false)],
            Duration::from_secs(5),
        )
        .await;

        let outcomes = dispatcher
            .dispatch(&EngineSelector::parse(Some("b")), Some(image))
            .await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].engine, "b");
    }

    #[tokio::test]
    async fn unknown_engine_and_missing_image_yield_nothing() {
        let (_dir, dispatcher, image) =
            setup(vec![worker("a", 0, false)], Duration::from_secs(5)).await;

        assert!(dispatcher
            .dispatch(&EngineSelector::parse(Some("nope")), Some(image))
            .await
            .is_empty());
        assert!(dispatcher.dispatch(&EngineSelector::All, None).await.is_empty());

        let empty = Arc::new(Image::new("a1b2c3d4e5".into(), None, None).with_bytes(Vec::new()));
        assert!(dispatcher
            .dispatch(&EngineSelector::All, Some(empty))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn slow_engine_times_out_without_blocking_others() {
        let (_dir, dispatcher, image) = setup(
            vec![worker("fast", 0, false), worker("slow", 5_000, false)],
            Duration::from_millis(100),
        )
        .await;

        let started = Instant::now();
        let mut outcomes = dispatcher.dispatch(&EngineSelector::All, Some(image)).await;
        assert!(started.elapsed() < Duration::from_secs(2));

        outcomes.sort_by(|x, y| x.engine.cmp(&y.engine));
        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[1].status, STATUS_TIMEOUT);
        assert!(outcomes[1].payload.is_none());
        assert!(outcomes[1].elapsed.unwrap() >= 0.1);
    }

    #[tokio::test]
    async fn missing_blob_reports_not_found() {
        let (_dir, dispatcher, _image) =
            setup(vec![worker("a", 0, false)], Duration::from_secs(5)).await;
        let ghost = Arc::new(Image::new("deadbeef00".into(), None, None));

        let outcomes = dispatcher.dispatch(&EngineSelector::All, Some(ghost)).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, "Image deadbeef00 not found!");
        assert!(outcomes[0].elapsed.is_none());
    }

    #[tokio::test]
    async fn panicking_engine_is_reported_as_failed() {
        let (_dir, dispatcher, image) = setup(
            vec![worker("a", 0, false), Arc::new(Panicking) as Arc<dyn RecognitionWorker>],
            Duration::from_secs(5),
        )
        .await;

        let mut outcomes = dispatcher.dispatch(&EngineSelector::All, Some(image)).await;
        outcomes.sort_by(|x, y| x.engine.cmp(&y.engine));

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[1].engine, "panicky");
        assert!(outcomes[1].status.starts_with("worker failed: "));
        assert!(outcomes[1].payload.is_none());
    }
}

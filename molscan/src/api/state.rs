use std::sync::Arc;
use std::time::Duration;

use crate::codec::{ImageCodec, ImageFetcher};
use crate::config::Config;
use crate::engines::EngineRegistry;
use crate::error::Result;
use crate::recognition::{Dispatcher, RecognitionService, RequestCache};
use crate::storage::ContentStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: ContentStore,
    pub registry: EngineRegistry,
    pub recognition: RecognitionService,
}

impl AppState {
    pub fn new(config: Config, store: ContentStore, registry: EngineRegistry) -> Result<Self> {
        let config = Arc::new(config);

        let fetcher = ImageFetcher::new(config.fetch.timeout_secs)?;
        let codec = ImageCodec::new(store.clone(), fetcher, config.server.max_upload_bytes);
        let dispatcher = Dispatcher::new(
            registry.clone(),
            store.clone(),
            Duration::from_secs(config.recognition.timeout_secs),
        );
        let cache = RequestCache::new(config.recognition.cache_size);
        let recognition = RecognitionService::new(codec, dispatcher, cache);

        Ok(Self {
            config,
            store,
            registry,
            recognition,
        })
    }
}

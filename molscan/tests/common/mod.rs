// Common test utilities for integration tests
#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use async_trait::async_trait;
use molscan::config::{Config, FetchConfig, RecognitionConfig, ServerConfig, StorageConfig};
use molscan::engines::RecognitionWorker;
use molscan::error::{MolscanError, Result};
use molscan::models::Image;

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

// Re-export commonly used crates for convenience
pub use tempfile;
pub use wiremock;

/// A 1x1 transparent PNG.
pub const PNG_1X1: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

pub fn test_config(work_dir: &Path) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_upload_bytes: 1024 * 1024,
        },
        storage: StorageConfig {
            work_dir: work_dir.to_path_buf(),
        },
        fetch: FetchConfig { timeout_secs: 5 },
        recognition: RecognitionConfig {
            timeout_secs: 5,
            cache_size: 64,
            engines: Vec::new(),
        },
    }
}

/// Scripted engine: sleeps, counts its calls, then succeeds or fails.
pub struct FakeWorker {
    name: String,
    delay: Duration,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl FakeWorker {
    pub fn ok(name: &str) -> Self {
        Self {
            name: name.to_string(),
            delay: Duration::ZERO,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::ok(name)
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn counted(mut self, calls: Arc<AtomicUsize>) -> Self {
        self.calls = calls;
        self
    }

    pub fn shared(self) -> Arc<dyn RecognitionWorker> {
        Arc::new(self)
    }
}

#[async_trait]
impl RecognitionWorker for FakeWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recognize_blob(&self, image: &Image, _blob: &Path) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail {
            Err(MolscanError::Engine(format!("{} could not parse image", self.name)))
        } else {
            Ok(format!("{}:{}", self.name, image.id))
        }
    }
}

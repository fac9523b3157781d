use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use tracing::debug;

use crate::engines::EngineSelector;
use crate::error::{MolscanError, Result};
use crate::models::RecognitionResponse;

/// One computation, shared by every caller of its key.
type Flight = Shared<BoxFuture<'static, Result<Arc<RecognitionResponse>>>>;

/// Single-flight get-or-compute cache of recognition responses.
///
/// Keys are `selector/contentHash`. The first caller for a key spawns the
/// computation; callers arriving while it is pending wait for and share its
/// result. The computation runs as its own task, so a caller that goes away
/// only stops waiting and later callers join the same run. Failed
/// computations are not cached, the next caller retries.
///
/// The cache is LRU-bounded, but a slot whose computation is still pending
/// is never evicted: the capacity grows instead, so no key can ever have two
/// computations in flight.
#[derive(Clone)]
pub struct RequestCache {
    slots: Arc<Mutex<LruCache<String, Flight>>>,
}

impl RequestCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            slots: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    pub fn key(selector: &EngineSelector, content_hash: &str) -> String {
        format!("{}/{}", selector.as_str(), content_hash)
    }

    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<Arc<RecognitionResponse>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RecognitionResponse>> + Send + 'static,
    {
        let flight = self.flight(key, compute);
        let result = flight.clone().await;
        if result.is_err() {
            self.forget(key, &flight);
        }
        result
    }

    /// Cached value for `key`, if computed.
    pub fn get(&self, key: &str) -> Option<Arc<RecognitionResponse>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .get(key)
            .and_then(|flight| flight.peek())
            .and_then(|result| result.as_ref().ok().cloned())
    }

    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The flight for `key`, spawning `compute` if there is none.
    fn flight<F, Fut>(&self, key: &str, compute: F) -> Flight
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RecognitionResponse>> + Send + 'static,
    {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(flight) = slots.get(key) {
            if flight.peek().is_some() {
                debug!(key = %key, "Cache hit");
            } else {
                debug!(key = %key, "Joining pending computation");
            }
            return flight.clone();
        }

        debug!(key = %key, "Cache missed");
        make_room(&mut slots);
        let task = tokio::spawn(compute());
        let flight = async move {
            match task.await {
                Ok(result) => result.map(Arc::new),
                Err(e) => Err(MolscanError::Internal(format!(
                    "Recognition task failed: {e}"
                ))),
            }
        }
        .boxed()
        .shared();
        slots.put(key.to_string(), flight.clone());
        flight
    }

    /// Drop a failed flight, unless a newer one already took its key.
    fn forget(&self, key: &str, flight: &Flight) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.peek(key).is_some_and(|current| current.ptr_eq(flight)) {
            slots.pop(key);
        }
    }
}

/// Evict the least recently used settled slot, or grow.
fn make_room(slots: &mut LruCache<String, Flight>) {
    if slots.len() < slots.cap().get() {
        return;
    }

    let evictable = slots
        .iter()
        .rev()
        .find(|(_, flight)| flight.peek().is_some())
        .map(|(key, _)| key.clone());

    match evictable {
        Some(key) => {
            slots.pop(&key);
        }
        None => {
            let grown = slots.cap().saturating_add(1);
            slots.resize(grown);
        }
    }
}

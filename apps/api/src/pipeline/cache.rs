//! Content-addressed result cache with one in-flight computation per key.
//!
//! Concurrent requests for the same key share a `tokio::sync::OnceCell`: the
//! first caller computes, the rest await its result. A failed computation
//! leaves the cell empty so the next caller retries. Entries are evicted in
//! insertion order once `capacity` is reached; capacity 0 disables caching.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::canonical::CanonicalResume;

type Slot<V> = Arc<OnceCell<Arc<V>>>;

struct Slots<V> {
    cells: HashMap<String, Slot<V>>,
    order: VecDeque<String>,
}

pub struct SingleFlightCache<V> {
    capacity: usize,
    slots: Mutex<Slots<V>>,
}

impl<V> SingleFlightCache<V> {
    pub fn new(capacity: usize) -> Self {
        SingleFlightCache {
            capacity,
            slots: Mutex::new(Slots {
                cells: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Number of keys currently held, computed or in flight.
    pub fn len(&self) -> usize {
        self.lock().cells.len()
    }

    /// Returns the cached value for `key`, or runs `init` exactly once across
    /// all concurrent callers and caches its success.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: &str, init: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if self.capacity == 0 {
            return init().await.map(Arc::new);
        }

        let cell = self.slot(key);
        if let Some(value) = cell.get() {
            debug!(key, "Cache hit");
            return Ok(Arc::clone(value));
        }

        cell.get_or_try_init(|| async { init().await.map(Arc::new) })
            .await
            .map(Arc::clone)
    }

    /// The cell for `key`, created (and the oldest key evicted) if absent.
    /// The lock is never held across an await.
    fn slot(&self, key: &str) -> Slot<V> {
        let mut slots = self.lock();
        if let Some(cell) = slots.cells.get(key) {
            return Arc::clone(cell);
        }

        while slots.cells.len() >= self.capacity {
            let Some(oldest) = slots.order.pop_front() else {
                break;
            };
            slots.cells.remove(&oldest);
            debug!(key = %oldest, "Cache entry evicted");
        }

        let cell: Slot<V> = Arc::new(OnceCell::new());
        slots.cells.insert(key.to_string(), Arc::clone(&cell));
        slots.order.push_back(key.to_string());
        cell
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slots<V>> {
        // No invariant spans a panic here; a poisoned map is still usable.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// SHA-256 over the canonical record, the job description, and the rewrite
/// source fingerprint. Parts are length-prefixed so they cannot run together.
pub fn cache_key(canonical: &CanonicalResume, job_description: &str, fingerprint: &str) -> String {
    let record = serde_json::to_string(canonical).unwrap_or_default();
    let mut hasher = Sha256::new();
    for part in [record.as_str(), job_description, fingerprint] {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

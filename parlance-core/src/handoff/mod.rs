//! Audio hand-off store.
//!
//! A client uploads a large base64 payload once, receives an opaque id, and
//! references that id in a later request. Entries are read at most once:
//! `consume` removes the entry in the same critical section that reads it,
//! so two concurrent consumers can never both receive the payload.
//!
//! Unconsumed entries expire after a TTL and the store holds at most
//! `capacity` entries (oldest evicted first).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Contract for hand-off storage backends.
pub trait HandoffStore: Send + Sync + 'static {
    /// Store `payload` (trimmed) and return a fresh opaque id.
    fn store(&self, payload: &str) -> String;

    /// Remove and return the payload for `id`, exactly as stored (trimmed,
    /// possibly empty). Unknown, expired, or already-consumed ids yield
    /// `None`.
    fn consume(&self, id: &str) -> Option<String>;

    /// Number of live entries (expired entries may still be counted until
    /// the next purge).
    fn len(&self) -> usize;

    /// Drop expired entries. Returns how many were removed.
    fn purge_expired(&self) -> usize {
        0
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared, injectable hand-off store.
pub type SharedHandoffStore = Arc<dyn HandoffStore>;

#[derive(Debug, Clone, Copy)]
pub struct HandoffConfig {
    /// How long an unconsumed entry stays readable. Default: 10 minutes.
    pub ttl: Duration,
    /// Maximum number of live entries. Default: 256.
    pub capacity: usize,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
            capacity: 256,
        }
    }
}

#[derive(Debug)]
struct Entry {
    payload: String,
    stored_at: Instant,
}

/// In-process hand-off store backed by a `parking_lot::Mutex<HashMap>`.
#[derive(Debug)]
pub struct MemoryHandoffStore {
    config: HandoffConfig,
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryHandoffStore {
    pub fn new(config: HandoffConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            config: HandoffConfig { capacity, ..config },
            entries: Mutex::new(HashMap::with_capacity(capacity.min(1024))),
        }
    }

    pub fn shared(config: HandoffConfig) -> SharedHandoffStore {
        Arc::new(Self::new(config))
    }

    pub fn config(&self) -> HandoffConfig {
        self.config
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let ttl = self.config.ttl;
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| now.saturating_duration_since(e.stored_at) < ttl);
        before - entries.len()
    }

    fn store_at(&self, payload: &str, now: Instant) -> String {
        let id = Uuid::new_v4().to_string();
        let ttl = self.config.ttl;
        let mut entries = self.entries.lock();

        if entries.len() >= self.config.capacity {
            entries.retain(|_, e| now.saturating_duration_since(e.stored_at) < ttl);
        }
        while entries.len() >= self.config.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.stored_at)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(key) => {
                    entries.remove(&key);
                    debug!(evicted = %key, "hand-off store full, evicted oldest entry");
                }
                None => break,
            }
        }

        entries.insert(
            id.clone(),
            Entry {
                payload: payload.trim().to_string(),
                stored_at: now,
            },
        );
        id
    }

    fn consume_at(&self, id: &str, now: Instant) -> Option<String> {
        let entry = self.entries.lock().remove(id)?;
        if now.saturating_duration_since(entry.stored_at) >= self.config.ttl {
            debug!(id, "hand-off entry expired before consumption");
            return None;
        }
        Some(entry.payload)
    }
}

impl Default for MemoryHandoffStore {
    fn default() -> Self {
        Self::new(HandoffConfig::default())
    }
}

impl HandoffStore for MemoryHandoffStore {
    fn store(&self, payload: &str) -> String {
        self.store_at(payload, Instant::now())
    }

    fn consume(&self, id: &str) -> Option<String> {
        self.consume_at(id, Instant::now())
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }
}

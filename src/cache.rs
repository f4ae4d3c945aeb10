//! Local memoization of evaluation results.
//!
//! The facade depends only on the [`EvalCache`] capability; [`TtlCache`] is
//! the real store and [`NoopCache`] stands in when caching is disabled, so
//! the evaluation path never branches on an optional cache.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::models::EvalResult;

/// Default expiry window for cached evaluation results.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(60_000);

/// A key-value store for evaluation results.
///
/// Values are owned copies in both directions: `put` stores a clone and `get`
/// hands one out, so cached results never alias caller-supplied data.
pub trait EvalCache: Send + Sync {
    /// Return the cached result for `key` if present and not expired.
    fn get(&self, key: &str) -> Option<EvalResult>;
    /// Store `result` under `key`, resetting its expiry.
    fn put(&self, key: &str, result: EvalResult);
    /// Drop the entry for `key`, if any. The evaluation path never calls
    /// this; it is the hook for future flag-change notifications.
    fn invalidate(&self, key: &str);
}

struct Entry {
    result: EvalResult,
    expires_at: Instant,
}

/// An in-memory [`EvalCache`] with write-time expiry.
///
/// Expired entries are dropped lazily when read; the store has no size cap,
/// so a high-cardinality key space grows it without bound until entries are
/// read past expiry or invalidated.
pub struct TtlCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl TtlCache {
    /// Create a cache with the default 60 second TTL.
    pub fn new() -> Self {
        TtlCache::with_ttl(DEFAULT_CACHE_TTL)
    }

    /// Create a cache whose entries expire `ttl` after each write.
    pub fn with_ttl(ttl: Duration) -> Self {
        TtlCache {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        TtlCache::new()
    }
}

impl EvalCache for TtlCache {
    fn get(&self, key: &str) -> Option<EvalResult> {
        // .lock() fails only if the mutex is poisoned (a thread panicked
        // while holding it), which should never happen. Using .ok()? to not
        // crash the app.
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.result.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, result: EvalResult) {
        let entry = Entry {
            result,
            expires_at: Instant::now() + self.ttl,
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_owned(), entry);
        }
    }

    fn invalidate(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

/// An [`EvalCache`] that remembers nothing.
pub struct NoopCache;

impl EvalCache for NoopCache {
    fn get(&self, _key: &str) -> Option<EvalResult> {
        None
    }

    fn put(&self, _key: &str, _result: EvalResult) {}

    fn invalidate(&self, _key: &str) {}
}

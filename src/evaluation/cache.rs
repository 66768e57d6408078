use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default time-to-live when configuration does not provide one.
pub const DEFAULT_TTL_MILLIS: i64 = 5 * 60 * 1000;

/// Writes between sweeps of expired entries.
pub const SWEEP_INTERVAL: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub value: bool,
    pub computed_at_millis: i64,
}

/// Per-(flag, evaluation key) memo with lazy expiry.
///
/// Entries are grouped by flag so invalidating one flag is a single removal.
/// Expired entries are overwritten on recompute, and every
/// [`SWEEP_INTERVAL`] writes the whole map is swept so keys that never come
/// back do not accumulate.
#[derive(Debug)]
pub struct EvaluationCache {
    entries: DashMap<String, HashMap<String, CacheEntry>>,
    ttl_millis: i64,
    writes: AtomicU64,
}

impl EvaluationCache {
    /// A TTL of zero (or less) disables caching.
    pub fn new(ttl_millis: i64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_millis,
            writes: AtomicU64::new(0),
        }
    }

    pub fn get(&self, flag_key: &str, evaluation_key: &str, now_millis: i64) -> Option<bool> {
        let by_key = self.entries.get(flag_key)?;
        let entry = by_key.get(evaluation_key)?;
        (now_millis - entry.computed_at_millis < self.ttl_millis).then_some(entry.value)
    }

    pub fn put(&self, flag_key: &str, evaluation_key: &str, value: bool, now_millis: i64) {
        if self.ttl_millis <= 0 {
            return;
        }
        self.entries.entry(flag_key.to_string()).or_default().insert(
            evaluation_key.to_string(),
            CacheEntry {
                value,
                computed_at_millis: now_millis,
            },
        );

        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            let swept = self.sweep(now_millis);
            tracing::debug!(swept, "expired cache entries swept");
        }
    }

    pub fn remove(&self, flag_key: &str, evaluation_key: &str) {
        if let Some(mut by_key) = self.entries.get_mut(flag_key) {
            by_key.remove(evaluation_key);
        }
    }

    /// Drop every entry older than the TTL. Returns how many were removed.
    pub fn sweep(&self, now_millis: i64) -> usize {
        let ttl_millis = self.ttl_millis;
        let mut swept = 0;
        self.entries.retain(|_, by_key| {
            let before = by_key.len();
            by_key.retain(|_, entry| now_millis - entry.computed_at_millis < ttl_millis);
            swept += before - by_key.len();
            !by_key.is_empty()
        });
        swept
    }

    /// Drop entries for one flag, or everything when `flag_key` is `None`.
    pub fn invalidate(&self, flag_key: Option<&str>) {
        match flag_key {
            Some(key) => {
                self.entries.remove(key);
            }
            None => self.entries.clear(),
        }
    }

    /// Stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|by_key| by_key.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EvaluationCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_MILLIS)
    }
}

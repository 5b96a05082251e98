// src/ingest/cache.rs
//! Process-wide trend cache with an absolute TTL (no sliding refresh).
//!
//! Only the aggregator writes it; readers get cloned snapshots. The refresh gate lets
//! concurrent cache-miss callers coalesce onto one in-flight source fan-out.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::ingest::types::TopicCandidate;

#[derive(Debug, Clone)]
pub struct CachedTrends {
    pub candidates: Vec<TopicCandidate>,
    pub region: String,
    pub fetched_at: DateTime<Utc>,
    stored_at: Instant,
}

impl CachedTrends {
    pub fn age(&self) -> Duration {
        self.stored_at.elapsed()
    }

    pub fn age_minutes(&self) -> u64 {
        self.age().as_secs() / 60
    }
}

/// Result of a cache read: the snapshot (if any) and whether it is still within TTL.
#[derive(Debug, Clone)]
pub struct CacheRead {
    pub snapshot: Option<CachedTrends>,
    pub fresh: bool,
}

impl CacheRead {
    /// Fresh snapshot for `region`, if there is one.
    pub fn fresh_for(self, region: &str) -> Option<CachedTrends> {
        match self.snapshot {
            Some(s) if self.fresh && s.region.eq_ignore_ascii_case(region) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct TrendCache {
    ttl: Duration,
    inner: RwLock<Option<CachedTrends>>,
    refresh_gate: tokio::sync::Mutex<()>,
}

impl TrendCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: RwLock::new(None),
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self) -> CacheRead {
        let guard = self.inner.read().unwrap_or_else(|p| p.into_inner());
        let snapshot = guard.clone();
        let fresh = snapshot
            .as_ref()
            .map(|s| s.age() < self.ttl)
            .unwrap_or(false);
        CacheRead { snapshot, fresh }
    }

    pub fn set(&self, candidates: Vec<TopicCandidate>, region: &str) {
        let entry = CachedTrends {
            candidates,
            region: region.to_ascii_uppercase(),
            fetched_at: Utc::now(),
            stored_at: Instant::now(),
        };
        let mut guard = self.inner.write().unwrap_or_else(|p| p.into_inner());
        *guard = Some(entry);
    }

    pub fn clear(&self) {
        let mut guard = self.inner.write().unwrap_or_else(|p| p.into_inner());
        *guard = None;
    }

    /// Serializes refreshes. Holders must re-check `get()` after acquiring.
    pub(crate) async fn refresh_guard(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.refresh_gate.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cache_is_not_fresh() {
        let c = TrendCache::new(Duration::from_secs(60));
        let read = c.get();
        assert!(read.snapshot.is_none());
        assert!(!read.fresh);
    }

    #[test]
    fn set_then_clear() {
        let c = TrendCache::new(Duration::from_secs(60));
        c.set(Vec::new(), "us");
        assert!(c.get().fresh_for("US").is_some());
        assert!(c.get().fresh_for("GB").is_none());
        c.clear();
        assert!(c.get().snapshot.is_none());
    }

    #[test]
    fn zero_ttl_is_always_stale() {
        let c = TrendCache::new(Duration::ZERO);
        c.set(Vec::new(), "US");
        let read = c.get();
        assert!(read.snapshot.is_some());
        assert!(!read.fresh);
    }
}

//! Master-key cache: an explicit, injectable component.
//!
//! The unsealed System Master Key is the only state shared across
//! operations. The cache holds an immutable snapshot behind an
//! `RwLock<Arc<..>>`, replaced atomically on refresh, so concurrent
//! readers never observe a partially written key. `invalidate` is the
//! hook for upstream key rotation.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::MasterKey;

/// Cache of the unsealed System Master Key.
///
/// Implementations must support safe concurrent reads. Tests substitute
/// [`NoCache`] to force a provider fetch on every operation.
pub trait MasterKeyCache: Send + Sync {
    /// Returns the cached snapshot, if present and fresh.
    fn get(&self) -> Option<Arc<MasterKey>>;

    /// Replaces the snapshot with newly fetched material.
    fn refresh(&self, key: MasterKey) -> Arc<MasterKey>;

    /// Drops the snapshot (upstream rotation, shutdown).
    fn invalidate(&self);
}

// ============================================================================
// TTL cache
// ============================================================================

struct CachedEntry {
    fetched_at: Instant,
    key: Arc<MasterKey>,
}

/// TTL-bounded master-key cache.
///
/// A stale entry is treated as a miss; the caller refetches and calls
/// [`MasterKeyCache::refresh`].
pub struct TtlMasterKeyCache {
    ttl: Duration,
    slot: RwLock<Option<CachedEntry>>,
}

impl TtlMasterKeyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }
}

impl MasterKeyCache for TtlMasterKeyCache {
    fn get(&self) -> Option<Arc<MasterKey>> {
        let slot = self.slot.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        match slot.as_ref() {
            Some(entry) if entry.fetched_at.elapsed() < self.ttl => Some(Arc::clone(&entry.key)),
            _ => None,
        }
    }

    fn refresh(&self, key: MasterKey) -> Arc<MasterKey> {
        let key = Arc::new(key);
        let mut slot = self.slot.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = Some(CachedEntry {
            fetched_at: Instant::now(),
            key: Arc::clone(&key),
        });
        tracing::debug!("master key cache refreshed");
        key
    }

    fn invalidate(&self) {
        let mut slot = self.slot.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = None;
        tracing::debug!("master key cache invalidated");
    }
}

// ============================================================================
// No-op cache
// ============================================================================

/// Always-miss cache: every operation refetches from the provider.
pub struct NoCache;

impl MasterKeyCache for NoCache {
    fn get(&self) -> Option<Arc<MasterKey>> {
        None
    }

    fn refresh(&self, key: MasterKey) -> Arc<MasterKey> {
        Arc::new(key)
    }

    fn invalidate(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_cache_hit_after_refresh() {
        let cache = TtlMasterKeyCache::new(Duration::from_secs(60));
        assert!(cache.get().is_none());

        let key = cache.refresh(MasterKey::from_bytes([1u8; 32]));
        let hit = cache.get().expect("fresh entry must hit");
        assert_eq!(hit.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_ttl_cache_expires() {
        let cache = TtlMasterKeyCache::new(Duration::ZERO);
        cache.refresh(MasterKey::from_bytes([1u8; 32]));
        assert!(cache.get().is_none(), "zero TTL must always miss");
    }

    #[test]
    fn test_invalidate_drops_entry() {
        let cache = TtlMasterKeyCache::new(Duration::from_secs(60));
        cache.refresh(MasterKey::from_bytes([1u8; 32]));
        cache.invalidate();
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_refresh_replaces_snapshot() {
        let cache = TtlMasterKeyCache::new(Duration::from_secs(60));
        cache.refresh(MasterKey::from_bytes([1u8; 32]));
        cache.refresh(MasterKey::from_bytes([2u8; 32]));

        let hit = cache.get().expect("must hit");
        assert_eq!(hit.as_bytes(), &[2u8; 32]);
    }

    #[test]
    fn test_no_cache_always_misses() {
        let cache = NoCache;
        cache.refresh(MasterKey::from_bytes([1u8; 32]));
        assert!(cache.get().is_none());
    }
}

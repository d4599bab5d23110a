//! Last served view per identity, using moka
//!
//! A view cache only: bounded and expiring, never read as a source of
//! truth. Success floors are kept separately by the orchestrator.

use moka::future::Cache;
use quest_types::{Address, UserStats};
use std::time::Duration;

/// Reconciled-view cache keyed by identity
#[derive(Debug, Clone)]
pub struct StatsCache {
    inner: Cache<Address, UserStats>,
}

impl StatsCache {
    /// Create new cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_identities: u64) -> Self {
        Self {
            inner: Cache::new(max_identities),
        }
    }

    /// Create cache with time-based expiration
    #[inline]
    #[must_use]
    pub fn with_ttl(max_identities: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_identities)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Record the view served to `identity`
    #[inline]
    pub async fn insert(&self, identity: Address, stats: UserStats) {
        self.inner.insert(identity, stats).await;
    }

    /// Last view served to `identity`
    #[inline]
    pub async fn get(&self, identity: &Address) -> Option<UserStats> {
        self.inner.get(identity).await
    }

    /// Forget `identity`
    #[inline]
    pub async fn invalidate(&self, identity: &Address) {
        self.inner.invalidate(identity).await;
    }

    /// Number of cached views
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for StatsCache {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address::new([0xa1; 20]);

    #[tokio::test]
    async fn insert_get_invalidate() {
        let cache = StatsCache::new(8);
        assert!(cache.get(&ALICE).await.is_none());

        let stats = UserStats {
            tasks_completed: 4,
            streak: 2,
            balance: 60,
            weekly_goals: 1,
        };
        cache.insert(ALICE, stats).await;
        assert_eq!(cache.get(&ALICE).await, Some(stats));

        cache.invalidate(&ALICE).await;
        assert!(cache.get(&ALICE).await.is_none());
    }

    #[tokio::test]
    async fn entries_expire() {
        let cache = StatsCache::with_ttl(8, Duration::from_millis(20));
        cache.insert(ALICE, UserStats::default()).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.get(&ALICE).await.is_none());
    }
}

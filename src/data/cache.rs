//! In-memory repository-list cache
//!
//! Volatile and cleared on restart. Uses Moka for concurrent access;
//! the original single-threaded runtime got its atomic get/set for
//! free, here the cache provides the synchronization explicitly.
//!
//! Entries are keyed by session id. The upstream version of this app
//! cached under one fixed key, which let concurrent users observe
//! each other's repository lists; per-session keying fixes that at
//! the cost of a guaranteed miss after every fresh login.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::github::Repo;

/// TTL-bounded cache of fetched repository lists
///
/// Invalidated only by TTL expiry, never on logout or token change.
pub struct RepoListCache {
    /// Session id -> repository list
    entries: Cache<String, Arc<Vec<Repo>>>,
}

impl RepoListCache {
    /// Create a repository cache
    ///
    /// # Arguments
    /// * `ttl_secs` - entry lifetime in seconds
    pub fn new(ttl_secs: u64) -> Self {
        let entries = Cache::builder()
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { entries }
    }

    /// Get the cached list for a session, if still fresh
    pub async fn get(&self, session_id: &str) -> Option<Arc<Vec<Repo>>> {
        self.entries.get(session_id).await
    }

    /// Cache a fetched list for a session
    pub async fn insert(&self, session_id: &str, repos: Arc<Vec<Repo>>) {
        self.entries.insert(session_id.to_string(), repos).await;
    }

    /// Drop the entry for a session
    pub async fn remove(&self, session_id: &str) {
        self.entries.invalidate(session_id).await;
    }

    /// Run pending expirations; called by the background sweep task
    pub async fn sweep(&self) {
        self.entries.run_pending_tasks().await;
    }

    /// Number of live entries (post-sweep)
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_repos() -> Arc<Vec<Repo>> {
        Arc::new(vec![Repo {
            name: "demo".to_string(),
            full_name: "user/demo".to_string(),
            html_url: "https://github.com/user/demo".to_string(),
            description: Some("A demo repository".to_string()),
            private: false,
        }])
    }

    #[tokio::test]
    async fn get_returns_inserted_list_for_same_session() {
        let cache = RepoListCache::new(100);
        cache.insert("session-a", sample_repos()).await;

        let cached = cache.get("session-a").await.expect("cache hit");
        assert_eq!(cached[0].full_name, "user/demo");
    }

    #[tokio::test]
    async fn sessions_do_not_share_entries() {
        let cache = RepoListCache::new(100);
        cache.insert("session-a", sample_repos()).await;

        assert!(cache.get("session-b").await.is_none());
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = RepoListCache::new(1);
        cache.insert("session-a", sample_repos()).await;
        assert!(cache.get("session-a").await.is_some());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(cache.get("session-a").await.is_none());
    }

    #[tokio::test]
    async fn sweep_collects_expired_entries() {
        let cache = RepoListCache::new(1);
        cache.insert("session-a", sample_repos()).await;

        tokio::time::sleep(Duration::from_millis(1100)).await;
        cache.sweep().await;
        assert!(cache.is_empty());
    }
}

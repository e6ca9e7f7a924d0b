//! Memoized home-feed responses.
//!
//! Entries expire on their TTL only. Writes never invalidate them, so a new
//! post shows up on the home feed once the entry lapses or [`PageCache::clear`]
//! runs.

use std::sync::Arc;
use std::time::Duration;

use quill_core::ports::{Cache, CacheError};

/// Prefix of every cached home-feed key.
pub const INDEX_PREFIX: &str = "index_page:";

#[derive(Clone)]
pub struct PageCache {
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl PageCache {
    pub fn new(cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Key for a request target, so `/?page=2` and `/` are cached apart.
    pub fn key(path_and_query: &str) -> String {
        format!("{INDEX_PREFIX}{path_and_query}")
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).await
    }

    /// Store a rendered body. A backend failure is logged and otherwise
    /// ignored; the page was already rendered.
    pub async fn store(&self, key: &str, body: &str) {
        if let Err(e) = self.cache.set(key, body, Some(self.ttl)).await {
            tracing::warn!(key = %key, error = %e, "Failed to cache home feed page");
        }
    }

    /// Drop every cached home-feed page.
    pub async fn clear(&self) -> Result<u64, CacheError> {
        let removed = self.cache.delete_prefix(INDEX_PREFIX).await?;
        tracing::debug!(removed, "Home feed cache cleared");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_infra::InMemoryCache;

    fn page_cache(ttl: Duration) -> (Arc<InMemoryCache>, PageCache) {
        let cache = Arc::new(InMemoryCache::new());
        (cache.clone(), PageCache::new(cache, ttl))
    }

    #[test]
    fn test_key_keeps_query() {
        assert_eq!(PageCache::key("/?page=2"), "index_page:/?page=2");
        assert_ne!(PageCache::key("/"), PageCache::key("/?page=2"));
    }

    #[tokio::test]
    async fn test_store_then_get() {
        let (_, pages) = page_cache(Duration::from_secs(20));

        pages.store("index_page:/", "{}").await;

        assert_eq!(pages.get("index_page:/").await.as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_entry_expires() {
        let (_, pages) = page_cache(Duration::from_millis(20));

        pages.store("index_page:/", "{}").await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(pages.get("index_page:/").await, None);
    }

    #[tokio::test]
    async fn test_clear_leaves_other_keys() {
        let (cache, pages) = page_cache(Duration::from_secs(20));

        pages.store("index_page:/", "a").await;
        pages.store("index_page:/?page=2", "b").await;
        cache.set("session:1", "c", None).await.unwrap();

        assert_eq!(pages.clear().await.unwrap(), 2);
        assert_eq!(pages.get("index_page:/").await, None);
        assert_eq!(cache.get("session:1").await.as_deref(), Some("c"));
    }
}

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::CacheError;

#[derive(Debug)]
struct CachedEntry {
    value_json: String,
    expires_at: Instant,
}

impl CachedEntry {
    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// In-memory read cache for query results, backed by moka.
///
/// Values are stored as JSON so one cache can hold results of any record type.
/// Each entry carries its own time-to-live; `max_ttl` is the hard upper bound
/// enforced by moka itself.
///
/// Keys follow `<table>:<fingerprint>` so writers can drop every cached read of a
/// table with [`QueryCache::invalidate_prefix`].
pub struct QueryCache {
    inner: Cache<String, Arc<CachedEntry>>,
}

impl QueryCache {
    pub fn new(max_capacity: u64, max_ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(max_ttl)
                .build(),
        }
    }

    /// Get a live typed value. Expired entries are dropped and reported as misses.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let Some(entry) = self.inner.get(key).await else {
            return Ok(None);
        };
        if !entry.is_live() {
            self.inner.invalidate(key).await;
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&entry.value_json)?))
    }

    pub async fn insert<T: Serialize>(
        &self,
        key: String,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let entry = CachedEntry {
            value_json: serde_json::to_string(value)?,
            expires_at: Instant::now() + ttl,
        };
        self.inner.insert(key, Arc::new(entry)).await;
        Ok(())
    }

    /// Return the cached value for `key`, or run `fetch`, cache its result for `ttl`
    /// and return it. Fetch errors are passed through and nothing is cached.
    pub async fn get_or_fetch<T, F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CacheError>,
    {
        if let Some(hit) = self.get::<T>(key).await? {
            debug!(key, "cache hit");
            return Ok(hit);
        }

        debug!(key, "cache miss");
        let value = fetch().await?;
        self.insert(key.to_string(), &value, ttl).await?;
        Ok(value)
    }

    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    /// Drop every entry whose key starts with `prefix`. Returns how many were dropped.
    ///
    /// Completes before returning, so a read issued afterwards never sees a dropped entry.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let keys: Vec<Arc<String>> = self
            .inner
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key)
            .collect();

        for key in &keys {
            self.inner.invalidate(key.as_str()).await;
        }
        debug!(prefix, dropped = keys.len(), "cache prefix invalidated");
        keys.len()
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache() -> QueryCache {
        QueryCache::new(100, Duration::from_secs(600))
    }

    #[tokio::test]
    async fn insert_and_get() {
        let cache = cache();
        cache
            .insert("countries:{}".to_string(), &vec!["Brasil"], Duration::from_secs(60))
            .await
            .unwrap();

        let result: Option<Vec<String>> = cache.get("countries:{}").await.unwrap();
        assert_eq!(result, Some(vec!["Brasil".to_string()]));
    }

    #[tokio::test]
    async fn get_missing() {
        let cache = cache();
        let result: Option<String> = cache.get("nonexistent").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn get_or_fetch_calls_fetch_once() {
        let cache = cache();
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        for _ in 0..3 {
            let value: u32 = cache
                .get_or_fetch("themes:{}", Duration::from_secs(60), move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, CacheError>(42)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_error_is_not_cached() {
        #[derive(Debug)]
        enum FetchError {
            Down,
            Cache,
        }
        impl From<CacheError> for FetchError {
            fn from(_: CacheError) -> Self {
                FetchError::Cache
            }
        }

        let cache = cache();
        let failed: Result<u32, FetchError> = cache
            .get_or_fetch("themes:{}", Duration::from_secs(60), || async {
                Err(FetchError::Down)
            })
            .await;
        assert!(matches!(failed, Err(FetchError::Down)));

        let value: Option<u32> = cache.get("themes:{}").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn per_entry_ttl_expiration() {
        let cache = cache();
        cache
            .insert("alerts:{}".to_string(), &1u8, Duration::from_millis(50))
            .await
            .unwrap();

        assert!(cache.get::<u8>("alerts:{}").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.get::<u8>("alerts:{}").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalidate_prefix_only_drops_matching_table() {
        let cache = cache();
        let ttl = Duration::from_secs(60);
        cache.insert("analyses:a".to_string(), &1u8, ttl).await.unwrap();
        cache.insert("analyses:b".to_string(), &2u8, ttl).await.unwrap();
        cache.insert("asset_classes:a".to_string(), &3u8, ttl).await.unwrap();

        let dropped = cache.invalidate_prefix("analyses:").await;
        assert_eq!(dropped, 2);

        assert!(cache.get::<u8>("analyses:a").await.unwrap().is_none());
        assert!(cache.get::<u8>("analyses:b").await.unwrap().is_none());
        assert_eq!(cache.get::<u8>("asset_classes:a").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn invalidate_single_key() {
        let cache = cache();
        cache
            .insert("managers:{}".to_string(), &"BlackRock", Duration::from_secs(60))
            .await
            .unwrap();
        cache.invalidate("managers:{}").await;

        assert!(cache.get::<String>("managers:{}").await.unwrap().is_none());
    }
}

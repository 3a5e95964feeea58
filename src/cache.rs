use tracing::{debug, warn};

use crate::story::Story;
use crate::store::{KeyValueStore, StoreError};

pub const STORIES_KEY: &str = "stories";
const PROBE_KEY: &str = "__storage_test__";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("cached story list is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Holds the latest normalized story list, and nothing else.
pub struct OfflineCache<K> {
    store: K,
}

impl<K: KeyValueStore> OfflineCache<K> {
    pub fn new(store: K) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    /// Write then delete a sentinel key. Any failure means the store is unusable.
    pub async fn probe(&self) -> bool {
        let result = async {
            self.store.set_item(PROBE_KEY, PROBE_KEY).await?;
            self.store.remove_item(PROBE_KEY).await
        }
        .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                debug!("Storage probe failed: {}", e);
                false
            }
        }
    }

    pub async fn read(&self) -> Result<Option<Vec<Story>>, CacheError> {
        let Some(raw) = self.store.get_item(STORIES_KEY).await? else {
            return Ok(None);
        };
        let stories = serde_json::from_str(&raw)?;
        Ok(Some(stories))
    }

    /// Like [`read`](Self::read), but treats any failure as an empty cache.
    pub async fn read_or_none(&self) -> Option<Vec<Story>> {
        match self.read().await {
            Ok(stories) => stories,
            Err(e) => {
                warn!("Ignoring unreadable story cache: {}", e);
                None
            }
        }
    }

    pub async fn write(&self, stories: &[Story]) -> Result<(), CacheError> {
        let raw = serde_json::to_string(stories)?;
        self.store.set_item(STORIES_KEY, &raw).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SqliteStore, StorageKind};

    fn sample() -> Vec<Story> {
        vec![
            Story::new("a", 1).with_field("title", "Alpha"),
            Story::new("b", 2).with_field("title", "Beta"),
        ]
    }

    mod probe_tests {
        use super::*;

        #[tokio::test]
        async fn test_probe_usable_store() {
            let cache = OfflineCache::new(MemoryStore::new());
            assert!(cache.probe().await);
        }

        #[tokio::test]
        async fn test_probe_leaves_no_sentinel() {
            let cache = OfflineCache::new(MemoryStore::new());
            cache.probe().await;
            assert!(cache.store().is_empty().await);
        }

        #[tokio::test]
        async fn test_probe_disabled_store() {
            let store = MemoryStore::new();
            store.set_disabled(true);
            let cache = OfflineCache::new(store);
            assert!(!cache.probe().await);
        }

        #[tokio::test]
        async fn test_probe_quota_exceeded() {
            let cache = OfflineCache::new(MemoryStore::with_quota(4));
            assert!(!cache.probe().await);
        }

        #[tokio::test]
        async fn test_probe_sqlite_store() {
            let store = SqliteStore::open(StorageKind::Session, "").await.unwrap();
            let cache = OfflineCache::new(store);
            assert!(cache.probe().await);
        }
    }

    mod read_write_tests {
        use super::*;

        #[tokio::test]
        async fn test_read_empty() {
            let cache = OfflineCache::new(MemoryStore::new());
            assert_eq!(cache.read().await.unwrap(), None);
        }

        #[tokio::test]
        async fn test_write_then_read() {
            let cache = OfflineCache::new(MemoryStore::new());
            cache.write(&sample()).await.unwrap();
            assert_eq!(cache.read().await.unwrap(), Some(sample()));
        }

        #[tokio::test]
        async fn test_write_overwrites_previous_list() {
            let cache = OfflineCache::new(MemoryStore::new());
            cache.write(&sample()).await.unwrap();

            let newer = vec![Story::new("z", 0)];
            cache.write(&newer).await.unwrap();

            assert_eq!(cache.read().await.unwrap(), Some(newer));
        }

        #[tokio::test]
        async fn test_write_uses_stories_key() {
            let cache = OfflineCache::new(MemoryStore::new());
            cache.write(&sample()).await.unwrap();

            let raw = cache.store().get_item(STORIES_KEY).await.unwrap().unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
            assert_eq!(parsed[0]["id"], "a");
            assert_eq!(parsed[1]["title"], "Beta");
        }

        #[tokio::test]
        async fn test_corrupt_value() {
            let store = MemoryStore::new();
            store.set_item(STORIES_KEY, "not json").await.unwrap();
            let cache = OfflineCache::new(store);

            assert!(matches!(cache.read().await, Err(CacheError::Corrupt(_))));
            assert_eq!(cache.read_or_none().await, None);
        }

        #[tokio::test]
        async fn test_write_to_full_store() {
            let cache = OfflineCache::new(MemoryStore::with_quota(16));
            let result = cache.write(&sample()).await;
            assert!(matches!(
                result,
                Err(CacheError::Store(StoreError::QuotaExceeded))
            ));
        }

        #[tokio::test]
        async fn test_read_from_disabled_store_is_none() {
            let store = MemoryStore::new();
            store.set_disabled(true);
            let cache = OfflineCache::new(store);
            assert_eq!(cache.read_or_none().await, None);
        }
    }
}

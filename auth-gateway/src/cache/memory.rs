use super::{CacheBackend, CacheError};
use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

#[derive(Clone)]
pub struct InMemoryCache {
    cache: MokaCache<String, String>,
}

impl InMemoryCache {
    /// Initialize a new in-memory cache bounded to `capacity_mib` of serialized values
    pub fn new(ttl_secs: u64, capacity_mib: usize) -> Result<Self, String> {
        let max_capacity_bytes: u64 = capacity_mib
            .checked_mul(1024 * 1024)
            .and_then(|bytes| u64::try_from(bytes).ok())
            .ok_or_else(|| format!("capacity of {} MiB is too large", capacity_mib))?;

        let cache = MokaCache::builder()
            .time_to_live(Duration::from_secs(ttl_secs))
            .weigher(|key: &String, value: &String| -> u32 {
                (key.len() + value.len()).try_into().unwrap_or(u32::MAX)
            })
            .max_capacity(max_capacity_bytes)
            .build();

        Ok(Self { cache })
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), CacheError> {
        let serialized = serde_json::to_string(value)?;
        self.cache.insert(key.to_string(), serialized).await;
        Ok(())
    }

    async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError> {
        match self.cache.get(key).await {
            Some(value) => serde_json::from_str(&value)
                .map_err(|e| CacheError::Deserialization(e.to_string()))
                .map(Some),
            None => Ok(None),
        }
    }

    async fn health_check(&self) -> Result<(), String> {
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.cache.invalidate(key).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_overflow_is_rejected() {
        let result = InMemoryCache::new(60, usize::MAX);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_capacity_limit() {
        let cache = InMemoryCache::new(60, 1).unwrap();

        // 300 KiB * 10 entries exceeds the 1 MiB bound
        let data = "x".repeat(1024 * 300);
        for i in 0..10 {
            cache.set(&format!("session:{}", i), &data).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }

        // let moka run its eviction maintenance
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let mut found_items = 0;
        for i in 0..10 {
            if cache
                .get::<String>(&format!("session:{}", i))
                .await
                .unwrap()
                .is_some()
            {
                found_items += 1;
            }
        }
        assert!(
            found_items < 10,
            "Expected some sessions to be evicted, but found {} items",
            found_items
        );
    }
}

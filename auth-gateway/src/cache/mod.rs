use crate::config::{SessionConfig, SessionStoreKind};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub mod memory;
pub mod redis;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to serialize value: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to parse value: {0}")]
    Deserialization(String),
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Key/value store holding JSON-serialised records with a store-wide TTL.
///
/// Session records are the only tenant; every entry expires after the
/// configured session TTL regardless of backend.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Store a value, replacing any previous value under `key`
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T)
        -> Result<(), CacheError>;

    /// Retrieve a value, `None` when absent or expired
    async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError>;

    /// Pings the backend. Returns a descriptive message when unhealthy.
    async fn health_check(&self) -> Result<(), String>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Backend selected at startup from `GAIA_SESSION_STORE`
#[derive(Clone)]
pub enum Cache {
    InMemory(memory::InMemoryCache),
    Redis(redis::RedisCache),
}

#[async_trait::async_trait]
impl CacheBackend for Cache {
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), CacheError> {
        match self {
            Self::InMemory(cache) => cache.set(key, value).await,
            Self::Redis(cache) => cache.set(key, value).await,
        }
    }

    async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError> {
        match self {
            Self::InMemory(cache) => cache.get(key).await,
            Self::Redis(cache) => cache.get(key).await,
        }
    }

    async fn health_check(&self) -> Result<(), String> {
        match self {
            Self::InMemory(cache) => cache.health_check().await,
            Self::Redis(cache) => cache.health_check().await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match self {
            Self::InMemory(cache) => cache.delete(key).await,
            Self::Redis(cache) => cache.delete(key).await,
        }
    }
}

/// Creates the session backing store described by the configuration.
pub async fn create_cache(config: &SessionConfig) -> Result<Cache, CacheError> {
    match config.store_kind().map_err(CacheError::Config)? {
        SessionStoreKind::InMemory => {
            let cache = memory::InMemoryCache::new(config.ttl, config.memory_capacity)
                .map_err(CacheError::Config)?;
            Ok(Cache::InMemory(cache))
        }
        SessionStoreKind::Redis => {
            if config.redis_url.is_empty() {
                return Err(CacheError::Config(
                    "Redis URL is required for the redis session store".to_string(),
                ));
            }
            let cache = redis::RedisCache::new(&config.redis_url, config.ttl)
                .await
                .map_err(CacheError::Config)?;
            Ok(Cache::Redis(cache))
        }
    }
}

use confique::Config;

/// Minimum length of the cookie signing secret
pub const MIN_SESSION_KEY_LEN: usize = 32;

/// Specifies which backing store holds session records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStoreKind {
    InMemory,
    Redis,
}

/// Configuration for the session store
#[derive(Debug, Config, Clone)]
pub struct SessionConfig {
    /// Secret the session cookie is signed with (at least 32 bytes)
    #[config(env = "GAIA_SESSION_KEY", default = "")]
    pub key: String,

    /// Session record TTL in seconds (default: 1 day)
    #[config(env = "GAIA_SESSION_TTL", default = 86400)]
    pub ttl: u64,

    /// Session store type: "in-memory" (default) or "redis"
    #[config(env = "GAIA_SESSION_STORE", default = "in-memory")]
    pub store: String,

    /// Maximum capacity of the in-memory store in MiB (default: 64 MiB)
    #[config(env = "GAIA_SESSION_MEMORY_CAPACITY", default = 64)]
    pub memory_capacity: usize,

    /// Redis connection string, required by the redis store
    #[config(env = "GAIA_SESSION_REDIS_URL", default = "")]
    pub redis_url: String,
}

impl SessionConfig {
    pub fn store_kind(&self) -> Result<SessionStoreKind, String> {
        match self.store.trim().to_ascii_lowercase().as_str() {
            "in-memory" | "memory" => Ok(SessionStoreKind::InMemory),
            "redis" => Ok(SessionStoreKind::Redis),
            other => Err(format!("unknown session store '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(store: &str) -> SessionConfig {
        SessionConfig {
            key: "k".repeat(MIN_SESSION_KEY_LEN),
            ttl: 60,
            store: store.to_string(),
            memory_capacity: 1,
            redis_url: "".to_string(),
        }
    }

    #[test]
    fn test_store_kind() {
        assert_eq!(config("in-memory").store_kind(), Ok(SessionStoreKind::InMemory));
        assert_eq!(config("Redis").store_kind(), Ok(SessionStoreKind::Redis));
        assert!(config("postgres").store_kind().is_err());
    }
}

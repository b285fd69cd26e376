use crate::broker::{BrokerClient, BrokerError};
use crate::cache::{create_cache, Cache, CacheError};
use crate::config::GatewayConfig;
use crate::matcher::MatcherClient;
use crate::session::{cookie_key, SessionStore};
use crate::tokens::{TokenError, TokenIssuer};
use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use reqwest::{redirect, Client};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to create session store: {0}")]
    Cache(#[from] CacheError),
    #[error("failed to create token issuer: {0}")]
    Token(#[from] TokenError),
    #[error("failed to create broker client: {0}")]
    Broker(#[from] BrokerError),
    #[error("failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Everything a request handler needs, built once by `main`
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub sessions: SessionStore,
    pub tokens: Arc<TokenIssuer>,
    pub broker: BrokerClient,
    pub matcher: MatcherClient,
    pub origin_client: Client,
    cookie_key: Key,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl AppState {
    /// HTTP client for one upstream. Redirects are relayed, never followed.
    fn create_client(timeout: u64) -> Result<Client, reqwest::Error> {
        Client::builder()
            .timeout(Duration::from_secs(timeout))
            .connect_timeout(Duration::from_secs(2))
            .redirect(redirect::Policy::none())
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
    }

    pub async fn new(config: &GatewayConfig) -> Result<Self, StateError> {
        let cache = create_cache(&config.session).await?;
        Self::with_existing_cache(config, cache)
    }

    pub fn with_existing_cache(config: &GatewayConfig, cache: Cache) -> Result<Self, StateError> {
        let tokens = Arc::new(TokenIssuer::new(
            &config.token.signing_key,
            config.token.issuer.clone(),
        )?);
        let broker = BrokerClient::new(
            Self::create_client(config.broker.client_timeout)?,
            &config.broker,
            !config.is_production(),
        )?;
        let matcher = MatcherClient::new(
            Self::create_client(config.matcher.client_timeout)?,
            config.matcher.get_url("/match"),
            tokens.clone(),
        );

        Ok(Self {
            config: Arc::new(config.clone()),
            sessions: SessionStore::new(Arc::new(cache), config.is_production()),
            tokens,
            broker,
            matcher,
            origin_client: Self::create_client(config.origin.client_timeout)?,
            cookie_key: cookie_key(&config.session.key),
        })
    }

    /// Check if all components are healthy
    pub async fn health_check(&self) -> bool {
        match self.sessions.health_check().await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Session store is unhealthy: {}", e);
                false
            }
        }
    }

    #[cfg(test)]
    pub fn for_testing(config: &GatewayConfig) -> Self {
        let cache = Cache::InMemory(
            crate::cache::memory::InMemoryCache::new(config.session.ttl, 1)
                .expect("Failed to create test cache"),
        );
        Self::with_existing_cache(config, cache).expect("Failed to create test state")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::MockServer;

    async fn config() -> GatewayConfig {
        let mock = MockServer::start().await;
        GatewayConfig::for_test_with_mocks(&mock, &mock, &mock)
    }

    #[tokio::test]
    async fn test_app_state_new() {
        let config = config().await;
        let state = AppState::new(&config).await.unwrap();
        assert_eq!(state.config.port, config.port);
        assert!(state.health_check().await);
    }

    #[tokio::test]
    async fn test_app_state_rejects_empty_signing_key() {
        let mut config = config().await;
        config.token.signing_key = "".to_string();
        assert!(matches!(
            AppState::new(&config).await,
            Err(StateError::Token(TokenError::EmptyKey))
        ));
    }

    #[tokio::test]
    async fn test_app_state_clone() {
        let state = AppState::for_testing(&config().await);
        let state2 = state.clone();

        // After cloning, both instances should point to the same data
        assert_eq!(Arc::as_ptr(&state.config), Arc::as_ptr(&state2.config));
        assert_eq!(Arc::as_ptr(&state.tokens), Arc::as_ptr(&state2.tokens));
    }
}

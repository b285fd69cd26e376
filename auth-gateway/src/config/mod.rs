pub(crate) use crate::config::broker::BrokerConfig;
pub(crate) use crate::config::matcher::MatcherConfig;
pub(crate) use crate::config::origin::OriginConfig;
pub(crate) use crate::config::redirect::RedirectConfig;
pub(crate) use crate::config::session::{SessionConfig, SessionStoreKind, MIN_SESSION_KEY_LEN};
pub(crate) use crate::config::token::TokenConfig;
use confique::Config;
use thiserror::Error;
use url::Url;

pub mod broker;
pub mod matcher;
pub mod origin;
pub mod redirect;
pub mod session;
pub mod token;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] confique::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Deployment environment, controls broker simulation and secure cookies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// Main configuration structure for the gateway
#[derive(Debug, Config, Clone)]
pub struct GatewayConfig {
    /// The port the gateway listens on (default: 3020)
    #[config(env = "GAIA_PORT", default = 3020)]
    pub port: u16,

    /// "development" (default) or "production"
    #[config(env = "GAIA_ENVIRONMENT", default = "development")]
    pub environment: String,

    #[config(nested)]
    pub broker: BrokerConfig,

    #[config(nested)]
    pub token: TokenConfig,

    #[config(nested)]
    pub session: SessionConfig,

    #[config(nested)]
    pub matcher: MatcherConfig,

    #[config(nested)]
    pub origin: OriginConfig,

    #[config(nested)]
    pub redirect: RedirectConfig,
}

impl GatewayConfig {
    /// Loads the configuration from `GAIA_*` environment variables and validates it
    pub fn new() -> Result<Self, ConfigError> {
        let config = Self::builder().env().load()?;
        config.validate()?;
        Ok(config)
    }

    pub fn environment(&self) -> Environment {
        if self.environment.trim().eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment() == Environment::Production
    }

    /// Checks the invariants the service relies on at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.signing_key.is_empty() {
            return Err(ConfigError::Invalid(
                "GAIA_TOKEN_SIGNING_KEY must be set".to_string(),
            ));
        }
        if self.session.key.len() < MIN_SESSION_KEY_LEN {
            return Err(ConfigError::Invalid(format!(
                "GAIA_SESSION_KEY must be at least {} bytes",
                MIN_SESSION_KEY_LEN
            )));
        }
        if self.broker.client_id.is_empty() {
            return Err(ConfigError::Invalid(
                "GAIA_BROKER_CLIENT_ID must be set".to_string(),
            ));
        }

        for (name, value) in [
            ("GAIA_BROKER_URL", &self.broker.url),
            ("GAIA_BROKER_REDIRECT_URI", &self.broker.redirect_uri),
            ("GAIA_MATCHER_URL", &self.matcher.url),
            ("GAIA_ORIGIN_URL", &self.origin.url),
        ] {
            Url::parse(value)
                .map_err(|e| ConfigError::Invalid(format!("{} is not a valid URL: {}", name, e)))?;
        }

        let store = self
            .session
            .store_kind()
            .map_err(ConfigError::Invalid)?;
        if store == SessionStoreKind::Redis && self.session.redis_url.is_empty() {
            return Err(ConfigError::Invalid(
                "GAIA_SESSION_REDIS_URL is required for the redis session store".to_string(),
            ));
        }

        Ok(())
    }

    #[cfg(test)]
    pub fn for_test_with_mocks(
        broker_mock: &wiremock::MockServer,
        matcher_mock: &wiremock::MockServer,
        origin_mock: &wiremock::MockServer,
    ) -> Self {
        Self {
            port: 0, // Let the OS choose a port
            environment: "development".to_string(),
            broker: BrokerConfig {
                url: broker_mock.uri(),
                client_id: "test-client".to_string(),
                client_secret: "test-secret".to_string(),
                redirect_uri: "http://localhost:3020/authenticate".to_string(),
                scope: "mitid".to_string(),
                simulation: "".to_string(),
                client_timeout: 5,
            },
            token: TokenConfig {
                signing_key: "test-signing-key".to_string(),
                issuer: "Gaia".to_string(),
            },
            session: SessionConfig {
                key: "test-session-key-that-is-long-enough-to-sign".to_string(),
                ttl: 60,
                store: "in-memory".to_string(),
                memory_capacity: 1,
                redis_url: "".to_string(),
            },
            matcher: MatcherConfig {
                url: matcher_mock.uri(),
                client_timeout: 5,
            },
            origin: OriginConfig {
                url: origin_mock.uri(),
                protected_prefixes: "/secret/".to_string(),
                client_timeout: 5,
            },
            redirect: RedirectConfig {
                post_login: "/gaia/dashboard.html".to_string(),
                onboarding: "/onboarding.html".to_string(),
            },
        }
    }
}

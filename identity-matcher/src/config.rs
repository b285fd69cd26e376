use confique::Config;

/// Configuration of the reference matcher service
#[derive(Debug, Config, Clone)]
pub struct MatcherServiceConfig {
    /// The port the matcher listens on (default: 3010)
    #[config(env = "MATCHER_PORT", default = 3010)]
    pub port: u16,

    /// HS256 key shared with the gateway. Empty disables bearer checks.
    #[config(env = "MATCHER_TOKEN_SIGNING_KEY", default = "")]
    pub signing_key: String,
}

impl MatcherServiceConfig {
    pub fn new() -> Result<Self, confique::Error> {
        Self::builder().env().load()
    }

    pub fn requires_credentials(&self) -> bool {
        !self.signing_key.is_empty()
    }
}

use confique::Config;

/// Configuration for the identity matcher service
#[derive(Debug, Config, Clone)]
pub struct MatcherConfig {
    /// Matcher base URL (default: http://localhost:3010)
    #[config(env = "GAIA_MATCHER_URL", default = "http://localhost:3010")]
    pub url: String,

    /// The timeout for matcher requests in seconds (default: 5)
    #[config(env = "GAIA_MATCHER_CLIENT_TIMEOUT", default = 5)]
    pub client_timeout: u64,
}

impl MatcherConfig {
    pub fn get_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

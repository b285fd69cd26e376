use confique::Config;

/// Configuration for the protected origin service
#[derive(Debug, Config, Clone)]
pub struct OriginConfig {
    /// Origin base URL (default: http://localhost:3000)
    #[config(env = "GAIA_ORIGIN_URL", default = "http://localhost:3000")]
    pub url: String,

    /// Path prefixes that require a confirmed session
    /// Comma-separated list (default: "/secret/")
    #[config(env = "GAIA_ORIGIN_PROTECTED_PREFIXES", default = "/secret/")]
    pub protected_prefixes: String,

    /// The timeout for origin requests in seconds (default: 60)
    #[config(env = "GAIA_ORIGIN_CLIENT_TIMEOUT", default = 60)]
    pub client_timeout: u64,
}

impl OriginConfig {
    /// Get protected prefixes as a vector
    pub fn get_protected_prefixes(&self) -> Vec<&str> {
        self.protected_prefixes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Whether requests for `path` must carry a valid session token
    pub fn is_protected(&self, path: &str) -> bool {
        self.get_protected_prefixes()
            .iter()
            .any(|prefix| path.starts_with(prefix))
    }

    /// Returns the origin URL for the given path and query
    pub fn get_url(&self, path_and_query: &str) -> String {
        let base = self.url.trim_end_matches('/');
        if path_and_query.starts_with('/') {
            format!("{}{}", base, path_and_query)
        } else {
            format!("{}/{}", base, path_and_query)
        }
    }
}

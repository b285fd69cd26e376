use confique::Config;

/// Configuration for the external identity broker
#[derive(Debug, Config, Clone)]
pub struct BrokerConfig {
    /// Broker base URL (default: https://pp.netseidbroker.dk)
    #[config(env = "GAIA_BROKER_URL", default = "https://pp.netseidbroker.dk")]
    pub url: String,

    /// OAuth client id registered with the broker
    #[config(env = "GAIA_BROKER_CLIENT_ID", default = "")]
    pub client_id: String,

    /// OAuth client secret registered with the broker
    #[config(env = "GAIA_BROKER_CLIENT_SECRET", default = "")]
    pub client_secret: String,

    /// Where the broker sends the user back after login
    #[config(
        env = "GAIA_BROKER_REDIRECT_URI",
        default = "http://localhost:3020/authenticate"
    )]
    pub redirect_uri: String,

    /// Provider scope requested next to `openid` (default: mitid)
    #[config(env = "GAIA_BROKER_SCOPE", default = "mitid")]
    pub scope: String,

    /// Value of the `simulation` authorize parameter, outside production only
    #[config(env = "GAIA_BROKER_SIMULATION", default = "")]
    pub simulation: String,

    /// The timeout for broker requests in seconds (default: 10)
    #[config(env = "GAIA_BROKER_CLIENT_TIMEOUT", default = 10)]
    pub client_timeout: u64,
}

impl BrokerConfig {
    /// Returns the broker URL for the given path
    pub fn get_url(&self, path: &str) -> String {
        let base = self.url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    pub fn simulation(&self) -> Option<&str> {
        let value = self.simulation.trim();
        (!value.is_empty()).then_some(value)
    }
}

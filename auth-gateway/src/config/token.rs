use confique::Config;

/// Bearer token signing configuration
#[derive(Debug, Config, Clone)]
pub struct TokenConfig {
    /// Symmetric HS256 signing key
    #[config(env = "GAIA_TOKEN_SIGNING_KEY", default = "")]
    pub signing_key: String,

    /// `iss` claim of issued tokens (default: Gaia)
    #[config(env = "GAIA_TOKEN_ISSUER", default = "Gaia")]
    pub issuer: String,
}

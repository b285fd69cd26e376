use confique::Config;

/// Redirect targets of the login flow
#[derive(Debug, Config, Clone)]
pub struct RedirectConfig {
    /// Where a confirmed user lands (default: /gaia/dashboard.html)
    #[config(env = "GAIA_REDIRECT_POST_LOGIN", default = "/gaia/dashboard.html")]
    pub post_login: String,

    /// The onboarding form for unmatched identities (default: /onboarding.html)
    #[config(env = "GAIA_REDIRECT_ONBOARDING", default = "/onboarding.html")]
    pub onboarding: String,
}

use crate::api::{account, health};
use crate::models::OnboardingSubmission;
use utoipa::OpenApi;

pub(crate) const HEALTH_TAG: &str = "Health API";
pub(crate) const ACCOUNT_TAG: &str = "Account API";

#[derive(OpenApi)]
#[openapi(
    paths(
        account::login,
        account::authenticate,
        account::onboarding,
        health::healthy,
        health::ready,
    ),
    components(schemas(OnboardingSubmission, health::Health)),
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = ACCOUNT_TAG, description = "Broker login and onboarding endpoints"),
    ),
    info(
        title = "Gaia auth gateway",
        description = "Identity federation and session-gated forwarding",
        version = "0.1.0"
    )
)]
pub(crate) struct ApiDoc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identity proven by the broker; lives only in session state until matched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalIdentity {
    /// The broker's unique identifier (`mitid.uuid`)
    pub id: String,
    /// Display name (`mitid.identity_name`)
    pub name: String,
}

/// Address data collected by the onboarding form
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct OnboardingSubmission {
    #[serde(default)]
    pub address: String,
    /// Address registry identifier
    #[serde(default)]
    pub darid: String,
}

impl OnboardingSubmission {
    pub fn is_complete(&self) -> bool {
        !self.address.trim().is_empty() && !self.darid.trim().is_empty()
    }
}

/// Body of the matcher's `POST /match`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchRequest {
    pub mitid_uuid: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub dar_id: String,
}

/// System-of-record identity as returned by the matcher
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalIdentity {
    #[serde(default)]
    pub gaia_id: String,
    #[serde(default)]
    pub mitid_uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub dar_id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

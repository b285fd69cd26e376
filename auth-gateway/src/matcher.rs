//! Client of the identity matcher's `POST /match` endpoint

use crate::models::{ExternalIdentity, LocalIdentity, MatchRequest, OnboardingSubmission};
use crate::tokens::{TokenError, TokenIssuer, TokenPurpose};
use http::StatusCode;
use log::{debug, warn};
use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("identity has no external identifier")]
    MissingExternalId,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("matcher answered {status}: {body}")]
    Rejected { status: StatusCode, body: String },
    #[error("matcher returned an unreadable identity: {0}")]
    InvalidResponse(String),
    #[error("failed to mint matcher credential: {0}")]
    Credential(#[from] TokenError),
}

/// Result of a match attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched(LocalIdentity),
    /// No local record, and not enough data for the matcher to create one
    NotFound,
}

#[derive(Clone)]
pub struct MatcherClient {
    client: Client,
    match_url: String,
    tokens: Arc<TokenIssuer>,
}

impl MatcherClient {
    pub fn new(client: Client, match_url: String, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            client,
            match_url,
            tokens,
        }
    }

    /// Resolves `identity` to a local record. `submission` adds the address
    /// data collected during onboarding.
    pub async fn match_identity(
        &self,
        identity: &ExternalIdentity,
        submission: Option<&OnboardingSubmission>,
    ) -> Result<MatchOutcome, MatcherError> {
        if identity.id.is_empty() {
            return Err(MatcherError::MissingExternalId);
        }

        let request = MatchRequest {
            mitid_uuid: identity.id.clone(),
            name: identity.name.clone(),
            address: submission.map(|s| s.address.clone()).unwrap_or_default(),
            dar_id: submission.map(|s| s.darid.clone()).unwrap_or_default(),
        };
        let credential = self.tokens.issue(TokenPurpose::MatchOnly, "")?;

        debug!("Matching identity {}", identity.id);
        let response = self
            .client
            .post(&self.match_url)
            .bearer_auth(credential)
            .json(&request)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(MatchOutcome::NotFound),
            StatusCode::OK => {
                let local: LocalIdentity = response
                    .json()
                    .await
                    .map_err(|e| MatcherError::InvalidResponse(e.to_string()))?;
                if local.gaia_id.is_empty() {
                    warn!(
                        "Matcher answered 200 without a local id for {}",
                        identity.id
                    );
                    return Ok(MatchOutcome::NotFound);
                }
                Ok(MatchOutcome::Matched(local))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(MatcherError::Rejected { status, body })
            }
        }
    }
}

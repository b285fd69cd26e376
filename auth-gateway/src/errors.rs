use crate::broker::BrokerError;
use crate::matcher::MatcherError;
use crate::session::SessionError;
use crate::tokens::TokenError;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use std::fmt;
use thiserror::Error;

/// Coarse classification of every failure the gateway reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    ProtocolViolation,
    UpstreamUnavailable,
    UpstreamRejected,
    IdentityNotFound,
    SessionIntegrityViolation,
    TokenInvalid,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ProtocolViolation => "ProtocolViolation",
            Self::UpstreamUnavailable => "UpstreamUnavailable",
            Self::UpstreamRejected => "UpstreamRejected",
            Self::IdentityNotFound => "IdentityNotFound",
            Self::SessionIntegrityViolation => "SessionIntegrityViolation",
            Self::TokenInvalid => "TokenInvalid",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("provider returned unexpected state")]
    StateMismatch,
    #[error("provider did not return code")]
    MissingCode,
    #[error("code exchange failed: {0}")]
    BrokerExchange(#[source] BrokerError),
    #[error("user info request failed: {0}")]
    BrokerUserInfo(#[source] BrokerError),
    #[error("identity matcher returned error: {0}")]
    Matcher(#[from] MatcherError),
    #[error("failed to issue token: {0}")]
    TokenIssue(#[source] TokenError),
    #[error("onboarding form is incomplete")]
    OnboardingIncomplete,
    #[error("onboarding form could not be read: {0}")]
    OnboardingFormInvalid(String),
    #[error("onboarding session data incomplete")]
    OnboardingSessionInvalid,
    #[error("onboarding name does not belong to this session")]
    OnboardingTamperDetected,
    #[error("identity matcher could not match identity")]
    OnboardingMatchFailed,
    #[error("request path is not in canonical form")]
    UnsafePath,
    #[error("invalid authentication session")]
    MissingSession,
    #[error("invalid authentication token")]
    MissingToken,
    #[error("invalid authentication token")]
    InvalidToken,
    #[error("authentication token could not be parsed: {0}")]
    MalformedToken(#[source] TokenError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

fn upstream_category(unavailable: bool) -> ErrorCategory {
    if unavailable {
        ErrorCategory::UpstreamUnavailable
    } else {
        ErrorCategory::UpstreamRejected
    }
}

impl AuthError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::StateMismatch
            | Self::MissingCode
            | Self::OnboardingIncomplete
            | Self::OnboardingFormInvalid(_)
            | Self::UnsafePath => ErrorCategory::ProtocolViolation,
            Self::BrokerExchange(err) | Self::BrokerUserInfo(err) => {
                upstream_category(matches!(err, BrokerError::Http(_)))
            }
            Self::Matcher(err) => upstream_category(matches!(err, MatcherError::Http(_))),
            Self::OnboardingSessionInvalid | Self::OnboardingTamperDetected => {
                ErrorCategory::SessionIntegrityViolation
            }
            Self::OnboardingMatchFailed => ErrorCategory::IdentityNotFound,
            Self::TokenIssue(_)
            | Self::MissingSession
            | Self::MissingToken
            | Self::InvalidToken
            | Self::MalformedToken(_) => ErrorCategory::TokenInvalid,
            Self::Session(_) => ErrorCategory::UpstreamUnavailable,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::StateMismatch
            | Self::MissingCode
            | Self::OnboardingIncomplete
            | Self::OnboardingFormInvalid(_)
            | Self::UnsafePath => StatusCode::BAD_REQUEST,
            Self::MissingSession | Self::MissingToken | Self::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{} ({}): {}", status, self.category(), self);
        } else {
            log::warn!("{} ({}): {}", status, self.category(), self);
        }
        (status, format!("{}: {}", self.category(), self)).into_response()
    }
}

//! Bearer token issuance and verification.
//!
//! Tokens are HS256 JWTs signed with `GAIA_TOKEN_SIGNING_KEY`. The claim set
//! depends on the [`TokenPurpose`] the caller asks for.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifetime of every issued token
pub const TOKEN_LIFETIME_HOURS: i64 = 24;

const FULL_ACCESS_SCOPE: &str = "crm:write data:read invoice:read";
const FULL_ACCESS_AUDIENCE: &[&str] = &["crm", "data", "invoice"];
const MATCH_ONLY_SCOPE: &str = "crm:match";
const MATCH_ONLY_AUDIENCE: &[&str] = &["crm"];

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing key is empty")]
    EmptyKey,
    #[error("a full access token requires a subject")]
    MissingSubject,
    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
    #[error("token could not be parsed: {0}")]
    Malformed(jsonwebtoken::errors::Error),
}

/// What a token is good for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    /// A resolved local identity: CRM write plus data and invoice read
    FullAccess,
    /// The gateway's own credential towards the matcher's `/match` endpoint
    MatchOnly,
}

impl TokenPurpose {
    pub fn scope(self) -> &'static str {
        match self {
            Self::FullAccess => FULL_ACCESS_SCOPE,
            Self::MatchOnly => MATCH_ONLY_SCOPE,
        }
    }

    pub fn audience(self) -> &'static [&'static str] {
        match self {
            Self::FullAccess => FULL_ACCESS_AUDIENCE,
            Self::MatchOnly => MATCH_ONLY_AUDIENCE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub scope: String,
    pub aud: Vec<String>,
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl TokenIssuer {
    pub fn new(signing_key: &str, issuer: impl Into<String>) -> Result<Self, TokenError> {
        if signing_key.is_empty() {
            return Err(TokenError::EmptyKey);
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(signing_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(signing_key.as_bytes()),
            issuer: issuer.into(),
        })
    }

    /// Builds the claim set for `purpose`, valid from now for 24 hours
    pub fn claims(&self, purpose: TokenPurpose, subject: &str) -> Claims {
        let now = Utc::now();
        Claims {
            sub: subject.to_string(),
            scope: purpose.scope().to_string(),
            aud: purpose.audience().iter().map(|a| a.to_string()).collect(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp(),
        }
    }

    pub fn issue(&self, purpose: TokenPurpose, subject: &str) -> Result<String, TokenError> {
        if purpose == TokenPurpose::FullAccess && subject.is_empty() {
            return Err(TokenError::MissingSubject);
        }
        self.sign(&self.claims(purpose, subject))
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Checks signature, algorithm and the time claims.
    ///
    /// A well-formed token that fails those checks is `Ok(false)`. Input that
    /// is not a JWT at all is an error.
    pub fn verify(&self, token: &str) -> Result<bool, TokenError> {
        self.decode(token).map(|claims| claims.is_some())
    }

    /// Like [`verify`](Self::verify) but hands back the claims of a valid token
    pub fn decode(&self, token: &str) -> Result<Option<Claims>, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        validation.validate_nbf = true;

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(Some(data.claims)),
            Err(err) => match err.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::ExpiredSignature
                | ErrorKind::ImmatureSignature => {
                    debug!("Rejected bearer token: {}", err);
                    Ok(None)
                }
                _ => Err(TokenError::Malformed(err)),
            },
        }
    }
}

//! Client side of the identity broker's authorization-code flow

use crate::config::BrokerConfig;
use crate::models::ExternalIdentity;
use http::StatusCode;
use log::{debug, error};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

const AUTHORIZE_PATH: &str = "/op/connect/authorize";
const TOKEN_PATH: &str = "/op/connect/token";
const USERINFO_PATH: &str = "/op/connect/userinfo";

/// Errors that can occur while talking to the broker
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("broker answered {status}: {body}")]
    Rejected { status: StatusCode, body: String },
    #[error("unexpected broker response: {0}")]
    InvalidResponse(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerTokens {
    #[serde(default)]
    pub id_token: String,
    #[serde(default)]
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(rename = "mitid.uuid", default)]
    uuid: String,
    #[serde(rename = "mitid.identity_name", default)]
    identity_name: String,
}

#[derive(Clone)]
pub struct BrokerClient {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scope: String,
    simulation: Option<String>,
    authorize_url: Url,
    token_url: Url,
    userinfo_url: Url,
}

impl BrokerClient {
    /// `simulate` enables the development-only `simulation` authorize parameter
    pub fn new(client: Client, config: &BrokerConfig, simulate: bool) -> Result<Self, BrokerError> {
        let parse = |path: &str| {
            Url::parse(&config.get_url(path))
                .map_err(|e| BrokerError::Config(format!("invalid broker URL: {}", e)))
        };

        Ok(Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scope: format!("openid {}", config.scope.trim()),
            simulation: config
                .simulation()
                .filter(|_| simulate)
                .map(str::to_string),
            authorize_url: parse(AUTHORIZE_PATH)?,
            token_url: parse(TOKEN_PATH)?,
            userinfo_url: parse(USERINFO_PATH)?,
        })
    }

    /// The broker login page for a login attempt identified by `state`
    pub fn authorize_url(&self, state: &str) -> Url {
        let mut url = self.authorize_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", &self.redirect_uri)
                .append_pair("scope", &self.scope)
                .append_pair("state", state);
            if let Some(simulation) = &self.simulation {
                query.append_pair("simulation", simulation);
            }
        }
        url
    }

    /// Trades an authorization code for the broker's tokens
    pub async fn exchange_code(&self, code: &str) -> Result<BrokerTokens, BrokerError> {
        debug!("Exchanging authorization code at {}", self.token_url);

        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];
        let response = self
            .client
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let tokens: BrokerTokens = response
            .json()
            .await
            .map_err(|e| BrokerError::InvalidResponse(e.to_string()))?;

        if tokens.access_token.is_empty() {
            return Err(BrokerError::InvalidResponse(
                "token response carries no access_token".to_string(),
            ));
        }
        Ok(tokens)
    }

    /// Fetches the identity behind an access token
    pub async fn fetch_user_info(
        &self,
        access_token: &str,
    ) -> Result<ExternalIdentity, BrokerError> {
        let response = self
            .client
            .get(self.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| BrokerError::InvalidResponse(e.to_string()))?;

        if info.uuid.is_empty() {
            return Err(BrokerError::InvalidResponse(
                "user info carries no mitid.uuid".to_string(),
            ));
        }
        debug!("Broker returned identity {}", info.uuid);

        Ok(ExternalIdentity {
            id: info.uuid,
            name: info.identity_name,
        })
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BrokerError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        error!("Broker request failed with {}: {}", status, body);
        Err(BrokerError::Rejected { status, body })
    }
}

//! Server-side sessions behind the signed `gaia` cookie.

use crate::cache::{Cache, CacheBackend, CacheError};
use crate::models::ExternalIdentity;
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::sync::Arc;
use thiserror::Error;

/// Name of the signed session cookie
pub const SESSION_COOKIE: &str = "gaia";

const KEY_PREFIX: &str = "session:";
const SESSION_ID_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store failure: {0}")]
    Store(#[from] CacheError),
}

/// What a session currently holds. A session is in exactly one stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum SessionData {
    /// `/login` issued `state` and is waiting for the broker to come back
    LoginStarted { state: String },
    /// Broker-verified identity the matcher could not resolve yet
    Pending { identity: ExternalIdentity },
    /// Signed full-access bearer token
    Confirmed { token: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub data: SessionData,
}

/// Derives the 64-byte cookie signing key from the configured secret
pub fn cookie_key(secret: &str) -> Key {
    Key::from(Sha512::digest(secret.as_bytes()).as_slice())
}

/// URL-safe random token of `len` bytes of entropy
pub fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill(bytes.as_mut_slice());
    URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Clone)]
pub struct SessionStore {
    cache: Arc<Cache>,
    secure: bool,
}

impl SessionStore {
    /// `secure` marks the session cookie HTTPS-only
    pub fn new(cache: Arc<Cache>, secure: bool) -> Self {
        Self { cache, secure }
    }

    fn record_key(id: &str) -> String {
        format!("{}{}", KEY_PREFIX, id)
    }

    /// Session id carried by a correctly signed cookie, if any
    pub fn session_id(jar: &SignedCookieJar) -> Option<String> {
        jar.get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|id| !id.is_empty())
    }

    /// Resolves the cookie to its server-side record
    pub async fn load(&self, jar: &SignedCookieJar) -> Result<Option<Session>, SessionError> {
        let Some(id) = Self::session_id(jar) else {
            return Ok(None);
        };
        let data: Option<SessionData> = self.cache.get(&Self::record_key(&id)).await?;
        Ok(data.map(|data| Session { id, data }))
    }

    /// Overwrites the session record, creating a session id when the jar has none
    pub async fn save(
        &self,
        jar: SignedCookieJar,
        data: &SessionData,
    ) -> Result<SignedCookieJar, SessionError> {
        let id = Self::session_id(&jar).unwrap_or_else(|| random_token(SESSION_ID_BYTES));
        self.write(jar, id, data).await
    }

    /// Stores `data` under a freshly minted session id and drops the record
    /// the incoming cookie pointed to, so an id known before this call never
    /// reaches the new stage.
    pub async fn rotate(
        &self,
        jar: SignedCookieJar,
        data: &SessionData,
    ) -> Result<SignedCookieJar, SessionError> {
        if let Some(previous) = Self::session_id(&jar) {
            self.remove(&previous).await?;
        }
        self.write(jar, random_token(SESSION_ID_BYTES), data).await
    }

    async fn write(
        &self,
        jar: SignedCookieJar,
        id: String,
        data: &SessionData,
    ) -> Result<SignedCookieJar, SessionError> {
        self.cache.set(&Self::record_key(&id), data).await?;
        debug!("Stored session record in stage {}", stage_name(data));

        let cookie = Cookie::build((SESSION_COOKIE, id))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .build();
        Ok(jar.add(cookie))
    }

    /// Deletes the server-side record. The cookie stays but resolves to nothing.
    pub async fn remove(&self, id: &str) -> Result<(), SessionError> {
        self.cache.delete(&Self::record_key(id)).await?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), String> {
        self.cache.health_check().await
    }
}

fn stage_name(data: &SessionData) -> &'static str {
    match data {
        SessionData::LoginStarted { .. } => "login_started",
        SessionData::Pending { .. } => "pending",
        SessionData::Confirmed { .. } => "confirmed",
    }
}

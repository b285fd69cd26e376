//! In-memory system of record and the match policy over it

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("mitid_uuid is required")]
    MissingMitidUuid,
}

/// Body of `POST /match`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MatchRequest {
    #[serde(default)]
    pub mitid_uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub dar_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub gaia_id: String,
    pub mitid_uuid: String,
    pub name: String,
    pub address: String,
    pub dar_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct UserStore {
    users: RwLock<HashMap<String, User>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record as is, e.g. one imported without a MitID link yet
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.gaia_id.clone(), user);
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Resolves `request` to a user record.
    ///
    /// A known MitID always matches. Without one, the address registry id is
    /// needed: an unlinked record with the same registry id and name gets
    /// linked, otherwise a new record is created. `Ok(None)` means neither
    /// was possible.
    pub async fn match_user(&self, request: &MatchRequest) -> Result<Option<User>, MatchError> {
        if request.mitid_uuid.trim().is_empty() {
            return Err(MatchError::MissingMitidUuid);
        }

        let mut users = self.users.write().await;
        let now = Utc::now();

        if let Some(user) = users
            .values_mut()
            .find(|user| user.mitid_uuid == request.mitid_uuid)
        {
            if !request.dar_id.is_empty() && user.dar_id.is_empty() {
                user.dar_id = request.dar_id.clone();
                user.address = request.address.clone();
                user.updated_at = now;
            }
            debug!("Matched {} by MitID", user.gaia_id);
            return Ok(Some(user.clone()));
        }

        if request.dar_id.is_empty() {
            return Ok(None);
        }

        if let Some(user) = users.values_mut().find(|user| {
            user.mitid_uuid.is_empty() && user.dar_id == request.dar_id && user.name == request.name
        }) {
            user.mitid_uuid = request.mitid_uuid.clone();
            user.updated_at = now;
            info!("Linked existing record {} to a MitID", user.gaia_id);
            return Ok(Some(user.clone()));
        }

        let user = User {
            gaia_id: Uuid::new_v4().to_string(),
            mitid_uuid: request.mitid_uuid.clone(),
            name: request.name.clone(),
            address: request.address.clone(),
            dar_id: request.dar_id.clone(),
            created_at: now,
            updated_at: now,
        };
        info!("Created record {}", user.gaia_id);
        users.insert(user.gaia_id.clone(), user.clone());
        Ok(Some(user))
    }
}

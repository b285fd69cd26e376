use crate::config::MatcherServiceConfig;
use crate::store::{MatchError, MatchRequest, UserStore};
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use log::{debug, warn};
use serde::Deserialize;
use std::sync::Arc;

/// Scopes that may call `/match`
const ACCEPTED_SCOPES: [&str; 2] = ["crm:match", "crm:write"];

#[derive(Clone)]
pub struct MatcherState {
    pub store: Arc<UserStore>,
    decoding_key: Option<Arc<DecodingKey>>,
}

impl MatcherState {
    pub fn new(config: &MatcherServiceConfig, store: Arc<UserStore>) -> Self {
        let decoding_key = config
            .requires_credentials()
            .then(|| Arc::new(DecodingKey::from_secret(config.signing_key.as_bytes())));
        Self {
            store,
            decoding_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallerClaims {
    #[serde(default)]
    scope: String,
}

impl IntoResponse for MatchError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

async fn match_identity(
    State(state): State<MatcherState>,
    Json(request): Json<MatchRequest>,
) -> Result<Response, MatchError> {
    match state.store.match_user(&request).await? {
        Some(user) => Ok(Json(user).into_response()),
        None => {
            debug!("No record for MitID identity, onboarding required");
            Ok((StatusCode::NOT_FOUND, "no matching identity").into_response())
        }
    }
}

async fn healthy() -> impl IntoResponse {
    (StatusCode::IM_A_TEAPOT, "I'm alive")
}

async fn require_match_scope(
    State(state): State<MatcherState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(key) = state.decoding_key.as_deref() else {
        return next.run(request).await;
    };

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    let Some(token) = token else {
        warn!("Rejected match call without bearer token");
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;
    match decode::<CallerClaims>(token, key, &validation) {
        Ok(data)
            if data
                .claims
                .scope
                .split_whitespace()
                .any(|scope| ACCEPTED_SCOPES.contains(&scope)) =>
        {
            next.run(request).await
        }
        Ok(_) => {
            warn!("Rejected match call with insufficient scope");
            StatusCode::UNAUTHORIZED.into_response()
        }
        Err(e) => {
            warn!("Rejected match call with invalid token: {}", e);
            StatusCode::UNAUTHORIZED.into_response()
        }
    }
}

pub fn router(state: MatcherState) -> Router {
    let protected = Router::new()
        .route("/match", post(match_identity))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_match_scope,
        ));

    Router::new()
        .merge(protected)
        .route("/healthy", get(healthy))
        .with_state(state)
}

pub(crate) mod account;
mod forward;
pub(crate) mod health;

use crate::api::forward::forward_to_origin;
use crate::state::AppState;
use axum::{routing::any, Router};

/// Combines all API routes into a single router
pub(super) fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(account::router())
        // Everything else goes through the forwarding gate
        .fallback(any(forward_to_origin))
}

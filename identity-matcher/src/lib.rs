//! Reference identity matcher: resolves broker identities to local records.

pub mod api;
pub mod config;
pub mod store;

use axum::Router;
use std::sync::Arc;

/// Builds the matcher application with an empty store
pub fn app(config: &config::MatcherServiceConfig) -> Router {
    api::router(api::MatcherState::new(
        config,
        Arc::new(store::UserStore::new()),
    ))
}

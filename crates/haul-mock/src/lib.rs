//! Mock airport, DALI and directions backends.
//!
//! Serves the endpoints the navigation simulation talks to, so a full run
//! works without external services.

pub mod api;
pub mod state;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::MockState;

/// Router with state and layers applied, ready to serve.
pub fn app(state: Arc<MockState>) -> Router {
    api::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

//! REST API routes.

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::api::{airport, dali, directions};
use crate::state::MockState;

/// Create the API router.
pub fn create_router() -> Router<Arc<MockState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        // Airport mock
        .route("/get-cargo-status", get(airport::get_cargo_status))
        .route("/update-parking", post(airport::update_parking))
        .route("/update-delay", post(airport::update_delay))
        .route("/admin/state", get(airport::admin_state))
        // DALI mock
        .route("/driver/location", post(dali::driver_location))
        .route(
            "/agents/:agent_code",
            put(dali::set_agent_override).delete(dali::clear_agent_override),
        )
        // Directions stand-in
        .route("/maps/api/directions/json", get(directions::get_directions))
}

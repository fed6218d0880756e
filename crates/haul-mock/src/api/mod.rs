//! API routes for the mock backends.

pub mod airport;
pub mod dali;
pub mod directions;
mod routes;

use axum::Router;
use std::sync::Arc;

use crate::state::MockState;

pub fn routes() -> Router<Arc<MockState>> {
    routes::create_router()
}

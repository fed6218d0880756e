//! Airport mock endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::state::{AdminState, MockState};

#[derive(Debug, Deserialize)]
pub struct CargoStatusQuery {
    pub cargo_id: Option<String>,
    pub terminal: Option<String>,
}

/// Status lookup used by the navigation simulation.
pub async fn get_cargo_status(
    State(state): State<Arc<MockState>>,
    Query(query): Query<CargoStatusQuery>,
) -> (StatusCode, Json<Value>) {
    let cargo_id = query.cargo_id.filter(|v| !v.is_empty());
    let terminal = query.terminal.filter(|v| !v.is_empty());

    let (Some(cargo_id), Some(terminal)) = (cargo_id, terminal) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing cargo_id or terminal parameter" })),
        );
    };

    let status = state.cargo_status(&cargo_id, &terminal);
    tracing::info!(
        "Cargo {} at terminal {}: {}",
        cargo_id,
        terminal,
        status.action
    );
    (StatusCode::OK, Json(json!(status)))
}

/// Set available spots per terminal.
pub async fn update_parking(
    State(state): State<Arc<MockState>>,
    Json(updates): Json<HashMap<String, u32>>,
) -> Json<AdminState> {
    let changed = state.update_parking(&updates);
    tracing::info!("Updated parking for {} terminal(s)", changed);
    Json(state.snapshot())
}

/// Set delay flags per cargo id.
pub async fn update_delay(
    State(state): State<Arc<MockState>>,
    Json(updates): Json<HashMap<String, bool>>,
) -> Json<AdminState> {
    let changed = state.update_delay(&updates);
    tracing::info!("Updated delay status for {} cargo id(s)", changed);
    Json(state.snapshot())
}

pub async fn admin_state(State(state): State<Arc<MockState>>) -> Json<AdminState> {
    Json(state.snapshot())
}

//! DALI traffic-signal mock endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::state::{AgentReply, MockState};

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub next_agent_code: String,
}

pub async fn driver_location(
    State(state): State<Arc<MockState>>,
    Json(req): Json<LocationRequest>,
) -> Json<AgentReply> {
    let reply = state.agent_reply(&req.next_agent_code);
    tracing::info!(
        "[{}] {} ({})",
        req.next_agent_code,
        reply.message,
        reply.agent_state
    );
    Json(reply)
}

/// Pin the reply for one agent code.
pub async fn set_agent_override(
    State(state): State<Arc<MockState>>,
    Path(agent_code): Path<String>,
    Json(reply): Json<AgentReply>,
) -> StatusCode {
    tracing::info!("Override for {}: {}", agent_code, reply.message);
    state.set_agent_override(&agent_code, reply);
    StatusCode::NO_CONTENT
}

pub async fn clear_agent_override(
    State(state): State<Arc<MockState>>,
    Path(agent_code): Path<String>,
) -> StatusCode {
    if state.clear_agent_override(&agent_code) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

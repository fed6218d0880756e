//! Errors raised by the route client.

use haul_core::DecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP {status}")]
    Http { status: u16 },
    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no route returned (status {status})")]
    EmptyRoute { status: String },
    #[error("bad overview polyline: {0}")]
    Decode(#[from] DecodeError),
}

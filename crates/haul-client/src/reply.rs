//! Tagged replies from the mock telemetry backends.
//!
//! Telemetry calls never fail outward: every transport or HTTP problem is
//! carried as a variant and degrades into a displayable message.

use haul_core::SignalState;
use serde::{Deserialize, Serialize};

/// Outcome of a single telemetry request.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryReply<T> {
    Ok(T),
    /// Unreachable host, refused connection or timeout.
    NetworkError(String),
    /// The backend answered with a non-success status.
    HttpError { status: u16, reason: String },
    /// The backend answered 2xx with a body we could not read.
    Malformed(String),
}

impl<T> TelemetryReply<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, TelemetryReply::Ok(_))
    }

    /// Message describing the failure, or `None` for a successful reply.
    pub fn failure_message(&self) -> Option<String> {
        match self {
            TelemetryReply::Ok(_) => None,
            TelemetryReply::NetworkError(err) => Some(format!("Network error: {}", err)),
            TelemetryReply::HttpError { status, reason } if reason.is_empty() => {
                Some(format!("Failed with code {}", status))
            }
            TelemetryReply::HttpError { status, reason } => {
                Some(format!("Failed with code {}: {}", status, reason))
            }
            TelemetryReply::Malformed(err) => Some(format!("Malformed response: {}", err)),
        }
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TelemetryReply::NetworkError("request timed out".to_string())
        } else {
            TelemetryReply::NetworkError(err.to_string())
        }
    }
}

/// Traffic-signal reading for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSignal {
    pub message: String,
    /// `None` when the backend sent a code we do not know; the message text
    /// is classified instead.
    pub state: Option<SignalState>,
}

impl TelemetryReply<AgentSignal> {
    /// Collapse into a displayable signal; failures read as yellow.
    pub fn into_signal(self) -> AgentSignal {
        match self {
            TelemetryReply::Ok(signal) => signal,
            other => AgentSignal {
                message: other.failure_message().unwrap_or_default(),
                state: Some(SignalState::Yellow),
            },
        }
    }
}

/// Cargo status reported by the airport backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportStatus {
    pub message: String,
    #[serde(default)]
    pub action: Option<String>,
}

impl TelemetryReply<AirportStatus> {
    pub fn into_status(self) -> AirportStatus {
        match self {
            TelemetryReply::Ok(status) => status,
            other => AirportStatus {
                message: other.failure_message().unwrap_or_default(),
                action: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_degrades_to_yellow() {
        let reply: TelemetryReply<AgentSignal> = TelemetryReply::HttpError {
            status: 503,
            reason: "Service Unavailable".to_string(),
        };
        let signal = reply.into_signal();
        assert_eq!(signal.message, "Failed with code 503: Service Unavailable");
        assert_eq!(signal.state, Some(SignalState::Yellow));
    }

    #[test]
    fn test_network_error_degrades_airport_status() {
        let reply: TelemetryReply<AirportStatus> =
            TelemetryReply::NetworkError("connection refused".to_string());
        assert!(!reply.is_ok());
        assert_eq!(
            reply.into_status().message,
            "Network error: connection refused"
        );
    }

    #[test]
    fn test_ok_passes_through() {
        let signal = AgentSignal {
            message: "Caution ahead".to_string(),
            state: None,
        };
        let reply = TelemetryReply::Ok(signal.clone());
        assert!(reply.failure_message().is_none());
        assert_eq!(reply.into_signal(), signal);
    }
}

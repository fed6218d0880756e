//! DALI traffic-signal mock client.
//!
//! Posts the next agent code to the DALI backend. Without a configured
//! endpoint it answers from a small offline catalog instead.

use haul_core::SignalState;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::ClientError;
use crate::reply::{AgentSignal, TelemetryReply};

const DALI_PATH: &str = "/driver/location";

/// Offline messages, always in the pool.
pub const FALLBACK_MESSAGES: [&str; 4] = [
    "Speed up! Green signal ahead",
    "Caution ahead",
    "Bad Weather",
    "Maintain lane for 1 mile",
];

/// Offline accident message, handed out at most once per client.
pub const FALLBACK_ACCIDENT: &str = "Accident Ahead";

#[derive(Debug, Serialize)]
struct LocationRequest<'a> {
    next_agent_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct LocationResponse {
    #[serde(default = "no_message")]
    message: String,
    #[serde(default)]
    agent_state: Option<String>,
}

fn no_message() -> String {
    "No message".to_string()
}

/// Derive a signal state from offline message wording.
pub fn heuristic_state(message: &str) -> SignalState {
    if message.contains("Speed up") || message.contains("Green") {
        SignalState::Green
    } else if message.contains("Accident") || message.contains("Bad Weather") {
        SignalState::Red
    } else {
        SignalState::Yellow
    }
}

/// Client for the DALI agent endpoint.
pub struct DaliClient {
    client: Client,
    endpoint: Option<String>,
    accident_sent: AtomicBool,
}

impl DaliClient {
    /// Create a client for `base_url`; `None` or an empty URL runs offline.
    pub fn new(base_url: Option<&str>, timeout: Duration) -> Result<Self, ClientError> {
        let endpoint = base_url
            .map(|url| url.trim().trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .map(|url| format!("{}{}", url, DALI_PATH));

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint,
            accident_sent: AtomicBool::new(false),
        })
    }

    /// A client that never touches the network.
    pub fn offline() -> Self {
        Self {
            client: Client::new(),
            endpoint: None,
            accident_sent: AtomicBool::new(false),
        }
    }

    pub fn is_offline(&self) -> bool {
        self.endpoint.is_none()
    }

    /// Send the next agent code and read back its signal.
    pub async fn send_location(&self, agent_name: &str) -> TelemetryReply<AgentSignal> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return TelemetryReply::Ok(self.fallback_signal());
        };

        tracing::debug!("DALI request for {}", agent_name);

        let response = match self
            .client
            .post(endpoint)
            .json(&LocationRequest {
                next_agent_code: agent_name,
            })
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::error!("DALI network call failed for {}: {}", agent_name, err);
                return TelemetryReply::from_transport(err);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                "DALI HTTP {} for {}. Response body: {}",
                status.as_u16(),
                agent_name,
                body
            );
            return TelemetryReply::HttpError {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            };
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => return TelemetryReply::from_transport(err),
        };
        if body.trim().is_empty() {
            return TelemetryReply::Ok(AgentSignal {
                message: "Empty response".to_string(),
                state: Some(SignalState::Yellow),
            });
        }

        match serde_json::from_str::<LocationResponse>(&body) {
            Ok(parsed) => TelemetryReply::Ok(AgentSignal {
                message: parsed.message,
                // Missing state reads as yellow; an unknown code defers to the text.
                state: match parsed.agent_state {
                    None => Some(SignalState::Yellow),
                    Some(code) => SignalState::from_code(&code),
                },
            }),
            Err(err) => TelemetryReply::Malformed(err.to_string()),
        }
    }

    /// Pick a random offline message; the accident message is in the pool
    /// only until it has been picked once.
    pub fn fallback_signal(&self) -> AgentSignal {
        let include_accident = !self.accident_sent.load(Ordering::SeqCst);
        let pool_len = FALLBACK_MESSAGES.len() + usize::from(include_accident);
        let index = rand::rng().random_range(0..pool_len);

        let mut message = FALLBACK_MESSAGES.get(index).copied().unwrap_or(FALLBACK_ACCIDENT);
        if message == FALLBACK_ACCIDENT && self.accident_sent.swap(true, Ordering::SeqCst) {
            // another caller took the accident first
            message = FALLBACK_MESSAGES[index % FALLBACK_MESSAGES.len()];
        }

        AgentSignal {
            message: message.to_string(),
            state: Some(heuristic_state(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_accident_is_one_shot() {
        let client = DaliClient::offline();
        let accidents = (0..500)
            .map(|_| client.fallback_signal())
            .filter(|signal| signal.message == FALLBACK_ACCIDENT)
            .count();
        assert!(accidents <= 1);
    }

    #[test]
    fn test_offline_states_follow_wording() {
        let client = DaliClient::offline();
        for _ in 0..50 {
            let signal = client.fallback_signal();
            assert_eq!(signal.state, Some(heuristic_state(&signal.message)));
        }
        assert_eq!(heuristic_state("Accident Ahead"), SignalState::Red);
        assert_eq!(heuristic_state("Bad Weather"), SignalState::Red);
        assert_eq!(heuristic_state("Speed up! Green signal ahead"), SignalState::Green);
        assert_eq!(heuristic_state("Caution ahead"), SignalState::Yellow);
    }

    #[test]
    fn test_empty_url_means_offline() {
        let client = DaliClient::new(Some("  "), Duration::from_secs(1)).unwrap();
        assert!(client.is_offline());
    }

    #[tokio::test]
    async fn test_offline_send_location_never_fails() {
        let client = DaliClient::offline();
        let reply = client.send_location("Agent1").await;
        assert!(reply.is_ok());
    }
}

//! Airport cargo-status mock client.

use haul_core::GeoPoint;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ClientError;
use crate::reply::{AirportStatus, TelemetryReply};

const STATUS_PATH: &str = "/get-cargo-status";

/// Parameters of one cargo-status lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportQuery {
    pub position: GeoPoint,
    pub cargo_id: String,
    pub terminal: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default = "no_message")]
    message: String,
    #[serde(default)]
    action: Option<String>,
}

fn no_message() -> String {
    "No message".to_string()
}

/// HTTP client for the airport status endpoint.
pub struct AirportClient {
    client: Client,
    base_url: String,
}

impl AirportClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Ask for the cargo's status at its terminal.
    pub async fn fetch_status(&self, query: &AirportQuery) -> TelemetryReply<AirportStatus> {
        let url = format!("{}{}", self.base_url, STATUS_PATH);
        tracing::debug!(
            "Airport status for cargo {} at terminal {} from {}",
            query.cargo_id,
            query.terminal,
            query.position
        );

        let response = match self
            .client
            .get(&url)
            .query(&[
                ("cargo_id", query.cargo_id.as_str()),
                ("terminal", query.terminal.as_str()),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::error!("Airport mock network call failed: {}", err);
                return TelemetryReply::from_transport(err);
            }
        };

        let status = response.status();
        if !status.is_success() {
            return TelemetryReply::HttpError {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            };
        }

        match response.text().await {
            Ok(body) if body.trim().is_empty() => TelemetryReply::Ok(AirportStatus {
                message: "Empty response from Airport Mock".to_string(),
                action: None,
            }),
            Ok(body) => match serde_json::from_str::<StatusResponse>(&body) {
                Ok(parsed) => TelemetryReply::Ok(AirportStatus {
                    message: parsed.message,
                    action: parsed.action,
                }),
                Err(err) => TelemetryReply::Malformed(err.to_string()),
            },
            Err(err) => TelemetryReply::from_transport(err),
        }
    }
}

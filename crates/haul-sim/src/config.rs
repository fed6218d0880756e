//! Simulation configuration from environment.

use std::env;
use std::time::Duration;

use haul_client::directions::DEFAULT_DIRECTIONS_URL;

#[derive(Debug, Clone)]
pub struct Config {
    pub directions_url: String,
    pub maps_api_key: String,
    /// `None` runs the DALI client on its offline catalog.
    pub dali_url: Option<String>,
    pub airport_url: String,
    pub base_interval_ms: u64,
    pub telemetry_timeout_ms: u64,
    pub route_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            directions_url: env::var("HAUL_DIRECTIONS_URL")
                .unwrap_or_else(|_| DEFAULT_DIRECTIONS_URL.to_string()),
            maps_api_key: env::var("HAUL_MAPS_API_KEY").unwrap_or_default(),
            dali_url: env::var("HAUL_DALI_URL")
                .ok()
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            airport_url: env::var("HAUL_AIRPORT_URL")
                .unwrap_or_else(|_| "http://localhost:5010".to_string()),
            base_interval_ms: env::var("HAUL_BASE_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|ms| *ms > 0)
                .unwrap_or(300),
            telemetry_timeout_ms: env::var("HAUL_TELEMETRY_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10_000),
            route_timeout_ms: env::var("HAUL_ROUTE_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20_000),
        }
    }

    pub fn telemetry_timeout(&self) -> Duration {
        Duration::from_millis(self.telemetry_timeout_ms)
    }

    pub fn route_timeout(&self) -> Duration {
        Duration::from_millis(self.route_timeout_ms)
    }
}

//! Directions API client.
//!
//! Fetches a route between two points and extracts the overview path plus
//! every maneuver step as a provisional agent.

use haul_core::{number_agents, polyline, Agent, GeoPoint};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ClientError;

pub const DEFAULT_DIRECTIONS_URL: &str = "https://maps.googleapis.com";
const DIRECTIONS_PATH: &str = "/maps/api/directions/json";
const NO_MANEUVER: &str = "none";

/// One route request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub avoid_highways: bool,
}

/// Decoded path and maneuver waypoints, named `Agent1..N` in step order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchedRoute {
    pub path: Vec<GeoPoint>,
    pub agents: Vec<Agent>,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    routes: Vec<RouteJson>,
}

#[derive(Debug, Deserialize)]
struct RouteJson {
    overview_polyline: PolylineJson,
    #[serde(default)]
    legs: Vec<LegJson>,
}

#[derive(Debug, Deserialize)]
struct PolylineJson {
    points: String,
}

#[derive(Debug, Deserialize)]
struct LegJson {
    #[serde(default)]
    steps: Vec<StepJson>,
}

#[derive(Debug, Deserialize)]
struct StepJson {
    #[serde(default)]
    maneuver: Option<String>,
    start_location: LatLngJson,
}

#[derive(Debug, Deserialize)]
struct LatLngJson {
    lat: f64,
    lng: f64,
}

/// Parse a directions response body.
///
/// Uses the first route's overview polyline and the first leg's steps; a
/// step becomes an agent unless its maneuver is absent or `"none"`.
pub fn parse_directions(body: &str) -> Result<FetchedRoute, ClientError> {
    let response: DirectionsResponse = serde_json::from_str(body)?;
    let status = response.status.unwrap_or_else(|| "UNKNOWN".to_string());
    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or(ClientError::EmptyRoute { status })?;

    let path = polyline::decode(&route.overview_polyline.points)?;

    let maneuver_points = route
        .legs
        .into_iter()
        .next()
        .map(|leg| leg.steps)
        .unwrap_or_default()
        .into_iter()
        .filter(|step| {
            step.maneuver
                .as_deref()
                .is_some_and(|m| m != NO_MANEUVER)
        })
        .map(|step| GeoPoint::new(step.start_location.lat, step.start_location.lng));

    let agents = number_agents(maneuver_points, 1);

    Ok(FetchedRoute { path, agents })
}

/// HTTP client for the directions API.
pub struct DirectionsClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl DirectionsClient {
    /// Create a new directions client.
    ///
    /// # Arguments
    /// * `base_url` - API host, e.g. [`DEFAULT_DIRECTIONS_URL`]
    /// * `api_key` - Maps API key
    /// * `timeout` - Whole-request timeout
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Fetch a route from the directions API.
    pub async fn fetch(&self, request: &RouteRequest) -> Result<FetchedRoute, ClientError> {
        let url = format!("{}{}", self.base_url, DIRECTIONS_PATH);

        let mut query = vec![
            ("origin", request.origin.to_query_value()),
            ("destination", request.destination.to_query_value()),
            ("key", self.api_key.clone()),
        ];
        if request.avoid_highways {
            query.push(("avoid", "highways".to_string()));
        }

        let response = self.client.get(&url).query(&query).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Http {
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        let route = parse_directions(&body)?;

        for agent in &route.agents {
            tracing::debug!("[{}] maneuver at {}", agent.name, agent.position);
        }
        tracing::info!(
            "Fetched route {} -> {}: {} points, {} agents (avoid highways: {})",
            request.origin,
            request.destination,
            route.path.len(),
            route.agents.len(),
            request.avoid_highways
        );

        Ok(route)
    }
}

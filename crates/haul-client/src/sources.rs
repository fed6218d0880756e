//! Provider seams between the navigation session driver and the network.
//!
//! The driver only sees these traits, so tests can swap in scripted fakes.

use std::future::Future;

use crate::airport::{AirportClient, AirportQuery};
use crate::dali::DaliClient;
use crate::directions::{DirectionsClient, FetchedRoute, RouteRequest};
use crate::error::ClientError;
use crate::reply::{AgentSignal, AirportStatus, TelemetryReply};

/// Produces routes between two points.
pub trait RouteProvider: Send + Sync + 'static {
    fn fetch_route(
        &self,
        request: RouteRequest,
    ) -> impl Future<Output = Result<FetchedRoute, ClientError>> + Send;
}

/// Reports the traffic signal at an agent.
pub trait AgentSignalSource: Send + Sync + 'static {
    fn agent_signal(
        &self,
        agent_name: String,
    ) -> impl Future<Output = TelemetryReply<AgentSignal>> + Send;
}

/// Reports the cargo status at the airport.
pub trait AirportStatusSource: Send + Sync + 'static {
    fn cargo_status(
        &self,
        query: AirportQuery,
    ) -> impl Future<Output = TelemetryReply<AirportStatus>> + Send;
}

impl RouteProvider for DirectionsClient {
    async fn fetch_route(&self, request: RouteRequest) -> Result<FetchedRoute, ClientError> {
        self.fetch(&request).await
    }
}

impl AgentSignalSource for DaliClient {
    async fn agent_signal(&self, agent_name: String) -> TelemetryReply<AgentSignal> {
        self.send_location(&agent_name).await
    }
}

impl AirportStatusSource for AirportClient {
    async fn cargo_status(&self, query: AirportQuery) -> TelemetryReply<AirportStatus> {
        self.fetch_status(&query).await
    }
}

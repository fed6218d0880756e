//! HTTP clients for the directions API and the mock telemetry backends.

pub mod airport;
pub mod dali;
pub mod directions;
pub mod error;
pub mod reply;
pub mod sources;

pub use airport::{AirportClient, AirportQuery};
pub use dali::DaliClient;
pub use directions::{parse_directions, DirectionsClient, FetchedRoute, RouteRequest};
pub use error::ClientError;
pub use reply::{AgentSignal, AirportStatus, TelemetryReply};
pub use sources::{AgentSignalSource, AirportStatusSource, RouteProvider};

//! Events fed into the navigation session and the commands it emits.

use haul_client::{AgentSignal, AirportQuery, AirportStatus, FetchedRoute, RouteRequest};
use haul_core::{Agent, GeoPoint, TrafficAlert};

/// Why the remaining route is being replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerouteReason {
    Accident,
    Parking,
}

/// Result delivered by one of the telemetry backends.
#[derive(Debug, Clone, PartialEq)]
pub enum Telemetry {
    Agent { agent: String, signal: AgentSignal },
    Airport(AirportStatus),
}

/// Everything the session reacts to, processed one at a time.
///
/// Step events are raised by the session's own drive loop; the rest are
/// async results and carry the route generation they were issued under.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    AgentReached {
        agent: Agent,
    },
    AgentQueryDue {
        agent: Agent,
    },
    MilestoneHit {
        percent: u32,
        position: GeoPoint,
    },
    AlertReached(TrafficAlert),
    TelemetryReceived {
        generation: u64,
        telemetry: Telemetry,
    },
    RouteReady {
        generation: u64,
        route: FetchedRoute,
    },
    RouteFailed {
        generation: u64,
        error: String,
    },
}

/// Async work requested by the session; the driver runs each one and
/// reports back with a [`SessionEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FetchRoute {
        generation: u64,
        request: RouteRequest,
    },
    QueryAgent {
        generation: u64,
        agent: String,
    },
    QueryAirport {
        generation: u64,
        query: AirportQuery,
    },
}

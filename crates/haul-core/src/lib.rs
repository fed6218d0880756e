pub mod alerts;
pub mod classify;
pub mod models;
pub mod polyline;
pub mod rules;
pub mod spatial;
pub mod trip;

use thiserror::Error;

pub use alerts::{
    generate_equally_spaced_alerts, generate_remaining_alerts, NAVIGATION_MESSAGES,
    REMAINING_ALERT_ID_OFFSET,
};
pub use classify::{classify, classify_text, triggers, Trigger};
pub use models::{
    agent_name, agent_number, number_agents, Agent, Criticality, GeoPoint, NavigationPhase,
    NotificationType, SignalState, SpeedTier, TrafficAlert,
};
pub use polyline::DecodeError;
pub use rules::SimulationRules;
pub use spatial::{distance_m, haversine_distance};
pub use trip::{parse_coordinate, TripPlan};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid coordinate {0:?}, expected \"lat,lng\"")]
    InvalidCoordinate(String),
}

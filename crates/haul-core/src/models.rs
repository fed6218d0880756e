//! Core data models for the navigation simulation.

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Formats as `"lat,lng"`, the form the directions API expects.
    pub fn to_query_value(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// A named maneuver waypoint along a route leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    pub position: GeoPoint,
}

impl Agent {
    pub fn new(name: impl Into<String>, position: GeoPoint) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }

    /// Numeric suffix of an `AgentN` name.
    pub fn number(&self) -> Option<u32> {
        agent_number(&self.name)
    }
}

const AGENT_PREFIX: &str = "Agent";

/// Builds the canonical agent name for a sequence number.
pub fn agent_name(number: u32) -> String {
    format!("{}{}", AGENT_PREFIX, number)
}

/// Parses the sequence number out of an `AgentN` name.
pub fn agent_number(name: &str) -> Option<u32> {
    name.strip_prefix(AGENT_PREFIX)?.parse().ok()
}

/// Assigns sequential names starting at `first_number`, keeping input order.
pub fn number_agents<I>(positions: I, first_number: u32) -> Vec<Agent>
where
    I: IntoIterator<Item = GeoPoint>,
{
    positions
        .into_iter()
        .zip(first_number..)
        .map(|(position, number)| Agent::new(agent_name(number), position))
        .collect()
}

/// A traffic alert pinned to a route point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficAlert {
    pub id: u32,
    pub position: GeoPoint,
    pub message: String,
    pub title: String,
}

/// Leg of the delivery the vehicle is currently in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NavigationPhase {
    #[default]
    ToPickup,
    AtPickup,
    ToDropoff,
    Completed,
}

impl NavigationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationPhase::ToPickup => "TO_PICKUP",
            NavigationPhase::AtPickup => "AT_PICKUP",
            NavigationPhase::ToDropoff => "TO_DROPOFF",
            NavigationPhase::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for NavigationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-level severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Positive,
    Neutral,
    Negative,
}

/// Traffic-signal state reported by the DALI backend.
///
/// Wire codes are `G`, `R` and `Y`; they are converted once at the client
/// boundary and never travel further as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalState {
    #[serde(rename = "G")]
    Green,
    #[serde(rename = "R")]
    Red,
    #[serde(rename = "Y")]
    Yellow,
}

impl SignalState {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "G" => Some(SignalState::Green),
            "R" => Some(SignalState::Red),
            "Y" => Some(SignalState::Yellow),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SignalState::Green => "G",
            SignalState::Red => "R",
            SignalState::Yellow => "Y",
        }
    }

    pub fn notification_type(&self) -> NotificationType {
        match self {
            SignalState::Green => NotificationType::Positive,
            SignalState::Red => NotificationType::Negative,
            SignalState::Yellow => NotificationType::Neutral,
        }
    }
}

/// Speed label shown next to the vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpeedTier {
    Slow,
    #[default]
    Normal,
    Fast,
    Paused,
}

impl From<NotificationType> for SpeedTier {
    fn from(kind: NotificationType) -> Self {
        match kind {
            NotificationType::Negative => SpeedTier::Slow,
            NotificationType::Neutral => SpeedTier::Normal,
            NotificationType::Positive => SpeedTier::Fast,
        }
    }
}

/// Cargo priority tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Criticality {
    #[default]
    Low,
    Medium,
    High,
}

impl Criticality {
    /// Parses case-insensitively; anything unrecognised is `Low`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Criticality::High,
            "MEDIUM" => Criticality::Medium,
            _ => Criticality::Low,
        }
    }

    /// Only high-priority cargo gets accident alerts on its route.
    pub fn accident_alerts_enabled(&self) -> bool {
        matches!(self, Criticality::High)
    }
}

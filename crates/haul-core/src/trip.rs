//! Trip inputs handed to the navigation screen.

use crate::models::{Criticality, GeoPoint};
use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_START: GeoPoint = GeoPoint::new(32.984774220294895, -96.74775350068155);
pub const DEFAULT_PICKUP: GeoPoint = GeoPoint::new(32.88981687057822, -97.03790148285134);
pub const DEFAULT_CARGO_ID: &str = "b2e0b559-4fe9-44b9-bd39-5946e4bc810e";
pub const DEFAULT_TERMINAL: &str = "A";

/// Parse `"lat,lng"`, optionally wrapped in parentheses.
pub fn parse_coordinate(value: &str) -> Result<GeoPoint, CoreError> {
    let invalid = || CoreError::InvalidCoordinate(value.to_string());

    let cleaned = value.trim().replace(['(', ')'], "");
    let mut parts = cleaned.split(',');
    let (Some(lat), Some(lng), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };

    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(invalid());
    }

    Ok(GeoPoint::new(lat, lng))
}

/// Normalise a terminal name to its single-letter code ("Terminal b" -> "B").
pub fn normalize_terminal(value: &str) -> String {
    value
        .trim()
        .chars()
        .last()
        .map(|c| c.to_ascii_uppercase().to_string())
        .unwrap_or_else(|| DEFAULT_TERMINAL.to_string())
}

/// Parking area per airport terminal, used as the parking reroute target.
pub fn default_terminal_parking() -> BTreeMap<String, GeoPoint> {
    [
        ("A", GeoPoint::new(32.90631503886106, -97.03792673073337)),
        ("B", GeoPoint::new(32.90484059614922, -97.04399519025002)),
        ("C", GeoPoint::new(32.89760968949179, -97.03761569547815)),
        ("D", GeoPoint::new(32.89786612394736, -97.04292974334649)),
        ("E", GeoPoint::new(32.89226253523804, -97.0378871915226)),
    ]
    .into_iter()
    .map(|(terminal, point)| (terminal.to_string(), point))
    .collect()
}

/// Everything a simulation run needs to know about the delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripPlan {
    pub schedule_id: String,
    pub start: GeoPoint,
    pub pickup: GeoPoint,
    pub dropoff: Option<GeoPoint>,
    pub criticality: Criticality,
    pub terminal: String,
    pub terminal_parking: BTreeMap<String, GeoPoint>,
}

impl Default for TripPlan {
    fn default() -> Self {
        Self {
            schedule_id: DEFAULT_CARGO_ID.to_string(),
            start: DEFAULT_START,
            pickup: DEFAULT_PICKUP,
            dropoff: None,
            criticality: Criticality::Low,
            terminal: DEFAULT_TERMINAL.to_string(),
            terminal_parking: default_terminal_parking(),
        }
    }
}

impl TripPlan {
    /// Build a plan from raw screen inputs.
    ///
    /// Unparseable pickup/dropoff strings fall back to the default location;
    /// the parse errors are returned alongside so the caller can report them.
    pub fn from_inputs(
        schedule_id: Option<&str>,
        criticality: Option<&str>,
        pickup: Option<&str>,
        dropoff: Option<&str>,
        terminal: Option<&str>,
    ) -> (Self, Vec<CoreError>) {
        let mut plan = TripPlan::default();
        let mut fallbacks = Vec::new();
        let mut coordinate_or_default = |raw: &str| {
            parse_coordinate(raw).unwrap_or_else(|err| {
                fallbacks.push(err);
                DEFAULT_PICKUP
            })
        };

        if let Some(id) = schedule_id.filter(|id| !id.trim().is_empty()) {
            plan.schedule_id = id.trim().to_string();
        }
        plan.criticality = criticality.map(Criticality::parse).unwrap_or_default();
        plan.terminal = terminal
            .map(normalize_terminal)
            .unwrap_or_else(|| DEFAULT_TERMINAL.to_string());
        plan.pickup = pickup.map(&mut coordinate_or_default).unwrap_or(DEFAULT_PICKUP);
        plan.dropoff = dropoff.map(&mut coordinate_or_default);

        (plan, fallbacks)
    }

    pub fn parking_for_terminal(&self) -> Option<GeoPoint> {
        self.terminal_parking.get(&self.terminal).copied()
    }
}

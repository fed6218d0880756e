//! Offline stand-in for the directions API.
//!
//! Answers with a straight interpolated path between origin and destination,
//! bent through an offset midpoint when highways are avoided, so reroutes
//! produce visibly different geometry.

use axum::{extract::Query, Json};
use haul_core::spatial::{distance_m, sample_segment};
use haul_core::{parse_coordinate, polyline, GeoPoint};
use serde::Deserialize;
use serde_json::{json, Value};

/// Metres between generated path points.
const POINT_SPACING_M: f64 = 100.0;
const MIN_POINTS: usize = 40;
const MAX_POINTS: usize = 400;
/// A maneuver step is emitted every this many path points.
const MANEUVER_EVERY: usize = 20;
/// Perpendicular midpoint offset (degrees) for the highway-avoiding detour.
const DETOUR_OFFSET_DEG: f64 = 0.01;

#[derive(Debug, Deserialize)]
pub struct DirectionsQuery {
    pub origin: Option<String>,
    pub destination: Option<String>,
    #[serde(default)]
    pub avoid: Option<String>,
}

pub async fn get_directions(Query(query): Query<DirectionsQuery>) -> Json<Value> {
    let endpoints = query
        .origin
        .as_deref()
        .zip(query.destination.as_deref())
        .map(|(o, d)| (parse_coordinate(o), parse_coordinate(d)));

    let Some((Ok(origin), Ok(destination))) = endpoints else {
        tracing::warn!("Rejected directions request: {:?}", query);
        return Json(json!({ "status": "INVALID_REQUEST", "routes": [] }));
    };

    let avoid_highways = query
        .avoid
        .as_deref()
        .is_some_and(|avoid| avoid.split('|').any(|v| v == "highways"));
    let path = synthetic_path(origin, destination, avoid_highways);

    tracing::info!(
        "Synthetic route {} -> {}: {} points (avoid highways: {})",
        origin,
        destination,
        path.len(),
        avoid_highways
    );

    Json(directions_body(&path))
}

/// Build the path the mock serves for a request.
pub fn synthetic_path(origin: GeoPoint, destination: GeoPoint, avoid_highways: bool) -> Vec<GeoPoint> {
    let count = ((distance_m(origin, destination) / POINT_SPACING_M).ceil() as usize)
        .clamp(MIN_POINTS, MAX_POINTS);

    if !avoid_highways {
        return sample_segment(origin, destination, count);
    }

    let mid = GeoPoint::new(
        (origin.lat + destination.lat) / 2.0,
        (origin.lng + destination.lng) / 2.0,
    );
    // perpendicular to the origin->destination direction
    let (d_lat, d_lng) = (destination.lat - origin.lat, destination.lng - origin.lng);
    let norm = d_lat.hypot(d_lng);
    let detour = if norm > 0.0 {
        GeoPoint::new(
            mid.lat - d_lng / norm * DETOUR_OFFSET_DEG,
            mid.lng + d_lat / norm * DETOUR_OFFSET_DEG,
        )
    } else {
        mid
    };

    let half = count / 2 + 1;
    let mut path = sample_segment(origin, detour, half);
    path.pop();
    path.extend(sample_segment(detour, destination, half));
    path
}

fn directions_body(path: &[GeoPoint]) -> Value {
    let steps: Vec<Value> = path
        .iter()
        .enumerate()
        .step_by(MANEUVER_EVERY)
        .map(|(index, point)| {
            let location = json!({ "lat": point.lat, "lng": point.lng });
            match index {
                // departure step carries no maneuver
                0 => json!({ "start_location": location }),
                _ if (index / MANEUVER_EVERY) % 2 == 1 => {
                    json!({ "maneuver": "turn-left", "start_location": location })
                }
                _ => json!({ "maneuver": "turn-right", "start_location": location }),
            }
        })
        .collect();

    json!({
        "status": "OK",
        "routes": [{
            "overview_polyline": { "points": polyline::encode(path) },
            "legs": [{ "steps": steps }],
        }],
    })
}

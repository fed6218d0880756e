//! Traffic alert placement along a route.

use crate::models::{GeoPoint, TrafficAlert};

/// Navigation messages shown during a run, in placement order.
///
/// The accident message must stay last: it is the one placed near the end
/// of the route instead of on the even grid.
pub const NAVIGATION_MESSAGES: [&str; 12] = [
    "School zone ahead, reduce speed",
    "Heavy traffic ahead",
    "Construction zone, Beware of Surrounding",
    "Speed limit changed to 55 mph",
    "Weather alert: Rain detected",
    "Toll booth ahead",
    "Speed camera ahead",
    "Rest area in 2 miles",
    "Traffic signal turning green",
    "Pedestrian crossing ahead",
    "Sharp turn ahead, reduce speed",
    "Accident reported - Rerouting!",
];

/// Ids of regenerated alerts start here so they never collide with the originals.
pub const REMAINING_ALERT_ID_OFFSET: u32 = 100;

const ACCIDENT_PLACEMENT_FRACTION: f64 = 0.9;

pub fn is_accident_message(message: &str) -> bool {
    message.to_ascii_lowercase().contains("accident")
}

pub fn alert_title(message: &str) -> &'static str {
    if is_accident_message(message) {
        "Accident Alert"
    } else {
        "Traffic Alert"
    }
}

/// Spread the catalog evenly over `route`.
///
/// Every message but the last sits at `route[i * (len / n)]`; the last one
/// sits at `route[floor(len * 0.9)]`. Accident messages are dropped when
/// `enable_accident` is false. Routes shorter than the catalog get no alerts.
pub fn generate_equally_spaced_alerts(
    route: &[GeoPoint],
    catalog: &[&str],
    enable_accident: bool,
) -> Vec<TrafficAlert> {
    let count = catalog.len();
    if count == 0 || route.len() < count {
        return Vec::new();
    }

    let segment = route.len() / count;
    let mut alerts = Vec::with_capacity(count);

    for (i, message) in catalog.iter().enumerate() {
        if !enable_accident && is_accident_message(message) {
            continue;
        }

        let index = if i == count - 1 {
            ((route.len() as f64 * ACCIDENT_PLACEMENT_FRACTION) as usize).min(route.len() - 1)
        } else {
            i * segment
        };

        alerts.push(TrafficAlert {
            id: i as u32 + 1,
            position: route[index],
            message: (*message).to_string(),
            title: alert_title(message).to_string(),
        });
    }

    alerts
}

/// Spread the messages not yet shown over a post-reroute remaining route.
///
/// Plain even spacing, ids offset by [`REMAINING_ALERT_ID_OFFSET`].
pub fn generate_remaining_alerts<S: AsRef<str>>(
    remaining_route: &[GeoPoint],
    remaining_messages: &[S],
) -> Vec<TrafficAlert> {
    let count = remaining_messages.len();
    if count == 0 || remaining_route.len() < count {
        return Vec::new();
    }

    let segment = remaining_route.len() / count;

    remaining_messages
        .iter()
        .enumerate()
        .map(|(i, message)| {
            let message = message.as_ref();
            TrafficAlert {
                id: i as u32 + REMAINING_ALERT_ID_OFFSET,
                position: remaining_route[i * segment],
                message: message.to_string(),
                title: alert_title(message).to_string(),
            }
        })
        .collect()
}

//! Timing and distance rules for the navigation simulation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for simulation pacing and notification handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRules {
    /// Tick period at normal speed (ms)
    pub base_interval_ms: u64,
    /// Distance at which the vehicle counts as having passed an agent (meters)
    pub agent_arrival_radius_m: f64,
    /// Query the DALI backend every N steps
    pub agent_query_every_steps: usize,
    /// Route-completion checkpoints for airport status calls (percent)
    pub airport_milestones_pct: Vec<u32>,
    /// Minimum gap between an airport call and the previous notification (ms)
    pub min_notification_gap_ms: u64,
    /// Messages arriving closer together than this are dropped (ms)
    pub debounce_ms: u64,
    /// Delay before a telemetry-driven speed change applies (ms)
    pub speed_change_delay_ms: u64,
    /// Delay before a directly displayed notification changes speed (ms)
    pub direct_speed_change_delay_ms: u64,
    /// Delay between an accident banner and the reroute (ms)
    pub accident_reroute_delay_ms: u64,
    /// Delay between a parking notice and the parking reroute (ms)
    pub parking_reroute_delay_ms: u64,
    /// Distance at which a traffic alert fires (meters)
    pub alert_trigger_radius_m: f64,
    /// Camera zoom used when a leg starts
    pub camera_zoom: f32,
    /// Route fetch retries before the drive loop halts
    pub route_retry_limit: u32,
    /// First route retry delay (ms), doubled per attempt
    pub route_retry_base_ms: u64,
    /// Upper bound on the route retry delay (ms)
    pub route_retry_max_ms: u64,
}

impl Default for SimulationRules {
    fn default() -> Self {
        Self {
            base_interval_ms: 300,
            agent_arrival_radius_m: 30.0,
            agent_query_every_steps: 15,
            airport_milestones_pct: vec![15, 30, 45, 60, 75, 90],
            min_notification_gap_ms: 1_000,
            debounce_ms: 1_000,
            speed_change_delay_ms: 300,
            direct_speed_change_delay_ms: 200,
            accident_reroute_delay_ms: 1_500,
            parking_reroute_delay_ms: 800,
            alert_trigger_radius_m: 30.0,
            camera_zoom: 17.0,
            route_retry_limit: 2,
            route_retry_base_ms: 1_000,
            route_retry_max_ms: 8_000,
        }
    }
}

impl SimulationRules {
    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(self.base_interval_ms.max(1))
    }

    pub fn min_notification_gap(&self) -> Duration {
        Duration::from_millis(self.min_notification_gap_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn speed_change_delay(&self) -> Duration {
        Duration::from_millis(self.speed_change_delay_ms)
    }

    pub fn direct_speed_change_delay(&self) -> Duration {
        Duration::from_millis(self.direct_speed_change_delay_ms)
    }

    pub fn accident_reroute_delay(&self) -> Duration {
        Duration::from_millis(self.accident_reroute_delay_ms)
    }

    pub fn parking_reroute_delay(&self) -> Duration {
        Duration::from_millis(self.parking_reroute_delay_ms)
    }

    pub fn route_retry_base(&self) -> Duration {
        Duration::from_millis(self.route_retry_base_ms)
    }

    pub fn route_retry_max(&self) -> Duration {
        Duration::from_millis(self.route_retry_max_ms)
    }
}

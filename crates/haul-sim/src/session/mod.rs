//! Navigation simulation state machine.
//!
//! A [`NavigationSession`] owns all simulation state and is only ever
//! touched by one task. It never performs I/O itself: operations return
//! [`Command`]s for the driver to run, and async results come back in as
//! [`SessionEvent`]s stamped with the route generation they belong to.
//! Timers (drive ticks, delayed speed changes, delayed reroutes, route
//! retries) are deadlines the driver sleeps until before calling
//! [`NavigationSession::fire_due`].

mod events;

pub use events::{Command, RerouteReason, SessionEvent, Telemetry};

use haul_client::{AirportQuery, FetchedRoute, RouteRequest};
use haul_core::alerts::is_accident_message;
use haul_core::spatial::{distance_m, route_progress};
use haul_core::{
    agent_number, generate_equally_spaced_alerts, generate_remaining_alerts, number_agents, Agent,
    GeoPoint, NavigationPhase, NotificationType, SignalState, SimulationRules, SpeedTier,
    TrafficAlert, TripPlan, NAVIGATION_MESSAGES,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::backoff::Backoff;
use crate::camera::{CameraState, MarkerAnimation};
use crate::notifications::{Banner, FollowUp, NotificationProcessor, ProcessOutcome};

pub const ROUTE_UNAVAILABLE: &str = "Route unavailable";
const STARTING_NAVIGATION: &str = "Starting Navigation";
const PICKUP_REACHED: &str = "Pickup destination reached! Ready for dropoff.";
const DROPOFF_REACHED: &str = "Dropoff destination reached! Delivery completed.";
const NO_DROPOFF: &str = "Error: No dropoff location available";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("route has not been loaded yet")]
    RouteNotReady,
    #[error("operation not allowed in phase {0}")]
    InvalidPhase(NavigationPhase),
    #[error("trip has no dropoff location")]
    NoDropoff,
    #[error("no dropoff confirmation is pending")]
    NotAwaitingConfirmation,
}

/// Label and purpose of the main navigation button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NavButton {
    StartPickup,
    NavigatingToPickup,
    StartDropoff,
    NavigatingToDropoff,
    DeliveryCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    /// Hidden but comes back on the next leg.
    Hidden,
    /// Gone for good.
    Removed,
}

/// State of the on-screen controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    pub nav_button: NavButton,
    pub nav_enabled: bool,
    /// Pause and follow toggles.
    pub vehicle_controls: Visibility,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            nav_button: NavButton::StartPickup,
            nav_enabled: true,
            vehicle_controls: Visibility::Hidden,
        }
    }
}

/// Read-only view of a session for logging and assertions.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub phase: NavigationPhase,
    pub generation: u64,
    pub step: usize,
    pub path_len: usize,
    pub position: GeoPoint,
    pub speed_tier: SpeedTier,
    pub interval_ms: u64,
    pub running: bool,
    pub paused: bool,
    pub rerouting: bool,
    pub halted: bool,
    pub banner: Option<Banner>,
    pub current_agent: Option<String>,
    pub processed_agents: Vec<String>,
    pub alerts: usize,
    pub controls: ControlState,
    pub camera: CameraState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchPurpose {
    /// Fresh route for a pickup or dropoff leg.
    Leg { start_when_ready: bool },
    /// Replacement for the path after `prefix_len` travelled points.
    Reroute {
        reason: RerouteReason,
        prefix_len: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct PendingFetch {
    request: RouteRequest,
    purpose: FetchPurpose,
    failures: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    SpeedChange,
    Tick,
    Reroute,
    RetryRoute,
}

pub struct NavigationSession {
    plan: TripPlan,
    rules: SimulationRules,
    phase: NavigationPhase,
    leg_destination: GeoPoint,

    path: Vec<GeoPoint>,
    previously_traveled: Vec<GeoPoint>,
    step: usize,

    agents: Vec<Agent>,
    agent_index: usize,
    agent_baseline_m: Option<f64>,
    baseline_pending: bool,
    processed_agents: BTreeMap<String, GeoPoint>,

    alerts: Vec<TrafficAlert>,
    triggered_alerts: HashSet<u32>,
    triggered_milestones: BTreeSet<u32>,
    shown_messages: HashSet<String>,

    interval: Duration,
    speed_tier: SpeedTier,
    running: bool,
    paused: bool,
    destination_reached: bool,
    traffic_enabled: bool,
    awaiting_dropoff_confirmation: bool,
    halted: bool,

    generation: u64,
    fetch: Option<PendingFetch>,
    route_backoff: Backoff,

    next_tick_at: Option<Instant>,
    pending_reroute: Option<(Instant, RerouteReason)>,
    retry_at: Option<Instant>,
    last_notification_at: Option<Instant>,

    processor: NotificationProcessor,
    marker: MarkerAnimation,
    camera: CameraState,
    controls: ControlState,
}

impl NavigationSession {
    pub fn new(plan: TripPlan, rules: SimulationRules, now: Instant) -> Self {
        let start = plan.start;
        Self {
            leg_destination: plan.pickup,
            phase: NavigationPhase::ToPickup,
            path: Vec::new(),
            previously_traveled: Vec::new(),
            step: 0,
            agents: Vec::new(),
            agent_index: 0,
            agent_baseline_m: None,
            baseline_pending: true,
            processed_agents: BTreeMap::new(),
            alerts: Vec::new(),
            triggered_alerts: HashSet::new(),
            triggered_milestones: BTreeSet::new(),
            shown_messages: HashSet::new(),
            interval: rules.base_interval(),
            speed_tier: SpeedTier::Normal,
            running: false,
            paused: false,
            destination_reached: false,
            traffic_enabled: true,
            awaiting_dropoff_confirmation: false,
            halted: false,
            generation: 0,
            fetch: None,
            route_backoff: Backoff::new(rules.route_retry_base(), rules.route_retry_max()),
            next_tick_at: None,
            pending_reroute: None,
            retry_at: None,
            last_notification_at: None,
            processor: NotificationProcessor::new(&rules),
            marker: MarkerAnimation::resting(start, now),
            camera: CameraState::new(start, rules.camera_zoom),
            controls: ControlState::default(),
            plan,
            rules,
        }
    }

    // ---------------------------------------------------------------
    // User operations
    // ---------------------------------------------------------------

    /// Fetch the route from the start location to pickup.
    pub fn load_initial_route(&mut self) -> Vec<Command> {
        self.leg_destination = self.plan.pickup;
        let request = RouteRequest {
            origin: self.plan.start,
            destination: self.plan.pickup,
            avoid_highways: false,
        };
        self.request_route(request, FetchPurpose::Leg { start_when_ready: false })
    }

    /// Begin driving to pickup along the loaded route.
    pub fn start_navigation(&mut self, now: Instant) -> Result<(), SessionError> {
        if self.phase != NavigationPhase::ToPickup || self.running || self.destination_reached {
            return Err(SessionError::InvalidPhase(self.phase));
        }
        if self.path.is_empty() || self.fetch.is_some() {
            return Err(SessionError::RouteNotReady);
        }

        self.reset_progress();
        self.controls.nav_button = NavButton::NavigatingToPickup;
        self.controls.nav_enabled = false;
        self.camera.following = true;
        self.start_simulation(now, false, true);
        Ok(())
    }

    /// Ask to continue to dropoff; waits for [`confirm_dropoff`] or
    /// [`cancel_dropoff`].
    ///
    /// [`confirm_dropoff`]: Self::confirm_dropoff
    /// [`cancel_dropoff`]: Self::cancel_dropoff
    pub fn start_dropoff(&mut self, now: Instant) -> Result<(), SessionError> {
        if self.phase != NavigationPhase::AtPickup {
            return Err(SessionError::InvalidPhase(self.phase));
        }
        if self.plan.dropoff.is_none() {
            tracing::error!("Cannot start dropoff navigation: no dropoff location");
            self.show(now, NO_DROPOFF, NotificationType::Negative);
            return Err(SessionError::NoDropoff);
        }

        self.set_phase(NavigationPhase::ToDropoff);
        self.awaiting_dropoff_confirmation = true;
        self.destination_reached = false;
        self.traffic_enabled = true;
        Ok(())
    }

    /// Confirm the dropoff leg: full reset, then fetch the dropoff route.
    pub fn confirm_dropoff(&mut self) -> Result<Vec<Command>, SessionError> {
        if !self.awaiting_dropoff_confirmation {
            return Err(SessionError::NotAwaitingConfirmation);
        }
        let dropoff = self.plan.dropoff.ok_or(SessionError::NoDropoff)?;

        self.awaiting_dropoff_confirmation = false;
        self.controls.nav_button = NavButton::NavigatingToDropoff;
        self.controls.nav_enabled = false;

        let origin = self.path.last().copied().unwrap_or(self.plan.pickup);
        self.reset_progress();
        self.processed_agents.clear();
        self.shown_messages.clear();
        self.leg_destination = dropoff;

        tracing::info!("Starting navigation from {} to dropoff {}", origin, dropoff);
        let request = RouteRequest {
            origin,
            destination: dropoff,
            avoid_highways: false,
        };
        Ok(self.request_route(request, FetchPurpose::Leg { start_when_ready: true }))
    }

    /// Back out of the dropoff confirmation.
    pub fn cancel_dropoff(&mut self) -> Result<(), SessionError> {
        if !self.awaiting_dropoff_confirmation {
            return Err(SessionError::NotAwaitingConfirmation);
        }

        tracing::info!("Dropoff navigation cancelled");
        self.awaiting_dropoff_confirmation = false;
        self.set_phase(NavigationPhase::AtPickup);
        self.destination_reached = true;
        self.traffic_enabled = false;
        self.controls.nav_button = NavButton::StartDropoff;
        self.controls.nav_enabled = true;
        Ok(())
    }

    /// Stop or resume the vehicle. Returns the new paused flag.
    pub fn toggle_pause(&mut self, now: Instant) -> Result<bool, SessionError> {
        if !self.running {
            return Err(SessionError::InvalidPhase(self.phase));
        }

        self.paused = !self.paused;
        if self.paused {
            tracing::info!("Vehicle stopped at step {}", self.step);
            self.next_tick_at = None;
            self.processor.cancel_pending();
            self.speed_tier = SpeedTier::Paused;
        } else {
            tracing::info!("Vehicle moving again");
            match self.processor.last_notification_type() {
                Some(kind) => self.adjust_speed(kind, now),
                None => {
                    self.interval = self.rules.base_interval();
                    self.speed_tier = SpeedTier::Normal;
                    self.schedule_tick(now);
                }
            }
        }
        Ok(self.paused)
    }

    /// Apply the tick period for a notification type and reschedule the
    /// pending tick. Ignored while paused.
    pub fn adjust_speed(&mut self, kind: NotificationType, now: Instant) {
        if self.paused {
            return;
        }

        let old = self.interval;
        let base = self.rules.base_interval();
        self.interval = match kind {
            NotificationType::Negative => base * 2,
            NotificationType::Neutral => base,
            NotificationType::Positive => base / 2,
        };
        self.speed_tier = SpeedTier::from(kind);
        tracing::info!(
            "Speed adjusted: {} ms -> {} ms ({:?})",
            old.as_millis(),
            self.interval.as_millis(),
            self.speed_tier
        );

        self.schedule_tick(now);
    }

    pub fn toggle_follow(&mut self, now: Instant) -> bool {
        let marker = self.marker.position_at(now);
        self.camera.toggle_follow(marker)
    }

    /// Manual pan or zoom; always drops follow mode.
    pub fn user_gesture(&mut self, zoom: Option<f32>) {
        self.camera.user_gesture(zoom);
    }

    /// Marker position for this frame; moves the camera when following.
    pub fn animation_frame(&mut self, now: Instant) -> GeoPoint {
        let position = self.marker.position_at(now);
        self.camera.on_frame(position);
        position
    }

    // ---------------------------------------------------------------
    // Timers
    // ---------------------------------------------------------------

    /// Earliest instant at which [`fire_due`](Self::fire_due) has work.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.processor.next_deadline(),
            self.next_tick_at,
            self.pending_reroute.map(|(at, _)| at),
            self.retry_at,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Run every timer due at `now`, earliest first.
    pub fn fire_due(&mut self, now: Instant) -> Vec<Command> {
        let mut commands = Vec::new();
        while let Some(timer) = self.due_timer(now) {
            match timer {
                Timer::SpeedChange => {
                    if let Some(kind) = self.processor.poll_speed_change(now) {
                        self.adjust_speed(kind, now);
                    }
                }
                Timer::Tick => commands.extend(self.tick(now)),
                Timer::Reroute => {
                    if let Some((_, reason)) = self.pending_reroute.take() {
                        commands.extend(self.begin_reroute(reason));
                    }
                }
                Timer::RetryRoute => commands.extend(self.retry_route()),
            }
        }
        commands
    }

    fn due_timer(&self, now: Instant) -> Option<Timer> {
        [
            (self.processor.next_deadline(), Timer::SpeedChange),
            (self.next_tick_at, Timer::Tick),
            (self.pending_reroute.map(|(at, _)| at), Timer::Reroute),
            (self.retry_at, Timer::RetryRoute),
        ]
        .into_iter()
        .filter_map(|(at, timer)| at.filter(|at| *at <= now).map(|at| (at, timer)))
        .min_by_key(|(at, _)| *at)
        .map(|(_, timer)| timer)
    }

    fn schedule_tick(&mut self, now: Instant) {
        if self.running && !self.paused && !self.destination_reached && !self.is_rerouting() {
            self.next_tick_at = Some(now + self.interval);
        }
    }

    // ---------------------------------------------------------------
    // Drive loop
    // ---------------------------------------------------------------

    fn start_simulation(&mut self, now: Instant, paused: bool, first_time: bool) {
        tracing::info!(
            "Starting simulation in phase {} (paused: {})",
            self.phase,
            paused
        );

        self.interval = self.rules.base_interval();
        self.speed_tier = if paused {
            SpeedTier::Paused
        } else {
            SpeedTier::Normal
        };
        self.paused = paused;
        self.running = true;
        self.controls.vehicle_controls = Visibility::Visible;

        if first_time {
            self.notify(now, STARTING_NAVIGATION, None);
        }
        self.schedule_tick(now);
    }

    fn reset_progress(&mut self) {
        self.step = 0;
        self.agent_index = 0;
        self.baseline_pending = true;
        self.agent_baseline_m = None;
        self.triggered_alerts.clear();
        self.triggered_milestones.clear();
        self.previously_traveled.clear();
        self.destination_reached = false;
        self.traffic_enabled = true;
        self.paused = false;
        self.interval = self.rules.base_interval();
        self.speed_tier = SpeedTier::Normal;
    }

    fn tick(&mut self, now: Instant) -> Vec<Command> {
        self.next_tick_at = None;
        if !self.running || self.paused || self.is_rerouting() {
            return Vec::new();
        }

        if self.step + 1 >= self.path.len() {
            self.handle_destination_reached(now);
            return Vec::new();
        }

        let current = self.path[self.step];
        let next = self.path[self.step + 1];
        self.marker = MarkerAnimation::start(current, next, now, self.interval);

        let events = if self.traffic_enabled {
            self.step_events(current, now)
        } else {
            Vec::new()
        };

        self.step += 1;
        self.schedule_tick(now);

        events
            .into_iter()
            .flat_map(|event| self.handle(event, now))
            .collect()
    }

    /// Events raised by the vehicle standing at `current`.
    fn step_events(&mut self, current: GeoPoint, now: Instant) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        if let Some(agent) = self.agents.get(self.agent_index).cloned() {
            let distance = distance_m(current, agent.position);
            if self.baseline_pending {
                self.agent_baseline_m = Some(distance);
                self.baseline_pending = false;
            }
            tracing::trace!(
                "{} at {:.1} m (baseline {:?})",
                agent.name,
                distance,
                self.agent_baseline_m
            );

            if distance <= self.rules.agent_arrival_radius_m {
                events.push(SessionEvent::AgentReached {
                    agent: agent.clone(),
                });
            }
            let every = self.rules.agent_query_every_steps;
            if every > 0 && self.step % every == 0 {
                events.push(SessionEvent::AgentQueryDue { agent });
            }
        }

        events.extend(
            self.alerts
                .iter()
                .filter(|alert| !self.triggered_alerts.contains(&alert.id))
                .filter(|alert| {
                    distance_m(current, alert.position) <= self.rules.alert_trigger_radius_m
                })
                .cloned()
                .map(SessionEvent::AlertReached),
        );

        if self.phase == NavigationPhase::ToPickup && self.notification_gap_elapsed(now) {
            let progress = route_progress(self.step, self.path.len()) * 100.0;
            let milestone = self
                .rules
                .airport_milestones_pct
                .iter()
                .copied()
                .find(|pct| progress >= f64::from(*pct) && !self.triggered_milestones.contains(pct));
            if let Some(percent) = milestone {
                events.push(SessionEvent::MilestoneHit {
                    percent,
                    position: current,
                });
            }
        }

        events
    }

    fn notification_gap_elapsed(&self, now: Instant) -> bool {
        self.last_notification_at.map_or(true, |last| {
            now.saturating_duration_since(last) >= self.rules.min_notification_gap()
        })
    }

    /// Advance the phase at the end of the path. Only the first call per
    /// leg has any effect; returns whether this call did. Ignored unless a
    /// leg is being driven.
    pub fn handle_destination_reached(&mut self, now: Instant) -> bool {
        if self.destination_reached {
            tracing::debug!("Destination already handled in phase {}", self.phase);
            return false;
        }
        if !self.running || self.awaiting_dropoff_confirmation {
            tracing::debug!("No leg in progress in phase {}", self.phase);
            return false;
        }

        tracing::info!("Destination reached in phase {}", self.phase);
        self.destination_reached = true;
        self.traffic_enabled = false;
        self.running = false;
        self.next_tick_at = None;
        self.pending_reroute = None;
        self.camera.following = false;

        match self.phase {
            NavigationPhase::ToPickup => {
                self.set_phase(NavigationPhase::AtPickup);
                self.controls = ControlState {
                    nav_button: NavButton::StartDropoff,
                    nav_enabled: true,
                    vehicle_controls: Visibility::Hidden,
                };
                self.show(now, PICKUP_REACHED, NotificationType::Positive);
            }
            NavigationPhase::ToDropoff => {
                self.set_phase(NavigationPhase::Completed);
                self.controls = ControlState {
                    nav_button: NavButton::DeliveryCompleted,
                    nav_enabled: true,
                    vehicle_controls: Visibility::Removed,
                };
                self.show(now, DROPOFF_REACHED, NotificationType::Positive);
                self.processor.set_enabled(false);
            }
            other => tracing::warn!("Destination reached in unexpected phase {}", other),
        }
        true
    }

    // ---------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------

    /// Process one event and return the async work it asks for.
    pub fn handle(&mut self, event: SessionEvent, now: Instant) -> Vec<Command> {
        match event {
            SessionEvent::AgentReached { agent } => {
                let is_current = self
                    .agents
                    .get(self.agent_index)
                    .is_some_and(|current| current.name == agent.name);
                if is_current {
                    tracing::debug!("Passed {} at step {}", agent.name, self.step);
                    self.agent_index += 1;
                    self.baseline_pending = true;
                }
                Vec::new()
            }
            SessionEvent::AgentQueryDue { agent } => {
                tracing::debug!("Agent processed: {}", agent.name);
                self.processed_agents
                    .insert(agent.name.clone(), agent.position);
                vec![Command::QueryAgent {
                    generation: self.generation,
                    agent: agent.name,
                }]
            }
            SessionEvent::MilestoneHit { percent, position } => {
                if !self.triggered_milestones.insert(percent) {
                    return Vec::new();
                }
                tracing::info!("Airport milestone {}% reached", percent);
                self.last_notification_at = Some(now);
                vec![Command::QueryAirport {
                    generation: self.generation,
                    query: AirportQuery {
                        position,
                        cargo_id: self.plan.schedule_id.clone(),
                        terminal: self.plan.terminal.clone(),
                    },
                }]
            }
            SessionEvent::AlertReached(alert) => {
                // Left untriggered when debounced so a later tick in range retries it.
                if !self.triggered_alerts.contains(&alert.id)
                    && self.notify(now, &alert.message, None)
                {
                    tracing::info!("{} #{}: {}", alert.title, alert.id, alert.message);
                    self.triggered_alerts.insert(alert.id);
                    self.shown_messages.insert(alert.message);
                }
                Vec::new()
            }
            SessionEvent::TelemetryReceived {
                generation,
                telemetry,
            } => {
                if generation != self.generation {
                    tracing::debug!(
                        "Dropping stale telemetry from generation {} (current {})",
                        generation,
                        self.generation
                    );
                    return Vec::new();
                }
                if !self.traffic_enabled {
                    tracing::debug!("Traffic notifications off, ignoring {:?}", telemetry);
                    return Vec::new();
                }
                match telemetry {
                    Telemetry::Agent { agent, signal } => {
                        tracing::info!("[{}] {}", agent, signal.message);
                        self.notify(now, &signal.message, signal.state);
                    }
                    Telemetry::Airport(status) => {
                        tracing::info!("Airport: {}", status.message);
                        self.notify(now, &status.message, None);
                    }
                }
                Vec::new()
            }
            SessionEvent::RouteReady { generation, route } => {
                self.on_route_ready(generation, route, now)
            }
            SessionEvent::RouteFailed { generation, error } => {
                self.on_route_failed(generation, &error, now)
            }
        }
    }

    /// Feed a message through the processor and act on its follow-ups.
    fn notify(&mut self, now: Instant, message: &str, state: Option<SignalState>) -> bool {
        match self.processor.process(now, message, state) {
            ProcessOutcome::Accepted { follow_ups, .. } => {
                self.last_notification_at = Some(now);
                for follow_up in follow_ups {
                    match follow_up {
                        FollowUp::AccidentReroute { after } => {
                            self.schedule_reroute(RerouteReason::Accident, now + after)
                        }
                        FollowUp::ParkingAvailable { after } => {
                            self.schedule_reroute(RerouteReason::Parking, now + after)
                        }
                        FollowUp::PullOver => self.pull_over(),
                    }
                }
                true
            }
            ProcessOutcome::Debounced | ProcessOutcome::Disabled => false,
        }
    }

    /// System message with an explicit type.
    fn show(&mut self, now: Instant, message: &str, kind: NotificationType) {
        if self.processor.display(now, message, kind, self.paused) {
            self.last_notification_at = Some(now);
        }
    }

    fn pull_over(&mut self) {
        tracing::info!("Pulling over near rest area");
        self.paused = true;
        self.next_tick_at = None;
        self.speed_tier = SpeedTier::Paused;
    }

    // ---------------------------------------------------------------
    // Routes
    // ---------------------------------------------------------------

    fn request_route(&mut self, request: RouteRequest, purpose: FetchPurpose) -> Vec<Command> {
        self.generation += 1;
        self.fetch = Some(PendingFetch {
            request,
            purpose,
            failures: 0,
        });
        self.retry_at = None;
        self.route_backoff.reset();

        tracing::info!(
            "Requesting route {} -> {} (generation {}, avoid highways: {})",
            request.origin,
            request.destination,
            self.generation,
            request.avoid_highways
        );
        vec![Command::FetchRoute {
            generation: self.generation,
            request,
        }]
    }

    fn retry_route(&mut self) -> Vec<Command> {
        self.retry_at = None;
        let Some(fetch) = self.fetch else {
            return Vec::new();
        };

        self.generation += 1;
        tracing::info!(
            "Retrying route fetch (attempt {}, generation {})",
            fetch.failures + 1,
            self.generation
        );
        vec![Command::FetchRoute {
            generation: self.generation,
            request: fetch.request,
        }]
    }

    fn schedule_reroute(&mut self, reason: RerouteReason, at: Instant) {
        if self.pending_reroute.is_some() || self.is_rerouting() {
            tracing::debug!("Reroute already in progress, ignoring {:?}", reason);
            return;
        }
        self.pending_reroute = Some((at, reason));
    }

    fn begin_reroute(&mut self, reason: RerouteReason) -> Vec<Command> {
        if !self.running || self.destination_reached || self.is_rerouting() {
            tracing::debug!("Skipping {:?} reroute, vehicle not driving", reason);
            return Vec::new();
        }

        let destination = match reason {
            RerouteReason::Accident => self.leg_destination,
            RerouteReason::Parking => match self.plan.parking_for_terminal() {
                Some(parking) => parking,
                None => {
                    tracing::error!("No parking location for terminal {}", self.plan.terminal);
                    return Vec::new();
                }
            },
        };

        self.next_tick_at = None;
        if let Some(agent) = self.agents.get(self.agent_index) {
            self.processed_agents
                .insert(agent.name.clone(), agent.position);
        }

        let prefix_len = self.step.min(self.path.len());
        let origin = self
            .path
            .get(self.step)
            .or(self.path.last())
            .copied()
            .unwrap_or(self.plan.start);
        self.leg_destination = destination;

        tracing::info!(
            "Reroute ({:?}) started at step {}, {} agents processed",
            reason,
            self.step,
            self.processed_agents.len()
        );
        let request = RouteRequest {
            origin,
            destination,
            avoid_highways: true,
        };
        self.request_route(request, FetchPurpose::Reroute { reason, prefix_len })
    }

    fn on_route_ready(&mut self, generation: u64, route: FetchedRoute, now: Instant) -> Vec<Command> {
        if generation != self.generation {
            tracing::debug!(
                "Dropping stale route from generation {} (current {})",
                generation,
                self.generation
            );
            return Vec::new();
        }
        if route.path.is_empty() {
            return self.on_route_failed(generation, "route has no points", now);
        }
        let Some(fetch) = self.fetch.take() else {
            tracing::debug!("No route fetch pending, ignoring route");
            return Vec::new();
        };
        self.retry_at = None;
        self.route_backoff.reset();

        match fetch.purpose {
            FetchPurpose::Leg { start_when_ready } => {
                self.install_leg(route, now);
                if start_when_ready {
                    self.start_simulation(now, false, true);
                }
            }
            FetchPurpose::Reroute { reason, prefix_len } => {
                self.splice_reroute(route, prefix_len, now);
                tracing::info!(
                    "Reroute ({:?}) finished: path now {} points, resuming at step {}",
                    reason,
                    self.path.len(),
                    self.step
                );
                let paused = self.paused;
                self.start_simulation(now, paused, false);
            }
        }
        Vec::new()
    }

    fn install_leg(&mut self, route: FetchedRoute, now: Instant) {
        self.agents = number_agents(route.agents.iter().map(|agent| agent.position), 1);
        self.agent_index = 0;
        self.baseline_pending = true;
        self.alerts = generate_equally_spaced_alerts(
            &route.path,
            &NAVIGATION_MESSAGES,
            self.plan.criticality.accident_alerts_enabled(),
        );
        self.path = route.path;
        self.step = 0;

        let start = self.path[0];
        self.marker = MarkerAnimation::resting(start, now);
        self.camera.reset(start, self.rules.camera_zoom);

        tracing::info!(
            "Route ready for {}: {} points, {} agents, {} alerts",
            self.phase,
            self.path.len(),
            self.agents.len(),
            self.alerts.len()
        );
    }

    fn splice_reroute(&mut self, route: FetchedRoute, prefix_len: usize, now: Instant) {
        let prefix_len = prefix_len.min(self.path.len());
        self.previously_traveled = self.path[..prefix_len].to_vec();

        let next_number = self
            .processed_agents
            .keys()
            .filter_map(|name| agent_number(name))
            .max()
            .unwrap_or(0)
            + 1;
        self.agents = number_agents(route.agents.iter().map(|agent| agent.position), next_number);
        self.agent_index = 0;
        self.baseline_pending = true;

        let accident_enabled = self.plan.criticality.accident_alerts_enabled();
        let remaining: Vec<&str> = NAVIGATION_MESSAGES
            .iter()
            .copied()
            .filter(|message| !self.shown_messages.contains(*message))
            .filter(|message| accident_enabled || !is_accident_message(message))
            .collect();
        self.alerts = generate_remaining_alerts(&route.path, &remaining);
        self.triggered_alerts.clear();

        let mut path = self.previously_traveled.clone();
        path.extend(route.path);
        self.path = path;
        self.step = prefix_len;

        if let Some(position) = self.path.get(self.step) {
            self.marker = MarkerAnimation::resting(*position, now);
        }
    }

    fn on_route_failed(&mut self, generation: u64, error: &str, now: Instant) -> Vec<Command> {
        if generation != self.generation {
            tracing::debug!("Dropping stale route failure from generation {}", generation);
            return Vec::new();
        }
        let Some(fetch) = self.fetch.as_mut() else {
            return Vec::new();
        };

        fetch.failures += 1;
        tracing::warn!("Route fetch failed (attempt {}): {}", fetch.failures, error);

        if fetch.failures > self.rules.route_retry_limit {
            self.fetch = None;
            self.halt(now);
            return Vec::new();
        }

        let delay = self.route_backoff.fail();
        tracing::info!("Retrying route in {} ms", delay.as_millis());
        self.retry_at = Some(now + delay);
        Vec::new()
    }

    fn halt(&mut self, now: Instant) {
        tracing::error!("Route unavailable, halting simulation in phase {}", self.phase);
        self.halted = true;
        self.running = false;
        self.next_tick_at = None;
        self.pending_reroute = None;
        self.processor.display(now, ROUTE_UNAVAILABLE, NotificationType::Negative, true);
        self.last_notification_at = Some(now);
    }

    fn set_phase(&mut self, phase: NavigationPhase) {
        tracing::info!("Phase {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    pub fn phase(&self) -> NavigationPhase {
        self.phase
    }

    pub fn plan(&self) -> &TripPlan {
        &self.plan
    }

    pub fn path(&self) -> &[GeoPoint] {
        &self.path
    }

    pub fn previously_traveled(&self) -> &[GeoPoint] {
        &self.previously_traveled
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn current_agent(&self) -> Option<&Agent> {
        self.agents.get(self.agent_index)
    }

    /// Names of every agent passed this leg, in numeric order.
    pub fn processed_agents(&self) -> Vec<String> {
        let mut names: Vec<String> = self.processed_agents.keys().cloned().collect();
        names.sort_by_key(|name| agent_number(name).unwrap_or(u32::MAX));
        names
    }

    pub fn processed_agent_position(&self, name: &str) -> Option<GeoPoint> {
        self.processed_agents.get(name).copied()
    }

    pub fn alerts(&self) -> &[TrafficAlert] {
        &self.alerts
    }

    pub fn shown_messages(&self) -> &HashSet<String> {
        &self.shown_messages
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn speed_tier(&self) -> SpeedTier {
        self.speed_tier
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn is_rerouting(&self) -> bool {
        matches!(
            self.fetch,
            Some(PendingFetch {
                purpose: FetchPurpose::Reroute { .. },
                ..
            })
        )
    }

    pub fn is_awaiting_dropoff_confirmation(&self) -> bool {
        self.awaiting_dropoff_confirmation
    }

    pub fn is_route_pending(&self) -> bool {
        self.fetch.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.processor.banner()
    }

    pub fn controls(&self) -> ControlState {
        self.controls
    }

    pub fn camera(&self) -> CameraState {
        self.camera
    }

    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            generation: self.generation,
            step: self.step,
            path_len: self.path.len(),
            position: self.marker.position_at(now),
            speed_tier: self.speed_tier,
            interval_ms: self.interval.as_millis() as u64,
            running: self.running,
            paused: self.paused,
            rerouting: self.is_rerouting(),
            halted: self.halted,
            banner: self.processor.banner().cloned(),
            current_agent: self.current_agent().map(|agent| agent.name.clone()),
            processed_agents: self.processed_agents(),
            alerts: self.alerts.len(),
            controls: self.controls,
            camera: self.camera,
        }
    }
}

//! Drive loop for one navigation session.
//!
//! Owns the session, sleeps until its next deadline and runs the commands
//! it emits as spawned tasks. Every result comes back through one channel,
//! so the session only ever sees one event at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, sleep_until, timeout, Instant, MissedTickBehavior};

use haul_client::{AgentSignalSource, AirportStatusSource, RouteProvider, TelemetryReply};
use haul_core::NavigationPhase;

use crate::session::{Command, NavigationSession, SessionEvent, SessionSnapshot, Telemetry};

const EVENT_CHANNEL_CAPACITY: usize = 64;
const FRAME_INTERVAL_MS: u64 = 100;

/// User input forwarded to the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    StartNavigation,
    TogglePause,
    StartDropoff,
    ConfirmDropoff,
    CancelDropoff,
    ToggleFollow,
    UserGesture { zoom: Option<f32> },
}

/// Network seams used by the loop.
pub struct Providers<R, A, P> {
    pub routes: Arc<R>,
    pub agents: Arc<A>,
    pub airport: Arc<P>,
}

impl<R, A, P> Clone for Providers<R, A, P> {
    fn clone(&self) -> Self {
        Self {
            routes: Arc::clone(&self.routes),
            agents: Arc::clone(&self.agents),
            airport: Arc::clone(&self.airport),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoopOptions {
    pub route_timeout: Duration,
    pub telemetry_timeout: Duration,
    /// Press the navigation buttons automatically: start once the pickup
    /// route is in, then start and confirm the dropoff at pickup.
    pub auto_continue: bool,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            route_timeout: Duration::from_secs(20),
            telemetry_timeout: Duration::from_secs(10),
            auto_continue: true,
        }
    }
}

/// Run `session` until the delivery completes, the route is given up on,
/// or shutdown is signalled. Returns the final snapshot.
pub async fn run_simulation<R, A, P>(
    mut session: NavigationSession,
    providers: Providers<R, A, P>,
    options: LoopOptions,
    mut controls: mpsc::Receiver<Control>,
    mut shutdown: broadcast::Receiver<()>,
) -> SessionSnapshot
where
    R: RouteProvider,
    A: AgentSignalSource,
    P: AirportStatusSource,
{
    let (events_tx, mut events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let mut controls_open = true;

    let mut frames = interval(Duration::from_millis(FRAME_INTERVAL_MS));
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let commands = session.load_initial_route();
    dispatch(commands, &providers, &options, &events_tx);

    loop {
        if let Some(reason) = finished(&session, &options) {
            tracing::info!("Simulation loop finished: {}", reason);
            break;
        }

        let deadline = session.next_deadline();
        let mut commands = tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Simulation loop shutting down");
                break;
            }
            Some(event) = events_rx.recv() => {
                session.handle(event, Instant::now())
            }
            control = controls.recv(), if controls_open => {
                match control {
                    Some(control) => apply_control(&mut session, control, Instant::now()),
                    None => {
                        controls_open = false;
                        Vec::new()
                    }
                }
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                session.fire_due(Instant::now())
            }
            _ = frames.tick() => {
                let position = session.animation_frame(Instant::now());
                tracing::trace!("Marker at {}", position);
                Vec::new()
            }
        };

        if options.auto_continue {
            commands.extend(auto_continue(&mut session, Instant::now()));
        }
        dispatch(commands, &providers, &options, &events_tx);
    }

    session.snapshot(Instant::now())
}

fn finished(session: &NavigationSession, options: &LoopOptions) -> Option<&'static str> {
    if session.phase() == NavigationPhase::Completed {
        Some("delivery completed")
    } else if session.is_halted() {
        Some("route unavailable")
    } else if options.auto_continue
        && session.phase() == NavigationPhase::AtPickup
        && session.plan().dropoff.is_none()
    {
        Some("pickup reached, no dropoff planned")
    } else {
        None
    }
}

fn apply_control(session: &mut NavigationSession, control: Control, now: Instant) -> Vec<Command> {
    let result = match control {
        Control::StartNavigation => session.start_navigation(now).map(|_| Vec::new()),
        Control::TogglePause => session.toggle_pause(now).map(|_| Vec::new()),
        Control::StartDropoff => session.start_dropoff(now).map(|_| Vec::new()),
        Control::ConfirmDropoff => session.confirm_dropoff(),
        Control::CancelDropoff => session.cancel_dropoff().map(|_| Vec::new()),
        Control::ToggleFollow => {
            session.toggle_follow(now);
            Ok(Vec::new())
        }
        Control::UserGesture { zoom } => {
            session.user_gesture(zoom);
            Ok(Vec::new())
        }
    };

    result.unwrap_or_else(|err| {
        tracing::warn!("Ignoring {:?}: {}", control, err);
        Vec::new()
    })
}

fn auto_continue(session: &mut NavigationSession, now: Instant) -> Vec<Command> {
    match session.phase() {
        NavigationPhase::ToPickup
            if !session.is_running()
                && !session.is_route_pending()
                && !session.is_halted()
                && !session.path().is_empty() =>
        {
            if let Err(err) = session.start_navigation(now) {
                tracing::warn!("Auto start failed: {}", err);
            }
            Vec::new()
        }
        NavigationPhase::AtPickup if session.plan().dropoff.is_some() => {
            let confirmed = session
                .start_dropoff(now)
                .and_then(|_| session.confirm_dropoff());
            confirmed.unwrap_or_else(|err| {
                tracing::warn!("Auto dropoff failed: {}", err);
                Vec::new()
            })
        }
        _ => Vec::new(),
    }
}

fn dispatch<R, A, P>(
    commands: Vec<Command>,
    providers: &Providers<R, A, P>,
    options: &LoopOptions,
    events: &mpsc::Sender<SessionEvent>,
) where
    R: RouteProvider,
    A: AgentSignalSource,
    P: AirportStatusSource,
{
    for command in commands {
        let events = events.clone();
        match command {
            Command::FetchRoute {
                generation,
                request,
            } => {
                let routes = Arc::clone(&providers.routes);
                let limit = options.route_timeout;
                tokio::spawn(async move {
                    let event = match timeout(limit, routes.fetch_route(request)).await {
                        Ok(Ok(route)) => SessionEvent::RouteReady { generation, route },
                        Ok(Err(err)) => SessionEvent::RouteFailed {
                            generation,
                            error: err.to_string(),
                        },
                        Err(_) => SessionEvent::RouteFailed {
                            generation,
                            error: "route request timed out".to_string(),
                        },
                    };
                    deliver(&events, event).await;
                });
            }
            Command::QueryAgent { generation, agent } => {
                let agents = Arc::clone(&providers.agents);
                let limit = options.telemetry_timeout;
                tokio::spawn(async move {
                    let reply = timeout(limit, agents.agent_signal(agent.clone()))
                        .await
                        .unwrap_or_else(|_| timed_out());
                    if let Some(failure) = reply.failure_message() {
                        tracing::warn!("DALI query for {} failed: {}", agent, failure);
                    }
                    let telemetry = Telemetry::Agent {
                        agent,
                        signal: reply.into_signal(),
                    };
                    deliver(
                        &events,
                        SessionEvent::TelemetryReceived {
                            generation,
                            telemetry,
                        },
                    )
                    .await;
                });
            }
            Command::QueryAirport { generation, query } => {
                let airport = Arc::clone(&providers.airport);
                let limit = options.telemetry_timeout;
                tokio::spawn(async move {
                    let reply = timeout(limit, airport.cargo_status(query))
                        .await
                        .unwrap_or_else(|_| timed_out());
                    if let Some(failure) = reply.failure_message() {
                        tracing::warn!("Airport status query failed: {}", failure);
                    }
                    let telemetry = Telemetry::Airport(reply.into_status());
                    deliver(
                        &events,
                        SessionEvent::TelemetryReceived {
                            generation,
                            telemetry,
                        },
                    )
                    .await;
                });
            }
        }
    }
}

fn timed_out<T>() -> TelemetryReply<T> {
    TelemetryReply::NetworkError("request timed out".to_string())
}

async fn deliver(events: &mpsc::Sender<SessionEvent>, event: SessionEvent) {
    if events.send(event).await.is_err() {
        tracing::debug!("Simulation loop gone, dropping result");
    }
}

//! End-to-end runs of the simulation loop against scripted providers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use haul_client::{
    AgentSignal, AgentSignalSource, AirportQuery, AirportStatus, AirportStatusSource,
    ClientError, FetchedRoute, RouteProvider, RouteRequest, TelemetryReply,
};
use haul_core::spatial::sample_segment;
use haul_core::{number_agents, GeoPoint, NavigationPhase, SignalState, SimulationRules, TripPlan};
use haul_sim::{
    run_simulation, Control, LoopOptions, NavButton, NavigationSession, Providers,
    SessionSnapshot,
};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

const DROPOFF: GeoPoint = GeoPoint::new(32.93, -97.02);

/// Straight-line routes with agents at fixed path indices.
struct StraightRoutes {
    points: usize,
    agent_steps: Vec<usize>,
    requests: Mutex<Vec<RouteRequest>>,
}

impl StraightRoutes {
    fn new(points: usize, agent_steps: &[usize]) -> Self {
        Self {
            points,
            agent_steps: agent_steps.to_vec(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<RouteRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl RouteProvider for StraightRoutes {
    async fn fetch_route(&self, request: RouteRequest) -> Result<FetchedRoute, ClientError> {
        self.requests.lock().unwrap().push(request);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let path = sample_segment(request.origin, request.destination, self.points);
        let agents = number_agents(self.agent_steps.iter().map(|i| path[*i]), 1);
        Ok(FetchedRoute { path, agents })
    }
}

struct BrokenRoutes {
    attempts: Mutex<u32>,
}

impl RouteProvider for BrokenRoutes {
    async fn fetch_route(&self, _request: RouteRequest) -> Result<FetchedRoute, ClientError> {
        *self.attempts.lock().unwrap() += 1;
        Err(ClientError::Http { status: 503 })
    }
}

/// Green everywhere, except one agent that reports an accident once.
struct ScriptedSignals {
    accident_at: Option<&'static str>,
    accident_sent: AtomicBool,
}

impl ScriptedSignals {
    fn clear() -> Self {
        Self {
            accident_at: None,
            accident_sent: AtomicBool::new(false),
        }
    }

    fn accident_at(agent: &'static str) -> Self {
        Self {
            accident_at: Some(agent),
            accident_sent: AtomicBool::new(false),
        }
    }
}

impl AgentSignalSource for ScriptedSignals {
    async fn agent_signal(&self, agent_name: String) -> TelemetryReply<AgentSignal> {
        if self.accident_at == Some(agent_name.as_str())
            && !self.accident_sent.swap(true, Ordering::SeqCst)
        {
            return TelemetryReply::Ok(AgentSignal {
                message: "Accident reported ahead".to_string(),
                state: Some(SignalState::Red),
            });
        }
        TelemetryReply::Ok(AgentSignal {
            message: "Clear road ahead".to_string(),
            state: Some(SignalState::Green),
        })
    }
}

struct OnSchedule {
    queries: Mutex<Vec<AirportQuery>>,
}

impl AirportStatusSource for OnSchedule {
    async fn cargo_status(&self, query: AirportQuery) -> TelemetryReply<AirportStatus> {
        self.queries.lock().unwrap().push(query);
        TelemetryReply::Ok(AirportStatus {
            message: "Your cargo is on schedule".to_string(),
            action: None,
        })
    }
}

fn trip() -> TripPlan {
    TripPlan {
        dropoff: Some(DROPOFF),
        ..TripPlan::default()
    }
}

fn rules() -> SimulationRules {
    SimulationRules {
        alert_trigger_radius_m: -1.0,
        airport_milestones_pct: vec![40, 80],
        ..SimulationRules::default()
    }
}

fn providers<R>(routes: Arc<R>, signals: ScriptedSignals) -> (Providers<R, ScriptedSignals, OnSchedule>, Arc<OnSchedule>) {
    let airport = Arc::new(OnSchedule {
        queries: Mutex::new(Vec::new()),
    });
    (
        Providers {
            routes,
            agents: Arc::new(signals),
            airport: Arc::clone(&airport),
        },
        airport,
    )
}

async fn run<R: RouteProvider>(
    plan: TripPlan,
    providers: Providers<R, ScriptedSignals, OnSchedule>,
) -> SessionSnapshot {
    let (_control_tx, control_rx) = mpsc::channel(8);
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let session = NavigationSession::new(plan, rules(), Instant::now());
    run_simulation(session, providers, LoopOptions::default(), control_rx, shutdown_rx).await
}

#[tokio::test(start_paused = true)]
async fn test_full_delivery_completes() {
    let routes = Arc::new(StraightRoutes::new(60, &[10, 30, 50]));
    let (providers, airport) = providers(Arc::clone(&routes), ScriptedSignals::clear());

    let snapshot = run(trip(), providers).await;

    assert_eq!(snapshot.phase, NavigationPhase::Completed);
    assert_eq!(snapshot.controls.nav_button, NavButton::DeliveryCompleted);
    assert!(!snapshot.running);
    assert!(!snapshot.halted);

    let requests = routes.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].destination, trip().pickup);
    assert_eq!(requests[1].origin, trip().pickup);
    assert_eq!(requests[1].destination, DROPOFF);
    assert!(requests.iter().all(|r| !r.avoid_highways));

    let queries = airport.queries.lock().unwrap();
    assert_eq!(queries.len(), 2);
    assert!(queries.iter().all(|q| q.cargo_id == trip().schedule_id));
}

#[tokio::test(start_paused = true)]
async fn test_accident_reroute_then_completes() {
    let routes = Arc::new(StraightRoutes::new(100, &[10, 25, 50]));
    let (providers, _) = providers(Arc::clone(&routes), ScriptedSignals::accident_at("Agent2"));

    let snapshot = run(trip(), providers).await;
    assert_eq!(snapshot.phase, NavigationPhase::Completed);

    let requests = routes.requests();
    assert_eq!(requests.len(), 3);
    let reroute = requests[1];
    assert!(reroute.avoid_highways);
    assert_eq!(reroute.destination, trip().pickup);
    assert_ne!(reroute.origin, trip().start);
    assert!(!requests[2].avoid_highways);
}

#[tokio::test(start_paused = true)]
async fn test_route_failures_halt_the_run() {
    let routes = Arc::new(BrokenRoutes {
        attempts: Mutex::new(0),
    });
    let (providers, _) = providers(Arc::clone(&routes), ScriptedSignals::clear());

    let snapshot = run(trip(), providers).await;

    assert!(snapshot.halted);
    assert_eq!(snapshot.phase, NavigationPhase::ToPickup);
    assert_eq!(snapshot.banner.unwrap().text, "Route unavailable");
    assert_eq!(*routes.attempts.lock().unwrap(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_manual_controls_and_shutdown() {
    let routes = Arc::new(StraightRoutes::new(200, &[]));
    let (providers, _) = providers(routes, ScriptedSignals::clear());

    let (control_tx, control_rx) = mpsc::channel(8);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let session = NavigationSession::new(trip(), rules(), Instant::now());
    let options = LoopOptions {
        auto_continue: false,
        ..LoopOptions::default()
    };
    let handle = tokio::spawn(run_simulation(
        session,
        providers,
        options,
        control_rx,
        shutdown_rx,
    ));

    tokio::time::sleep(Duration::from_millis(500)).await;
    control_tx.send(Control::StartNavigation).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    control_tx.send(Control::TogglePause).await.unwrap();
    control_tx
        .send(Control::UserGesture { zoom: Some(12.0) })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    shutdown_tx.send(()).unwrap();

    let snapshot = handle.await.unwrap();
    assert_eq!(snapshot.phase, NavigationPhase::ToPickup);
    assert!(snapshot.running);
    assert!(snapshot.paused);
    assert!(snapshot.step > 0);
    assert!(snapshot.step < snapshot.path_len);
    assert!(!snapshot.camera.following);
    assert_eq!(snapshot.camera.zoom, 12.0);
}

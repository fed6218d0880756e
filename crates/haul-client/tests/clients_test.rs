//! Client round trips against the mock backends served on a local port.

use std::sync::Arc;
use std::time::Duration;

use haul_client::{
    AgentSignalSource, AirportClient, AirportQuery, AirportStatusSource, DaliClient,
    DirectionsClient, RouteProvider, RouteRequest, TelemetryReply,
};
use haul_core::{GeoPoint, SignalState};
use haul_mock::state::AgentReply;
use haul_mock::MockState;

const TIMEOUT: Duration = Duration::from_secs(5);

async fn spawn_mock() -> (String, Arc<MockState>) {
    let state = Arc::new(MockState::new());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = haul_mock::app(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

#[tokio::test]
async fn directions_client_reads_synthetic_route() {
    let (base, _state) = spawn_mock().await;
    let client = DirectionsClient::new(&base, "test-key", TIMEOUT).unwrap();

    let request = RouteRequest {
        origin: GeoPoint::new(32.984774, -96.747751),
        destination: GeoPoint::new(32.889816, -97.037901),
        avoid_highways: false,
    };
    let route = client.fetch_route(request).await.unwrap();

    assert!(route.path.len() >= 40);
    assert!(!route.agents.is_empty());
    assert_eq!(route.agents[0].name, "Agent1");
    assert!(route
        .agents
        .iter()
        .enumerate()
        .all(|(i, agent)| agent.number() == Some(i as u32 + 1)));
}

#[tokio::test]
async fn dali_client_reads_override() {
    let (base, state) = spawn_mock().await;
    state.set_agent_override(
        "Agent4",
        AgentReply {
            message: "Accident Ahead".to_string(),
            agent_state: "R".to_string(),
        },
    );

    let client = DaliClient::new(Some(base.as_str()), TIMEOUT).unwrap();
    let signal = client.agent_signal("Agent4".to_string()).await.into_signal();
    assert_eq!(signal.message, "Accident Ahead");
    assert_eq!(signal.state, Some(SignalState::Red));

    let signal = client.agent_signal("Agent1".to_string()).await.into_signal();
    assert_eq!(signal.state, Some(SignalState::Green));
}

#[tokio::test]
async fn airport_client_reads_status() {
    let (base, _state) = spawn_mock().await;
    let client = AirportClient::new(&base, TIMEOUT).unwrap();

    let status = client
        .cargo_status(AirportQuery {
            position: GeoPoint::new(32.9, -97.0),
            cargo_id: "d0bea113-d248-457e-80b4-f4a2bf8703a5".to_string(),
            terminal: "B".to_string(),
        })
        .await
        .into_status();
    assert_eq!(status.action.as_deref(), Some("Pull_Up"));
    assert!(status.message.contains("Pull over near rest area"));
}

#[tokio::test]
async fn unreachable_backend_degrades_to_network_error() {
    // bind then drop so the port is closed
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = DaliClient::new(Some(format!("http://{}", addr).as_str()), TIMEOUT).unwrap();
    let reply = client.agent_signal("Agent1".to_string()).await;
    assert!(matches!(reply, TelemetryReply::NetworkError(_)));

    let signal = reply.into_signal();
    assert!(signal.message.starts_with("Network error"));
    assert_eq!(signal.state, Some(SignalState::Yellow));
}

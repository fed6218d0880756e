//! Haul mock server - airport, DALI and directions stand-ins

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use haul_mock::MockState;

const DEFAULT_PORT: u16 = 5010;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("haul_mock=debug".parse()?)
            .add_directive("tower_http=debug".parse()?))
        .init();

    let port = std::env::var("HAUL_MOCK_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let app = haul_mock::app(Arc::new(MockState::new()));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Haul mock listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

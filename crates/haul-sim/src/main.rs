//! Haul simulation runner - drives one delivery from start to dropoff.
//!
//! Usage:
//!   cargo run -p haul-sim -- --pickup "32.889,-97.037" --dropoff "32.906,-97.037"

use anyhow::{bail, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use haul_client::{AirportClient, DaliClient, DirectionsClient};
use haul_core::{SimulationRules, TripPlan};
use haul_sim::{run_simulation, Config, Control, LoopOptions, NavigationSession, Providers};

#[derive(Parser, Debug)]
#[command(author, version, about = "Simulate a cargo truck delivery run")]
struct Args {
    /// Cargo schedule id reported to the airport backend
    #[arg(long)]
    schedule_id: Option<String>,

    /// LOW, MEDIUM or HIGH
    #[arg(long)]
    criticality: Option<String>,

    /// Pickup coordinate as "lat,lng"
    #[arg(long)]
    pickup: Option<String>,

    /// Dropoff coordinate as "lat,lng"
    #[arg(long)]
    dropoff: Option<String>,

    /// Airport terminal letter
    #[arg(long)]
    terminal: Option<String>,

    /// Wait for control input instead of pressing the navigation buttons
    #[arg(long, default_value_t = false)]
    manual: bool,

    /// Print the final snapshot as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("haul_sim=debug".parse()?)
                .add_directive("haul_client=debug".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env();

    let (plan, fallbacks) = TripPlan::from_inputs(
        args.schedule_id.as_deref(),
        args.criticality.as_deref(),
        args.pickup.as_deref(),
        args.dropoff.as_deref(),
        args.terminal.as_deref(),
    );
    for err in &fallbacks {
        tracing::warn!("{}, using default pickup location", err);
    }
    tracing::info!(
        "Trip {}: pickup {}, dropoff {:?}, terminal {}, criticality {:?}",
        plan.schedule_id,
        plan.pickup,
        plan.dropoff,
        plan.terminal,
        plan.criticality
    );

    if config.maps_api_key.is_empty() {
        tracing::warn!("HAUL_MAPS_API_KEY not set, directions requests will likely fail");
    }
    let dali = DaliClient::new(config.dali_url.as_deref(), config.telemetry_timeout())?;
    if dali.is_offline() {
        tracing::info!("HAUL_DALI_URL not set, using offline signal catalog");
    }

    let providers = Providers {
        routes: Arc::new(DirectionsClient::new(
            &config.directions_url,
            &config.maps_api_key,
            config.route_timeout(),
        )?),
        agents: Arc::new(dali),
        airport: Arc::new(AirportClient::new(
            &config.airport_url,
            config.telemetry_timeout(),
        )?),
    };

    let rules = SimulationRules {
        base_interval_ms: config.base_interval_ms,
        ..SimulationRules::default()
    };
    let options = LoopOptions {
        route_timeout: config.route_timeout(),
        telemetry_timeout: config.telemetry_timeout(),
        auto_continue: !args.manual,
    };

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received");
            let _ = shutdown_tx.send(());
        }
    });

    let (control_tx, control_rx) = mpsc::channel(16);
    if args.manual {
        tracing::info!("Manual mode: start, pause, dropoff, confirm, cancel, follow");
        tokio::spawn(read_controls(control_tx));
    }

    let session = NavigationSession::new(plan, rules, Instant::now());
    let snapshot = run_simulation(session, providers, options, control_rx, shutdown_rx).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        tracing::info!(
            "Finished in phase {} at step {}/{} ({} agents processed)",
            snapshot.phase,
            snapshot.step,
            snapshot.path_len,
            snapshot.processed_agents.len()
        );
    }

    if snapshot.halted {
        bail!("simulation halted: route unavailable");
    }
    Ok(())
}

/// Forward control words typed on stdin to the simulation loop.
async fn read_controls(controls: mpsc::Sender<Control>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let control = match line.trim() {
            "start" => Control::StartNavigation,
            "pause" => Control::TogglePause,
            "dropoff" => Control::StartDropoff,
            "confirm" => Control::ConfirmDropoff,
            "cancel" => Control::CancelDropoff,
            "follow" => Control::ToggleFollow,
            "" => continue,
            other => {
                tracing::warn!("Unknown control: {}", other);
                continue;
            }
        };
        if controls.send(control).await.is_err() {
            break;
        }
    }
}

// Framework bootstrap for the arena server runtime.

use crate::domain::tuning::GameTuning;
use crate::frameworks::config;
use crate::interface_adapters::net::{spawn_world_serializer, status_handler, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{GameEvent, Outbound, WorldStats, world_task};

use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{broadcast, mpsc, watch};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state(config::max_connections());

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/status", get(status_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([0, 0, 0, 0], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state(max_connections: usize) -> Arc<AppState> {
    // input_tx/rx: every session command goes to the single world task.
    let (input_tx, input_rx) = mpsc::channel::<GameEvent>(config::INPUT_CHANNEL_CAPACITY);
    // world_tx: snapshots and notices fan out to the serializer.
    let (world_tx, _world_rx) = broadcast::channel::<Outbound>(config::WORLD_BROADCAST_CAPACITY);
    let (stats_tx, stats_rx) = watch::channel(WorldStats::default());

    let state = Arc::new(AppState::new(
        input_tx,
        world_tx.clone(),
        stats_rx,
        config::WORLD_BROADCAST_CAPACITY,
        max_connections,
    ));

    // Subscribe the serializer before the loop starts so the first tick is not lost.
    spawn_world_serializer(&state);
    tokio::spawn(world_task(
        input_rx,
        world_tx,
        stats_tx,
        GameTuning::default(),
        config::TICK_INTERVAL,
    ));

    tracing::debug!(
        max_connections,
        tick_interval_us = config::TICK_INTERVAL.as_micros() as u64,
        "world task spawned"
    );

    state
}

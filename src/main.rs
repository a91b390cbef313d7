// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use fleet_telemetry::application::fleet_service::FleetService;
use fleet_telemetry::application::telemetry_source::TelemetrySource;
use fleet_telemetry::infrastructure::config::load_app_config;
use fleet_telemetry::infrastructure::feed_client::HttpFeedSource;
use fleet_telemetry::presentation::app_state::AppState;
use fleet_telemetry::presentation::handlers::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config()?;

    // The fleet task owns all vehicle state
    let fleet = FleetService::spawn(
        config.aggregation.bucket_width_ms,
        config.fleet.command_buffer,
        config.fleet.event_buffer,
    );

    // Transport collaborator
    let source = HttpFeedSource::new(config.feed.url.clone(), config.feed.reconnect_delay());
    let feed_fleet = fleet.clone();
    tokio::spawn(async move {
        if let Err(e) = source.run(feed_fleet).await {
            tracing::error!("Telemetry feed stopped: {}", e);
        }
    });

    let state = Arc::new(AppState { fleet });
    let router = build_router(state);

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid server.bind {}", config.server.bind))?;
    tracing::info!("Starting fleet-telemetry service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}

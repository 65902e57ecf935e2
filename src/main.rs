mod api;
mod config;
mod dispatch;
mod error;
mod geo;
mod models;
mod observability;
mod pricing;
mod reminders;
mod state;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::geo::{DisabledDistanceResolver, DistanceResolver, HttpDistanceResolver};

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let resolver: Arc<dyn DistanceResolver> = match (
        config.geocoder_base_url.clone(),
        config.routing_base_url.clone(),
    ) {
        (Some(geocoder), Some(routing)) => {
            let resolver = HttpDistanceResolver::new(
                geocoder,
                routing,
                Duration::from_millis(config.geocoder_timeout_ms),
            )
            .map_err(|err| error::AppError::Internal(format!("building resolver: {err}")))?;
            Arc::new(resolver)
        }
        _ => {
            tracing::info!("distance resolver not configured; quotes will use fallback estimates");
            Arc::new(DisabledDistanceResolver)
        }
    };

    let shared_state = Arc::new(state::AppState::new(resolver, config.event_buffer_size));

    tokio::spawn(reminders::run_reminder_engine(
        shared_state.clone(),
        Duration::from_secs(config.reminder_interval_secs),
    ));

    let app = api::rest::router(shared_state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}

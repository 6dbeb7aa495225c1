//! # Outpost Service
//!
//! Binary entry point for the Outpost event-delivery service.
//!
//! This executable:
//! - Loads configuration from the environment
//! - Initializes tracing
//! - Builds the in-memory collaborators and spawns the dispatch pools
//! - Starts the HTTP server from `outpost-api`

use outpost_api::ServiceConfig;
use outpost_service::bootstrap;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "outpost_service=info,outpost_api=info,outpost_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Outpost Service");

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let handle = bootstrap(config.clone(), Vec::new()).await;
    let state = handle.state.clone();

    let server = tokio::spawn(async move { outpost_api::start_server(config, state).await });

    tokio::select! {
        result = server => {
            if let Ok(Err(e)) = result {
                error!(error = %e, "HTTP server exited with error");
                std::process::exit(2);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal, draining dispatch pools");
        }
    }

    handle.shutdown(shutdown_timeout).await;
    Ok(())
}

//! Garden Client - terminal client for the multiplayer garden maze
//!
//! This is the main entry point for the client. It handles:
//! - Registering the player over HTTP
//! - The WebSocket session with the game server
//! - The fixed-timestep loop that flushes input and draws the map

mod app;
mod config;
mod game;
mod http;
mod render;
mod util;
mod ws;

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::Session;
use crate::config::Config;
use crate::http::RegistrationClient;
use crate::render::TerminalGuard;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level, &config.log_file)?;

    info!("Starting Garden Client");
    info!(server = %config.server_url, player = %config.player_name, "Registering");

    let registrations = RegistrationClient::new(config.server_url.clone());
    let registration = match registrations.register(&config.player_name).await {
        Ok(registration) => registration,
        Err(e) => {
            error!(error = %e, "Registration failed");
            return Err(e.into());
        }
    };

    info!(
        id = %registration.id,
        user_id = registration.user_id,
        width = registration.dimensions.width(),
        height = registration.dimensions.height(),
        position = %registration.player_position,
        explored = registration.explored_cells.len(),
        "Registered"
    );

    let guard = TerminalGuard::enter()?;
    let session = Session::new(config, &registration, guard.key_release_events());
    let result = session.run(shutdown_signal()).await;
    drop(guard);

    if let Err(e) = registrations.unregister(&registration.id).await {
        warn!(error = %e, "Unregister failed");
    }

    let end = result?;
    info!(?end, "Client shutdown complete");
    Ok(())
}

/// Initialize tracing/logging. The terminal draws the map, so logs go to a file.
fn init_tracing(log_level: &str, log_file: &str) -> std::io::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let file = OpenOptions::new().create(true).append(true).open(log_file)?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}

//! The travel agent server.

#[macro_use]
extern crate tracing;

use std::process::ExitCode;

use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use wayfarer::Planner;
use wayfarer::config::Settings;
use wayfarer::server::{self, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match dotenv {
        Ok(path) => info!("loaded environment from {}", path.display()),
        Err(err) if err.not_found() => debug!("no .env file"),
        Err(err) => warn!("failed to load .env: {err}"),
    }

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            error!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    let status = settings.api_status();
    info!(
        openai = status.openai,
        serper = status.serper,
        weather = status.weather,
        "API keys"
    );

    let planner = Planner::from_settings(&settings);
    let router = server::router(AppState::new(planner, status));

    let bind_addr = settings.bind_addr();
    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to listen on {bind_addr}: {err}");
            return ExitCode::FAILURE;
        }
    };
    info!("listening on http://{bind_addr}");

    if let Err(err) = server::serve(listener, router, shutdown_signal()).await
    {
        error!("server error: {err}");
        return ExitCode::FAILURE;
    }
    info!("server stopped");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        // Without a signal handler the server can only be killed.
        error!("failed to listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received, shutting down");
}

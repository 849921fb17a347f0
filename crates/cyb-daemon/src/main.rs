//! Process entrypoint: load configuration, wire every service, and serve
//! the HTTP edge until interrupted (spec §6 startup, §4.14 HTTP surface).

use std::net::SocketAddr;

use cyb_config::{ExitCode, Settings};
use cyb_daemon::bootstrap;

const BIND_ADDR_VAR: &str = "CYBERNETIC_BIND_ADDR";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const WEBHOOK_SECRET_VAR: &str = "CYBERNETIC_TELEGRAM_WEBHOOK_SECRET";

#[tokio::main]
async fn main() {
    let code = run().await;
    std::process::exit(code.code());
}

async fn run() -> ExitCode {
    if let Err(err) = cyb_telemetry::setup_default_logging() {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::Internal;
    }

    let settings = match Settings::load_from_env() {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!(error = %err, "configuration invalid");
            return ExitCode::ConfigError;
        }
    };

    let services = match bootstrap(settings).await {
        Ok(services) => services,
        Err(err) => {
            tracing::error!(error = %err, "startup failed");
            return ExitCode::DependencyUnavailable;
        }
    };

    let webhook_secret = std::env::var(WEBHOOK_SECRET_VAR).unwrap_or_default();
    let app = cyb_http::build_router(services.app_state(webhook_secret));

    let bind_addr = std::env::var(BIND_ADDR_VAR).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let addr: SocketAddr = match bind_addr.parse() {
        Ok(addr) => addr,
        Err(err) => {
            tracing::error!(error = %err, addr = %bind_addr, "invalid bind address");
            return ExitCode::ConfigError;
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, addr = %addr, "failed to bind");
            return ExitCode::DependencyUnavailable;
        }
    };

    tracing::info!(addr = %addr, "cyb-daemon listening");

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    match result {
        Ok(()) => ExitCode::Ok,
        Err(err) => {
            tracing::error!(error = %err, "server exited with error");
            ExitCode::Internal
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received");
}

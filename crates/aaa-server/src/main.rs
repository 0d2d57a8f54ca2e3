//! Control Plane Server Binary
//!
//! Runs the AAA control plane HTTP server.

use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use aaa_server::{build_state, create_router, ServerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    // Logging is not up yet, so configuration errors go to stderr
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to set tracing subscriber: {}", e);
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Control plane stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        issuer = %config.issuer_domain,
        port = config.port,
        token_lifetime_secs = config.token_lifetime.as_secs(),
        "Starting control plane server"
    );

    let state = build_state(&config).await?;
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(addr = %addr, "Control plane listening");

    axum::serve(listener, app).await?;
    Ok(())
}

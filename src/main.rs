use std::path::PathBuf;

use accounts::config::Configuration;
use accounts::{app, initialize_state, telemetry};
use tokio::net::TcpListener;

/// Environment variable overriding `config.yaml` location.
const CONFIG_ENV: &str = "ACCOUNTS_CONFIG";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::var(CONFIG_ENV).map(PathBuf::from).unwrap_or_default();
    let config = tracing::subscriber::with_default(
        telemetry::startup_subscriber(std::io::stdout),
        || Configuration::default().path(path).read(),
    )?;

    telemetry::init_subscriber(config.telemetry.as_ref());

    let state = initialize_state(config.clone()).await?;

    let listener = TcpListener::bind(config.address()).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        version = env!("CARGO_PKG_VERSION"),
        min_birth_year = config.birth_year.min,
        max_birth_year = config.birth_year.max,
        "server started"
    );

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

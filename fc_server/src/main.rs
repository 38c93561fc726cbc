//! FastCMS server binary.

use std::net::SocketAddr;

use anyhow::Error;
use fc_server::{
    api::{self, AppState},
    config::ServerConfig,
    lifecycle, logging, metrics,
};
use pico_args::Arguments;

const HELP: &str = "\
Run the FastCMS content server

USAGE:
  fc_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env HOST:PORT or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or sqlite://data/dev.db]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SECRET_KEY               JWT signing secret (required, at least 32 characters)
  APP_ENV                  development or production
  API_STR                  Prefix for API routes (default /api)
  FRONTEND_URL             Allowed CORS origin
  METRICS_BIND             Prometheus exporter address, e.g. 127.0.0.1:9000
  (See .env.example for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    config.validate()?;
    tracing::info!(
        environment = config.environment.as_str(),
        bind = %config.bind,
        "Starting {}",
        config.app_name
    );

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        tracing::info!(%addr, "Prometheus exporter listening");
    }

    let db = lifecycle::startup(&config).await?;

    let bind = config.bind;
    let app = api::create_router(AppState::new(db.clone(), config));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {bind}: {e}"))?;

    tracing::info!("Server is running at http://{bind}. Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {e}"))?;

    tracing::info!("Shutting down server...");
    db.close().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

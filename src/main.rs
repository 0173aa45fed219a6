use clap::Parser;
use tracing_subscriber::EnvFilter;

use jobly_api::database::DatabaseManager;

/// Job board REST API server
#[derive(Debug, Parser)]
#[command(name = "jobly-api", version, about)]
struct Cli {
    /// Interface to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECRET_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = jobly_api::config::config();
    tracing::info!("Starting Jobly API in {:?} mode", config.environment);

    let pool = DatabaseManager::connect().await?;
    let app = jobly_api::app(pool.clone());

    let host = cli.host.unwrap_or_else(|| config.api.host.clone());
    let port = cli.port.unwrap_or(config.api.port);
    let bind_addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Jobly API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Database pool closed");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

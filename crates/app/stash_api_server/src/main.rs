//! Stash API server binary.
//!
//! Reads configuration from the environment, runs migrations, and serves
//! the REST API until the process is stopped.

use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use stash_api::AppState;
use stash_api::config::ApiConfig;
use stash_core::store::{CredentialStore, PgStore};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "stash_api_server", about = "Stash API server")]
struct Args {
    /// Address to bind the HTTP listener.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3300")]
    bind_addr: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/stash"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,stash_api=debug,stash_core=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    // A weak secret or a bad cookie policy never reaches serving.
    let mut config = ApiConfig::from_env()?;
    config.bind_addr = args.bind_addr;
    config.pg_connection_url = args.database_url;

    info!(bind_addr = %config.bind_addr, "starting stash_api_server");

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&config.pg_connection_url)
        .await?;

    // Run database migrations.
    info!("running database migrations");
    stash_api::migrate(&pool).await?;

    let store = Arc::new(PgStore::new(pool));

    // Denylist entries for tokens that have since expired are dead weight.
    let purged = store.purge_revoked_tokens(chrono::Utc::now()).await?;
    if purged > 0 {
        info!(purged, "dropped expired token denylist entries");
    }

    let state = AppState::new(store, config.clone());
    let app = stash_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "stash API listening");

    axum::serve(listener, app).await?;

    Ok(())
}

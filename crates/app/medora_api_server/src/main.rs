//! Medora API server binary.
//!
//! Reads configuration from the environment (and `.env`), connects to
//! PostgreSQL when `DATABASE_URL` is set, otherwise runs on the in-memory
//! store, and serves the API until Ctrl-C.

use std::sync::Arc;

use clap::Parser;
use medora_api::config::ApiConfig;
use medora_core::store::Store;
use medora_core::store::memory::MemoryStore;
use medora_core::store::pg::PgStore;
use medora_core::store::seed::seed_defaults;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};

/// CLI arguments for the API server. Flags override the environment.
#[derive(Parser, Debug)]
#[command(name = "medora_api_server", about = "Medora API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR")]
    bind: Option<String>,

    /// PostgreSQL connection URL. Omit to run on the in-memory store.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,

    /// Create the built-in roles and the default admin if missing.
    #[arg(long, default_value_t = false)]
    seed: bool,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,medora_api=debug,medora_core=debug".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match ApiConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(2);
        }
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if args.database_url.is_some() {
        config.database_url = args.database_url;
    }

    info!(
        bind_addr = %config.bind_addr,
        session_tracking = config.auth.session_tracking,
        federated_sign_in = config.federated_secret.is_some(),
        "starting medora_api_server"
    );

    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(url) => {
            info!(max_connections = args.max_connections, "configuring connection pool");
            let pool = PgPoolOptions::new()
                .max_connections(args.max_connections)
                .acquire_timeout(std::time::Duration::from_secs(30))
                .connect(url)
                .await?;

            info!("running database migrations");
            medora_api::migrate(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set; using the in-memory store, data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let state = medora_api::AppState::new(store, config)?;

    if args.seed {
        let report = seed_defaults(state.store.as_ref(), &state.hasher).await?;
        info!(
            roles_created = report.roles_created,
            admin_created = report.admin_created,
            "seeding complete"
        );
    }

    let listener = tokio::net::TcpListener::bind(&state.config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    let app = medora_api::router(state);

    info!(addr = %local_addr, "REST API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

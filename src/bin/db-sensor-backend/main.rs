mod args;

use std::process::ExitCode;

use anyhow::{Context as _, Result};
use args::Args;
use clap::Parser as _;
use db_sensor_backend::{
    bridge::run_bridge,
    db::{MySqlStore, create_schema, new_pool},
    http::{router, serve},
    store::{MemoryStore, ReadingStore},
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!("{e:#}");
        return ExitCode::from(1);
    }

    ExitCode::from(0)
}

async fn run() -> Result<()> {
    let args = Args::parse();

    if args.memory_store {
        warn!("using in-memory store, readings are lost on exit");
        return run_with_store(MemoryStore::new(), &args).await;
    }

    let options = args.mysql_options()?;
    let pool = new_pool(options, args.pool_size)
        .await
        .context("failed to connect to database")?;

    if args.create_schema {
        create_schema(&pool)
            .await
            .context("failed to create schema")?;
    }

    run_with_store(MySqlStore::new(pool), &args).await
}

async fn run_with_store<S: ReadingStore>(store: S, args: &Args) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", args.http_port))
        .await
        .with_context(|| format!("failed to bind HTTP port {}", args.http_port))?;

    let app = router(store.clone(), args.timezone);

    tokio::select! {
        result = serve(listener, app, shutdown_signal()) => result,
        result = run_bridge(store, args.bridge_config()) => result.context("MQTT bridge stopped"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }

    info!("shutting down");
}

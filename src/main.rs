//! RouteWriter Worker - field-service route optimization service
//!
//! Serves optimization requests over HTTP and, when `NATS_URL` is set, over
//! NATS request/reply.

mod cli;
mod config;
mod defaults;
mod handlers;
mod services;
mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::handlers::http::AppState;
use crate::services::optimizer::RouteOptimizer;
use crate::services::travel_time::create_travel_time_provider;
use crate::types::{OptimizeRequest, RouteRequest};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs directory - use LOGS_DIR env var or default to ../logs (relative to worker)
    let logs_dir = std::env::var("LOGS_DIR").unwrap_or_else(|_| "../logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &logs_dir, "worker.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - stderr keeps stdout clean for `solve` output
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,routewriter_worker=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false)) // file
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    info!("Configuration loaded");

    let provider = create_travel_time_provider(&config.provider)?;
    info!("Travel-time provider initialized: {}", provider.name());

    let mut solver_config = config.solver.clone();
    if let Some(Command::Solve {
        time_budget_secs: Some(secs),
        ..
    }) = &cli.command
    {
        solver_config = solver_config.with_time_budget(Duration::from_secs(*secs));
    }

    let optimizer = Arc::new(RouteOptimizer::new(
        provider,
        config.matrix.clone(),
        solver_config,
        config.limits,
    ));

    match cli.command {
        Some(Command::Solve { file, single, .. }) => solve_file(&optimizer, &file, single).await,
        Some(Command::Serve) | None => serve(config, optimizer).await,
    }
}

async fn serve(config: Config, optimizer: Arc<RouteOptimizer>) -> Result<()> {
    info!("Starting RouteWriter Worker...");

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
        signal_token.cancel();
    });

    let nats_task = match &config.nats_url {
        Some(url) => {
            let client = connect_nats(url).await?;
            info!("Connected to NATS at {}", url);
            let optimizer = Arc::clone(&optimizer);
            let token = shutdown.clone();
            Some(tokio::spawn(async move {
                let result = handlers::start_nats_handlers(client, optimizer, token.clone()).await;
                if let Err(e) = &result {
                    error!("NATS handler error: {}", e);
                }
                token.cancel();
                result
            }))
        }
        None => {
            info!("NATS_URL not set, serving HTTP only");
            None
        }
    };

    let state = AppState { optimizer };
    let http_result = handlers::http::serve(state, &config.bind_addr, shutdown.clone()).await;
    shutdown.cancel();

    if let Some(task) = nats_task {
        match task.await {
            Ok(Err(e)) => warn!("NATS front end stopped with error: {}", e),
            Err(e) => warn!("NATS task failed: {}", e),
            Ok(Ok(())) => {}
        }
    }

    if let Err(e) = &http_result {
        error!("Handler error: {}", e);
    }
    http_result
}

/// Connect to NATS (supports optional NATS_USER/NATS_PASSWORD auth).
async fn connect_nats(url: &str) -> Result<async_nats::Client> {
    let client = match (std::env::var("NATS_USER"), std::env::var("NATS_PASSWORD")) {
        (Ok(user), Ok(password)) if !user.is_empty() => async_nats::ConnectOptions::new()
            .user_and_password(user, password)
            .connect(url)
            .await
            .with_context(|| format!("Failed to connect to NATS at {}", url))?,
        _ => async_nats::connect(url)
            .await
            .with_context(|| format!("Failed to connect to NATS at {}", url))?,
    };
    Ok(client)
}

async fn solve_file(optimizer: &RouteOptimizer, file: &std::path::Path, single: bool) -> Result<()> {
    let raw = std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let output = if single {
        let request: RouteRequest = serde_json::from_str(&raw).context("Invalid route request JSON")?;
        let response = optimizer
            .optimize_route(request)
            .await
            .map_err(|e| anyhow::anyhow!(e.public_message()))?;
        serde_json::to_string_pretty(&response)?
    } else {
        let request: OptimizeRequest = serde_json::from_str(&raw).context("Invalid optimize request JSON")?;
        let response = optimizer
            .optimize(request)
            .await
            .map_err(|e| anyhow::anyhow!(e.public_message()))?;
        serde_json::to_string_pretty(&response)?
    };

    println!("{}", output);
    Ok(())
}

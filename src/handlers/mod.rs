//! Request front ends: HTTP always, NATS when configured

pub mod http;
pub mod nats;
pub mod ping;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_nats::Client;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::services::optimizer::RouteOptimizer;

/// Start NATS subscriptions; returns when a handler stops or on shutdown.
pub async fn start_nats_handlers(
    client: Client,
    optimizer: Arc<RouteOptimizer>,
    shutdown: CancellationToken,
) -> Result<()> {
    info!("Starting NATS handlers...");

    let ping_sub = client.subscribe(nats::SUBJECT_PING).await?;
    let optimize_sub = client.subscribe(nats::SUBJECT_OPTIMIZE).await?;
    let optimize_route_sub = client.subscribe(nats::SUBJECT_OPTIMIZE_ROUTE).await?;

    info!("Subscribed to NATS subjects");

    let provider = optimizer.provider_name().to_string();

    let client_ping = client.clone();
    let ping_handle = tokio::spawn(async move { ping::handle_ping(client_ping, ping_sub, provider).await });

    let client_optimize = client.clone();
    let optimizer_optimize = Arc::clone(&optimizer);
    let optimize_handle = tokio::spawn(async move {
        nats::handle_optimize(client_optimize, optimize_sub, optimizer_optimize).await
    });

    let client_route = client.clone();
    let optimizer_route = Arc::clone(&optimizer);
    let optimize_route_handle = tokio::spawn(async move {
        nats::handle_optimize_route(client_route, optimize_route_sub, optimizer_route).await
    });

    info!("All NATS handlers started");

    select! {
        _ = shutdown.cancelled() => {
            info!("NATS handlers shutting down");
        }
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = optimize_handle => {
            error!("Optimize handler finished: {:?}", result);
        }
        result = optimize_route_handle => {
            error!("Optimize route handler finished: {:?}", result);
        }
    }

    client.flush().await.context("Failed to flush NATS client")?;
    Ok(())
}

//! NATS request/reply front end
//!
//! Each message is handled on its own task, so a slow optimization never
//! holds up the subscription loop.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Message, Subscriber};
use futures::StreamExt;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::services::optimizer::{OptimizeError, RouteOptimizer};
use crate::types::{ErrorResponse, OptimizeRequest, Request, RouteRequest, SuccessResponse};

pub const SUBJECT_OPTIMIZE: &str = "routewriter.optimize";
pub const SUBJECT_OPTIMIZE_ROUTE: &str = "routewriter.optimize.route";
pub const SUBJECT_PING: &str = "routewriter.ping";

/// Encode the reply envelope for one request.
fn encode_reply<R: Serialize>(request_id: Uuid, result: Result<R, OptimizeError>) -> Result<Vec<u8>> {
    let bytes = match result {
        Ok(payload) => serde_json::to_vec(&SuccessResponse::new(request_id, payload))?,
        Err(e) => {
            if let OptimizeError::Internal(detail) = &e {
                error!("Internal error for request {}: {}", request_id, detail);
            }
            serde_json::to_vec(&ErrorResponse::new(request_id, e.code(), e.public_message()))?
        }
    };
    Ok(bytes)
}

async fn reply_to<T, R, F, Fut>(client: Client, msg: Message, handler: F) -> Result<()>
where
    T: DeserializeOwned,
    R: Serialize,
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = Result<R, OptimizeError>>,
{
    let reply = match msg.reply {
        Some(ref reply) => reply.clone(),
        None => {
            warn!("Message on {} without reply subject", msg.subject);
            return Ok(());
        }
    };

    let request: Request<T> = match serde_json::from_slice(&msg.payload) {
        Ok(req) => req,
        Err(e) => {
            warn!("Failed to parse request on {}: {}", msg.subject, e);
            let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
            client.publish(reply, serde_json::to_vec(&error)?.into()).await?;
            return Ok(());
        }
    };

    debug!("Handling request {} on {}", request.id, msg.subject);
    let bytes = encode_reply(request.id, handler(request.payload).await)?;
    client.publish(reply, bytes.into()).await?;
    Ok(())
}

/// Handle routewriter.optimize requests
pub async fn handle_optimize(
    client: Client,
    mut subscriber: Subscriber,
    optimizer: Arc<RouteOptimizer>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let client = client.clone();
        let optimizer = Arc::clone(&optimizer);
        tokio::spawn(async move {
            let result = reply_to(client, msg, |payload: OptimizeRequest| async move {
                optimizer.optimize(payload).await
            })
            .await;
            if let Err(e) = result {
                error!("Failed to reply to optimize request: {}", e);
            }
        });
    }

    Ok(())
}

/// Handle routewriter.optimize.route requests
pub async fn handle_optimize_route(
    client: Client,
    mut subscriber: Subscriber,
    optimizer: Arc<RouteOptimizer>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let client = client.clone();
        let optimizer = Arc::clone(&optimizer);
        tokio::spawn(async move {
            let result = reply_to(client, msg, |payload: RouteRequest| async move {
                optimizer.optimize_route(payload).await
            })
            .await;
            if let Err(e) = result {
                error!("Failed to reply to route request: {}", e);
            }
        });
    }

    Ok(())
}

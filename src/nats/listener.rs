use super::client::PipelineClient;
use crate::bridge::{ActionAck, EventBridge, FunctionCall, PipelineEvent};
use crate::error::SessionError;
use crate::relay::{Connection, ConnectionRegistry};
use anyhow::Result;
use futures::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Feed one connection from the pipeline until the connection closes.
///
/// Events are applied in arrival order. When the pipeline's event stream
/// ends, the connection is closed and the session ends with it.
pub async fn spawn_pipeline_listener(
    client: Arc<PipelineClient>,
    bridge: Arc<EventBridge>,
    registry: Arc<ConnectionRegistry>,
    connection: Arc<Connection>,
) -> Result<JoinHandle<()>> {
    let session_id = connection.session_id().to_string();
    let mut events = client.subscribe_events(&session_id).await?;
    let mut calls = client.subscribe_functions(&session_id).await?;
    let shutdown = connection.relay().shutdown_token();
    let mut calls_open = true;

    let handle = tokio::spawn(async move {
        info!("Pipeline listener started for session {}", session_id);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                msg = events.next() => {
                    let Some(msg) = msg else {
                        info!("Pipeline event stream for session {} ended", session_id);
                        if let Err(e) = registry
                            .close_if_current(&session_id, connection.id())
                            .await
                        {
                            error!("Failed to close session {}: {}", session_id, e);
                        }
                        break;
                    };
                    match serde_json::from_slice::<PipelineEvent>(&msg.payload) {
                        Ok(event) => {
                            if let Err(e) = bridge.handle_event(event).await {
                                error!("Failed to apply pipeline event for session {}: {}", session_id, e);
                            }
                        }
                        Err(e) => warn!("Failed to parse pipeline event: {}", e),
                    }
                }
                msg = calls.next(), if calls_open => {
                    let Some(msg) = msg else {
                        warn!("Function call subscription for session {} ended", session_id);
                        calls_open = false;
                        continue;
                    };
                    let ack = match serde_json::from_slice::<FunctionCall>(&msg.payload) {
                        Ok(call) => bridge
                            .call_function(&call)
                            .unwrap_or_else(|e| ActionAck::rejected(&e)),
                        Err(e) => {
                            warn!("Failed to parse function call: {}", e);
                            ActionAck::rejected(&SessionError::InvalidInput(e.to_string()))
                        }
                    };
                    match msg.reply {
                        Some(reply) => {
                            if let Err(e) = client.reply(reply.to_string(), &ack).await {
                                error!("Failed to reply to function call: {}", e);
                            }
                        }
                        None => warn!("Function call on session {} had no reply subject", session_id),
                    }
                }
            }
        }

        info!("Pipeline listener stopped for session {}", session_id);
    });

    Ok(handle)
}

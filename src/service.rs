//! Session lifecycle boundary used by the HTTP layer
//!
//! One `InterviewService` is built at startup and shared; it owns the
//! session store, the connection registry and the optional pipeline client.

use crate::bridge::EventBridge;
use crate::error::{SessionError, SessionResult};
use crate::nats::{spawn_pipeline_listener, PipelineClient};
use crate::relay::{Connection, ConnectionRegistry, ConnectionStatus};
use crate::session::{Asset, Session, SessionStore, SessionSummary};
use chrono::Utc;
use futures::{Sink, Stream};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{error, info};

/// A freshly opened connection and the bridge feeding it
pub struct OpenedConnection {
    pub connection: Arc<Connection>,
    pub bridge: Arc<EventBridge>,
}

pub struct InterviewService {
    store: Arc<SessionStore>,
    registry: Arc<ConnectionRegistry>,
    pipeline: Option<Arc<PipelineClient>>,
}

impl InterviewService {
    pub fn new(
        store: Arc<SessionStore>,
        registry: Arc<ConnectionRegistry>,
        pipeline: Option<Arc<PipelineClient>>,
    ) -> Self {
        Self {
            store,
            registry,
            pipeline,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Create a session under a fresh or caller-chosen id
    pub async fn create_session(
        &self,
        session_id: Option<String>,
        prompt: &str,
        assets: Vec<Asset>,
        knowledge_base: Option<serde_json::Value>,
    ) -> SessionResult<Session> {
        let session_id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        self.store
            .create(&session_id, prompt, assets, knowledge_base)
            .await
    }

    pub async fn get_session(&self, session_id: &str) -> SessionResult<Session> {
        self.store.get(session_id).await
    }

    pub async fn list_sessions(&self, active_only: bool) -> SessionResult<Vec<SessionSummary>> {
        self.store.list(active_only).await
    }

    /// End the session and tear down its live connection.
    ///
    /// Without an explicit `summary`, a basic one is recorded only if the
    /// session has none yet. The decision is made under the session lock.
    pub async fn end_session(
        &self,
        session_id: &str,
        summary: Option<serde_json::Value>,
    ) -> SessionResult<Session> {
        let now = Utc::now();
        let ended = self
            .store
            .end_with(session_id, |session| match summary {
                Some(summary) => Some(summary),
                None if session.summary.is_none() => Some(session.closing_summary(now)),
                None => None,
            })
            .await?;
        self.registry.close(session_id).await?;
        Ok(ended)
    }

    /// Open the session's relay and, when configured, wire the pipeline to it
    pub async fn open_connection(&self, session_id: &str) -> SessionResult<OpenedConnection> {
        let connection = self.registry.open(session_id).await?;
        let session = self.store.get(session_id).await?;
        let bridge = Arc::new(EventBridge::new(
            Arc::clone(&self.store),
            Arc::clone(connection.relay()),
            &session,
        ));

        if let Some(client) = &self.pipeline {
            if let Err(e) = spawn_pipeline_listener(
                Arc::clone(client),
                Arc::clone(&bridge),
                Arc::clone(&self.registry),
                Arc::clone(&connection),
            )
            .await
            {
                error!("Failed to wire pipeline for session {}: {:#}", session_id, e);
                self.registry
                    .close_if_current(session_id, connection.id())
                    .await?;
                return Err(SessionError::Pipeline(format!("{:#}", e)));
            }
        }

        info!("Connection ready for session {}", session_id);
        Ok(OpenedConnection { connection, bridge })
    }

    pub async fn close_connection(&self, session_id: &str) -> SessionResult<()> {
        self.registry.close(session_id).await
    }

    pub async fn connection_status(&self, session_id: &str) -> ConnectionStatus {
        self.registry.status(session_id).await
    }

    /// Attach a client transport to the session's open connection
    pub async fn attach_client<S, R>(&self, session_id: &str, sink: S, inbound: R) -> SessionResult<()>
    where
        S: Sink<String> + Send + 'static,
        S::Error: Display,
        R: Stream<Item = String> + Send + 'static,
    {
        let connection = self
            .registry
            .lookup(session_id)
            .await
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        connection.attach(sink, inbound)
    }
}

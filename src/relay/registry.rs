use super::channel::RelayChannel;
use crate::error::{SessionError, SessionResult};
use crate::session::SessionStore;
use chrono::{DateTime, Utc};
use futures::{Sink, Stream};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Lifecycle of a live connection. A session with no entry is in the implicit
/// `NONE` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Relay exists and queues messages; no client attached yet
    Connecting,
    /// Client attached and the outbound queue is being drained
    Active,
    /// Torn down; terminal
    Closed,
}

/// The live relay bound to one session while a client is attached
pub struct Connection {
    id: Uuid,
    session_id: String,
    opened_at: DateTime<Utc>,
    state: watch::Sender<ConnectionState>,
    relay: Arc<RelayChannel>,
}

impl Connection {
    fn new(session_id: &str, queue_warn_depth: usize) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            opened_at: Utc::now(),
            state,
            relay: Arc::new(RelayChannel::new(session_id, queue_warn_depth)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn is_live(&self) -> bool {
        self.state() != ConnectionState::Closed
    }

    pub fn relay(&self) -> &Arc<RelayChannel> {
        &self.relay
    }

    /// Wire a client transport to the relay: `CONNECTING → ACTIVE`
    pub fn attach<S, R>(&self, sink: S, inbound: R) -> SessionResult<()>
    where
        S: Sink<String> + Send + 'static,
        S::Error: Display,
        R: Stream<Item = String> + Send + 'static,
    {
        if self.state() != ConnectionState::Connecting {
            return Err(SessionError::ChannelClosed);
        }
        self.relay.attach(sink, inbound)?;

        let activated = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Active;
                true
            } else {
                false
            }
        });
        if activated {
            info!("Connection {} for session {} is active", self.id, self.session_id);
        }
        Ok(())
    }

    /// Move to `CLOSED` and release the relay. Returns `false` if already closed.
    fn shutdown(&self) -> bool {
        let closed = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Closed {
                false
            } else {
                *state = ConnectionState::Closed;
                true
            }
        });
        if closed {
            self.relay.shutdown();
            info!("Connection {} for session {} closed", self.id, self.session_id);
        }
        closed
    }
}

/// Relay state reported for a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub session_id: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ConnectionState>,
}

/// Tracks at most one live connection per session.
///
/// Opening a connection for a session that already has one closes the old
/// one first. Closing ends the session unless it has already ended.
pub struct ConnectionRegistry {
    store: Arc<SessionStore>,
    connections: RwLock<HashMap<String, Arc<Connection>>>,
    queue_warn_depth: usize,
}

impl ConnectionRegistry {
    pub fn new(store: Arc<SessionStore>, queue_warn_depth: usize) -> Arc<Self> {
        Arc::new(Self {
            store,
            connections: RwLock::new(HashMap::new()),
            queue_warn_depth,
        })
    }

    /// Create the relay for a session: `NONE → CONNECTING`
    pub async fn open(self: &Arc<Self>, session_id: &str) -> SessionResult<Arc<Connection>> {
        let connection = Arc::new(Connection::new(session_id, self.queue_warn_depth));
        {
            let mut connections = self.connections.write().await;
            // Session state must be read while the registry lock is held
            let session = self.store.get(session_id).await?;
            if !session.is_active() {
                return Err(SessionError::SessionEnded(session_id.to_string()));
            }
            if let Some(previous) = connections.remove(session_id) {
                warn!(
                    "Session {} already has connection {}; replacing it",
                    session_id,
                    previous.id()
                );
                previous.shutdown();
            }
            connections.insert(session_id.to_string(), Arc::clone(&connection));
        }

        self.watch_relay(&connection);
        info!("Opened connection {} for session {}", connection.id(), session_id);
        Ok(connection)
    }

    /// Close the session's live connection, if any, and end the session.
    /// Unknown or already-closed sessions are a no-op.
    pub async fn close(&self, session_id: &str) -> SessionResult<()> {
        let removed = self.connections.write().await.remove(session_id);
        match removed {
            Some(connection) => {
                connection.shutdown();
                self.end_if_active(session_id).await
            }
            None => Ok(()),
        }
    }

    pub async fn lookup(&self, session_id: &str) -> Option<Arc<Connection>> {
        self.connections.read().await.get(session_id).cloned()
    }

    pub async fn status(&self, session_id: &str) -> ConnectionStatus {
        let state = self.lookup(session_id).await.map(|c| c.state());
        ConnectionStatus {
            session_id: session_id.to_string(),
            is_active: matches!(
                state,
                Some(ConnectionState::Connecting | ConnectionState::Active)
            ),
            state,
        }
    }

    pub async fn live_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Close every live connection; used at process shutdown
    pub async fn close_all(&self) {
        let ids: Vec<String> = self.connections.read().await.keys().cloned().collect();
        for session_id in ids {
            if let Err(e) = self.close(&session_id).await {
                error!("Failed to close session {}: {}", session_id, e);
            }
        }
    }

    /// Tear the connection down once its relay stops on its own (client
    /// disconnect, failed delivery).
    fn watch_relay(self: &Arc<Self>, connection: &Arc<Connection>) {
        let registry = Arc::clone(self);
        let token = connection.relay().shutdown_token();
        let session_id = connection.session_id().to_string();
        let connection_id = connection.id();

        tokio::spawn(async move {
            token.cancelled().await;
            if let Err(e) = registry.close_if_current(&session_id, connection_id).await {
                error!("Failed to release session {}: {}", session_id, e);
            }
        });
    }

    /// Close `connection_id` only if it is still the session's live connection
    pub async fn close_if_current(&self, session_id: &str, connection_id: Uuid) -> SessionResult<()> {
        let removed = {
            let mut connections = self.connections.write().await;
            match connections.get(session_id) {
                Some(current) if current.id() == connection_id => connections.remove(session_id),
                _ => None,
            }
        };

        match removed {
            Some(connection) => {
                info!("Relay for session {} stopped; closing connection", session_id);
                connection.shutdown();
                self.end_if_active(session_id).await
            }
            None => Ok(()),
        }
    }

    async fn end_if_active(&self, session_id: &str) -> SessionResult<()> {
        match self.store.get(session_id).await {
            Ok(session) if session.is_active() => {
                self.store.end(session_id, None).await?;
                Ok(())
            }
            Ok(_) | Err(SessionError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

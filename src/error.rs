//! Error taxonomy for session, connection and relay operations.
//!
//! Expected user-facing outcomes (asset not in the manifest, term not in the
//! knowledge base) are not errors; they come back as failure-shaped
//! [`ActionAck`](crate::bridge::ActionAck) values.

/// Errors surfaced by the session store, connection registry and relay.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Unknown session_id.
    #[error("Session {0} not found")]
    NotFound(String),

    /// Empty asset manifest, duplicate session_id, malformed action arguments.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Connection attempted against a finalized session.
    #[error("Session {0} has already ended")]
    SessionEnded(String),

    /// The relay target disconnected mid-delivery.
    #[error("Relay channel closed")]
    ChannelClosed,

    /// The pipeline adapter could not be wired to a new connection.
    #[error("Pipeline unavailable: {0}")]
    Pipeline(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

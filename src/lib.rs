pub mod bridge;
pub mod config;
pub mod error;
pub mod http;
pub mod nats;
pub mod relay;
pub mod service;
pub mod session;

pub use bridge::{ActionAck, EventBridge, FunctionCall, KnowledgeBase, PipelineEvent, TermLookup};
pub use config::Config;
pub use error::{SessionError, SessionResult};
pub use http::{create_router, AppState};
pub use nats::PipelineClient;
pub use relay::{
    ClientFrame, ClientMessage, Connection, ConnectionRegistry, ConnectionState, RelayChannel,
};
pub use service::{InterviewService, OpenedConnection};
pub use session::{
    Asset, AssetKind, JsonFileRepository, MemoryRepository, Session, SessionRepository,
    SessionStore, SessionSummary, Speaker, TranscriptEntry, TranscriptLog,
};

//! Session state and durable storage
//!
//! - `Session` and its asset manifest, transcript and summary
//! - `TranscriptLog` with interim/final coalescing
//! - `SessionStore`, the single writer of session records
//! - `SessionRepository` backends (JSON files, memory)

mod model;
mod repository;
mod store;
mod transcript;

pub use model::{
    validate_session_id, Asset, AssetKind, Session, SessionSummary, Speaker, TranscriptEntry,
    TranscriptExport, TranscriptTurn, MAX_SESSION_ID_LEN,
};
pub use repository::{JsonFileRepository, MemoryRepository, SessionRepository};
pub use store::SessionStore;
pub use transcript::{AppendOutcome, TranscriptLog};

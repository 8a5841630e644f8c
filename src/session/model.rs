use super::transcript::TranscriptLog;
use crate::error::{SessionError, SessionResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest accepted session id
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Session ids become file names and NATS subject tokens, so only ASCII
/// letters, digits, `-` and `_` are accepted.
pub fn validate_session_id(session_id: &str) -> SessionResult<()> {
    if session_id.is_empty() || session_id.len() > MAX_SESSION_ID_LEN {
        return Err(SessionError::InvalidInput(format!(
            "Session id must be 1 to {} characters",
            MAX_SESSION_ID_LEN
        )));
    }
    if !session_id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(SessionError::InvalidInput(format!(
            "Session id {:?} may only contain letters, digits, '-' and '_'",
            session_id
        )));
    }
    Ok(())
}

/// Who produced a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Bot,
}

impl Speaker {
    /// Name used in the plain-text transcript export
    pub fn display_name(self) -> &'static str {
        match self {
            Speaker::User => "You",
            Speaker::Bot => "Maya",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Video,
}

/// An entry of the asset manifest, as produced by asset ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: String,

    pub title: String,

    #[serde(rename = "type")]
    pub kind: AssetKind,

    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<f64>,

    /// Default clip start for videos, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,

    /// Default clip end for videos, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
}

/// One speech turn in the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,

    pub text: String,

    /// Capture time of the first fragment of this turn
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,

    pub is_final: bool,
}

/// Durable session record. Serialized as one JSON document per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,

    /// Interviewer instructions
    pub prompt: String,

    /// Immutable after creation, never empty
    pub assets: Vec<Asset>,

    #[serde(default)]
    pub knowledge_base: Option<serde_json::Value>,

    #[serde(default)]
    pub transcript: TranscriptLog,

    #[serde(default)]
    pub summary: Option<serde_json::Value>,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    pub fn find_asset(&self, asset_id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.asset_id == asset_id)
    }

    /// Number of final turns in the transcript
    pub fn turn_count(&self) -> usize {
        self.transcript.final_count()
    }

    /// Summary recorded when a session is ended without an explicit one.
    /// Duration runs to `ended_at`, or to `now` while the session is active.
    pub fn closing_summary(&self, now: DateTime<Utc>) -> serde_json::Value {
        let duration = self
            .ended_at
            .unwrap_or(now)
            .signed_duration_since(self.created_at);
        serde_json::json!({
            "session_id": self.session_id,
            "turn_count": self.turn_count(),
            "duration_seconds": duration.num_seconds(),
        })
    }

    /// Stored summary, or a basic one generated from the current state
    pub fn summary_artifact(&self) -> serde_json::Value {
        match &self.summary {
            Some(summary) => summary.clone(),
            None => serde_json::json!({
                "session_id": self.session_id,
                "turn_count": self.turn_count(),
                "asset_count": self.assets.len(),
                "has_knowledge_base": self.knowledge_base.is_some(),
            }),
        }
    }

    pub fn listing(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            prompt: self.prompt.clone(),
            created_at: self.created_at,
            ended_at: self.ended_at,
            is_active: self.is_active(),
            asset_count: self.assets.len(),
            transcript_count: self.transcript.len(),
        }
    }

    /// Final turns as `{session_id, turns: [{speaker, text, ts}]}`
    pub fn transcript_json(&self) -> TranscriptExport {
        TranscriptExport {
            session_id: self.session_id.clone(),
            turns: self
                .transcript
                .finals()
                .map(|e| TranscriptTurn {
                    speaker: e.speaker,
                    text: e.text.clone(),
                    ts: e.timestamp,
                })
                .collect(),
        }
    }

    /// Final turns as `[<ts>] <speaker>: <text>` lines
    pub fn transcript_text(&self) -> String {
        self.transcript
            .finals()
            .map(|e| {
                format!(
                    "[{}] {}: {}",
                    e.timestamp.to_rfc3339(),
                    e.speaker.display_name(),
                    e.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Listing row returned by `SessionStore::list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub asset_count: usize,
    pub transcript_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptExport {
    pub session_id: String,
    pub turns: Vec<TranscriptTurn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub speaker: Speaker,
    pub text: String,
    pub ts: DateTime<Utc>,
}

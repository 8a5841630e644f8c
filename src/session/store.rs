use super::model::{validate_session_id, Asset, Session, SessionSummary, Speaker};
use super::repository::SessionRepository;
use super::transcript::{AppendOutcome, TranscriptLog};
use crate::error::{SessionError, SessionResult};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

type SessionCell = Arc<Mutex<Session>>;

/// Owns every session's state and is the single writer of its durable record.
///
/// Mutations on one session are serialized by that session's lock, and the
/// record is rewritten before the lock is released. Sessions do not share
/// locks with each other.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionCell>>,
    repository: Arc<dyn SessionRepository>,
}

impl SessionStore {
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        info!("Session store using {} repository", repository.name());
        Self {
            sessions: RwLock::new(HashMap::new()),
            repository,
        }
    }

    /// Create and persist a new session
    pub async fn create(
        &self,
        session_id: &str,
        prompt: &str,
        assets: Vec<Asset>,
        knowledge_base: Option<serde_json::Value>,
    ) -> SessionResult<Session> {
        validate_session_id(session_id)?;
        if assets.is_empty() {
            return Err(SessionError::InvalidInput(
                "At least one asset is required".to_string(),
            ));
        }

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(session_id) || self.repository.load(session_id).await?.is_some()
        {
            return Err(SessionError::InvalidInput(format!(
                "Session {} already exists",
                session_id
            )));
        }

        let session = Session {
            session_id: session_id.to_string(),
            prompt: prompt.to_string(),
            assets,
            knowledge_base,
            transcript: TranscriptLog::new(),
            summary: None,
            created_at: Utc::now(),
            ended_at: None,
        };

        self.repository.save(&session).await?;
        sessions.insert(session_id.to_string(), Arc::new(Mutex::new(session.clone())));

        info!(
            "Created session {} ({} assets, knowledge base: {})",
            session_id,
            session.assets.len(),
            session.knowledge_base.is_some()
        );
        Ok(session)
    }

    /// Copy of the session, rehydrated from durable storage if not cached
    pub async fn get(&self, session_id: &str) -> SessionResult<Session> {
        let cell = self.cell(session_id).await?;
        let session = cell.lock().await;
        Ok(session.clone())
    }

    /// Record a transcript fragment, coalescing into the trailing interim entry
    /// of the same speaker. Blank text is a no-op.
    pub async fn append_transcript(
        &self,
        session_id: &str,
        speaker: Speaker,
        text: &str,
        is_final: bool,
    ) -> SessionResult<AppendOutcome> {
        let cell = self.cell(session_id).await?;
        if text.trim().is_empty() {
            return Ok(AppendOutcome::Ignored);
        }
        self.mutate(&cell, |session| {
            session
                .transcript
                .append(speaker, text, is_final, Utc::now())
        })
        .await
    }

    /// Mark the session ended. `ended_at` keeps its first value on repeated
    /// calls; `summary` replaces the stored one only when given.
    pub async fn end(
        &self,
        session_id: &str,
        summary: Option<serde_json::Value>,
    ) -> SessionResult<Session> {
        self.end_with(session_id, move |_| summary).await
    }

    /// Mark the session ended and let `summary` decide, under the session
    /// lock, what summary to store. `summary` sees the session with
    /// `ended_at` already set; returning `None` keeps the stored summary.
    pub async fn end_with(
        &self,
        session_id: &str,
        summary: impl FnOnce(&Session) -> Option<serde_json::Value>,
    ) -> SessionResult<Session> {
        let cell = self.cell(session_id).await?;
        let session = self
            .mutate(&cell, |session| {
                if session.ended_at.is_none() {
                    session.ended_at = Some(Utc::now());
                    info!("Session {} ended", session.session_id);
                }
                if let Some(summary) = summary(&*session) {
                    session.summary = Some(summary);
                }
                session.clone()
            })
            .await?;
        Ok(session)
    }

    /// Snapshot listing of known sessions, cached and persisted
    pub async fn list(&self, active_only: bool) -> SessionResult<Vec<SessionSummary>> {
        let mut ids: BTreeSet<String> = self.sessions.read().await.keys().cloned().collect();
        ids.extend(self.repository.list_ids().await?);

        let mut listing = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get(&id).await {
                Ok(session) if !active_only || session.is_active() => {
                    listing.push(session.listing())
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable session {}: {}", id, e),
            }
        }
        Ok(listing)
    }

    async fn cell(&self, session_id: &str) -> SessionResult<SessionCell> {
        if let Some(cell) = self.sessions.read().await.get(session_id) {
            return Ok(Arc::clone(cell));
        }

        let mut sessions = self.sessions.write().await;
        // Another caller may have rehydrated it while we waited for the write lock
        if let Some(cell) = sessions.get(session_id) {
            return Ok(Arc::clone(cell));
        }

        match self.repository.load(session_id).await? {
            Some(session) => {
                info!("Rehydrated session {} from storage", session_id);
                let cell = Arc::new(Mutex::new(session));
                sessions.insert(session_id.to_string(), Arc::clone(&cell));
                Ok(cell)
            }
            None => Err(SessionError::NotFound(session_id.to_string())),
        }
    }

    /// Apply `change` to a draft copy, persist it, then commit it in memory.
    /// The session lock is held throughout so writes never interleave.
    async fn mutate<R>(
        &self,
        cell: &SessionCell,
        change: impl FnOnce(&mut Session) -> R,
    ) -> SessionResult<R> {
        let mut session = cell.lock().await;
        let mut draft = session.clone();
        let out = change(&mut draft);
        self.repository.save(&draft).await?;
        *session = draft;
        Ok(out)
    }
}

use super::model::{validate_session_id, Session};
use crate::error::SessionResult;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// Durable storage for session records, keyed by session_id.
///
/// Every save rewrites the whole record.
#[async_trait::async_trait]
pub trait SessionRepository: Send + Sync {
    async fn save(&self, session: &Session) -> SessionResult<()>;

    /// `Ok(None)` when no record exists for `session_id`
    async fn load(&self, session_id: &str) -> SessionResult<Option<Session>>;

    async fn list_ids(&self) -> SessionResult<Vec<String>>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// One pretty-printed JSON document per session under `<root>/sessions/`
pub struct JsonFileRepository {
    dir: PathBuf,
}

impl JsonFileRepository {
    /// Create the repository rooted at `storage_path`, creating directories as needed
    pub async fn open(storage_path: impl AsRef<Path>) -> SessionResult<Self> {
        let dir = storage_path.as_ref().join("sessions");
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// Invalid ids are rejected so a record never lands outside `dir`
    fn record_path(&self, session_id: &str) -> SessionResult<PathBuf> {
        validate_session_id(session_id)?;
        Ok(self.dir.join(format!("{}.json", session_id)))
    }
}

#[async_trait::async_trait]
impl SessionRepository for JsonFileRepository {
    async fn save(&self, session: &Session) -> SessionResult<()> {
        let path = self.record_path(&session.session_id)?;
        let temp_path = path.with_extension("json.tmp");

        let payload = serde_json::to_vec_pretty(session)?;
        tokio::fs::write(&temp_path, payload).await?;
        // Rename so readers never observe a half-written record
        tokio::fs::rename(&temp_path, &path).await?;

        debug!("Persisted session {} to {}", session.session_id, path.display());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> SessionResult<Option<Session>> {
        let path = self.record_path(session_id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_ids(&self) -> SessionResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        Ok(ids)
    }

    fn name(&self) -> &str {
        "json-file"
    }
}

/// Keeps serialized records in memory; used when durability is not wanted
#[derive(Default)]
pub struct MemoryRepository {
    records: RwLock<HashMap<String, String>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionRepository for MemoryRepository {
    async fn save(&self, session: &Session) -> SessionResult<()> {
        let payload = serde_json::to_string(session)?;
        self.records
            .write()
            .await
            .insert(session.session_id.clone(), payload);
        Ok(())
    }

    async fn load(&self, session_id: &str) -> SessionResult<Option<Session>> {
        let records = self.records.read().await;
        match records.get(session_id) {
            Some(payload) => Ok(Some(serde_json::from_str(payload)?)),
            None => Ok(None),
        }
    }

    async fn list_ids(&self) -> SessionResult<Vec<String>> {
        Ok(self.records.read().await.keys().cloned().collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

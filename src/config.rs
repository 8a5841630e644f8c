use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub relay: RelayConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON document per session under `<path>/sessions/`
    File,
    /// Process-local only, nothing survives a restart
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub path: String,
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Log a warning each time an outbound queue grows by this many messages
    pub queue_warn_depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// NATS server URL; the pipeline adapter is disabled when unset
    pub nats_url: Option<String>,

    /// Subjects are `<prefix>.<session_id>.events` and `<prefix>.<session_id>.functions`
    pub subject_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "interview-relay".to_string(),
                http: HttpConfig {
                    bind: "0.0.0.0".to_string(),
                    port: 8000,
                },
            },
            storage: StorageConfig {
                path: "./storage".to_string(),
                backend: StorageBackend::File,
            },
            relay: RelayConfig {
                queue_warn_depth: 256,
            },
            pipeline: PipelineConfig {
                nats_url: None,
                subject_prefix: "pipeline".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from defaults, an optional file and `INTERVIEW_RELAY__*` env vars
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::Config::try_from(&Config::default())
                    .context("Failed to build default config")?,
            )
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("INTERVIEW_RELAY").separator("__"))
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        settings
            .try_deserialize()
            .context("Failed to deserialize config")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.http.bind, self.service.http.port)
    }
}

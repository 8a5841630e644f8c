use crate::bridge::ActionAck;
use anyhow::{Context, Result};
use async_nats::Client;
use tracing::{debug, info};

/// NATS connection to the speech/LLM pipeline
pub struct PipelineClient {
    client: Client,
    subject_prefix: String,
}

impl PipelineClient {
    /// Connect to NATS server
    pub async fn connect(url: &str, subject_prefix: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self {
            client,
            subject_prefix: subject_prefix.to_string(),
        })
    }

    /// Subject carrying `PipelineEvent`s for one session
    pub fn events_subject(&self, session_id: &str) -> String {
        events_subject(&self.subject_prefix, session_id)
    }

    /// Request/reply subject for one session's function calls
    pub fn functions_subject(&self, session_id: &str) -> String {
        functions_subject(&self.subject_prefix, session_id)
    }

    pub async fn subscribe_events(&self, session_id: &str) -> Result<async_nats::Subscriber> {
        let subject = self.events_subject(session_id);
        info!("Subscribing to pipeline events on {}", subject);

        self.client
            .subscribe(subject)
            .await
            .context("Failed to subscribe to pipeline events")
    }

    pub async fn subscribe_functions(&self, session_id: &str) -> Result<async_nats::Subscriber> {
        let subject = self.functions_subject(session_id);
        info!("Serving function calls on {}", subject);

        self.client
            .subscribe(subject)
            .await
            .context("Failed to subscribe to function calls")
    }

    /// Answer a function call on its reply subject
    pub async fn reply(&self, reply_subject: String, ack: &ActionAck) -> Result<()> {
        let payload = serde_json::to_vec(ack)?;

        self.client
            .publish(reply_subject.clone(), payload.into())
            .await
            .context("Failed to publish function reply")?;

        debug!("Replied on {} (success={})", reply_subject, ack.is_success());
        Ok(())
    }
}

pub fn events_subject(prefix: &str, session_id: &str) -> String {
    format!("{}.{}.events", prefix, session_id)
}

pub fn functions_subject(prefix: &str, session_id: &str) -> String {
    format!("{}.{}.functions", prefix, session_id)
}

use super::knowledge::{KnowledgeBase, TermLookup};
use crate::error::{SessionError, SessionResult};
use crate::relay::{ClientMessage, RelayChannel};
use crate::session::{Asset, Session, SessionStore, Speaker};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Event produced by the speech/LLM pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Interim recognition of the user's in-progress utterance
    PartialTranscript { text: String },
    /// Confirmed utterance from either side
    FinalTranscript { speaker: Speaker, text: String },
}

/// Function invoked by the pipeline's LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayAck {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupAck {
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Structured result handed back to the pipeline for a function call.
/// A miss is a normal value, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionAck {
    Display(DisplayAck),
    Lookup(LookupAck),
}

impl ActionAck {
    fn display(success: bool, message: impl Into<String>) -> Self {
        ActionAck::Display(DisplayAck {
            success,
            message: message.into(),
        })
    }

    fn not_found(message: String) -> Self {
        ActionAck::Lookup(LookupAck {
            found: false,
            term: None,
            definition: None,
            why: None,
            message: Some(message),
        })
    }

    /// Failure-shaped acknowledgement for a call that could not be dispatched
    pub fn rejected(error: &SessionError) -> Self {
        Self::display(false, error.to_string())
    }

    pub fn is_success(&self) -> bool {
        match self {
            ActionAck::Display(ack) => ack.success,
            ActionAck::Lookup(ack) => ack.found,
        }
    }
}

#[derive(Deserialize)]
struct ShowAssetArgs {
    asset_id: String,
    #[serde(default)]
    start_time: Option<f64>,
    #[serde(default)]
    end_time: Option<f64>,
}

#[derive(Deserialize)]
struct LookupArgs {
    term: String,
}

/// Adapts pipeline events and function calls for one session into relay
/// messages and transcript writes
pub struct EventBridge {
    session_id: String,
    store: Arc<SessionStore>,
    relay: Arc<RelayChannel>,
    assets: Vec<Asset>,
    knowledge: Option<Arc<dyn TermLookup>>,
}

impl EventBridge {
    /// Bridge for `session`, using its knowledge-base snapshot for lookups
    pub fn new(store: Arc<SessionStore>, relay: Arc<RelayChannel>, session: &Session) -> Self {
        let knowledge = session.knowledge_base.as_ref().and_then(|snapshot| {
            match KnowledgeBase::from_snapshot(snapshot) {
                Ok(kb) => Some(Arc::new(kb) as Arc<dyn TermLookup>),
                Err(e) => {
                    warn!(
                        "Ignoring unreadable knowledge base for session {}: {}",
                        session.session_id, e
                    );
                    None
                }
            }
        });

        Self {
            session_id: session.session_id.clone(),
            store,
            relay,
            assets: session.assets.clone(),
            knowledge,
        }
    }

    /// Replace the term lookup collaborator
    pub fn with_term_lookup(mut self, lookup: Option<Arc<dyn TermLookup>>) -> Self {
        self.knowledge = lookup;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Relay a transcript event; final ones are also recorded
    pub async fn handle_event(&self, event: PipelineEvent) -> SessionResult<()> {
        match event {
            PipelineEvent::PartialTranscript { text } => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(());
                }
                self.relay.enqueue(ClientMessage::Transcript {
                    speaker: Speaker::User,
                    text: text.to_string(),
                    is_final: false,
                });
            }
            PipelineEvent::FinalTranscript { speaker, text } => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(());
                }
                self.relay.enqueue(ClientMessage::Transcript {
                    speaker,
                    text: text.to_string(),
                    is_final: true,
                });
                self.store
                    .append_transcript(&self.session_id, speaker, text, true)
                    .await?;
                debug!("Recorded {:?} turn for session {}", speaker, self.session_id);
            }
        }
        Ok(())
    }

    /// Dispatch an LLM function call by name
    pub fn call_function(&self, call: &FunctionCall) -> SessionResult<ActionAck> {
        match call.name.as_str() {
            "show_asset" => {
                let args: ShowAssetArgs = parse_args(&call.name, &call.args)?;
                Ok(self.show_asset(&args.asset_id, args.start_time, args.end_time))
            }
            "hide_asset" => Ok(self.hide_asset()),
            "kb_lookup" => {
                let args: LookupArgs = parse_args(&call.name, &call.args)?;
                Ok(self.lookup_term(&args.term))
            }
            other => Err(SessionError::InvalidInput(format!(
                "Unknown function {}",
                other
            ))),
        }
    }

    /// Show an asset from the session's manifest, optionally as a clip
    pub fn show_asset(
        &self,
        asset_id: &str,
        start_time: Option<f64>,
        end_time: Option<f64>,
    ) -> ActionAck {
        let Some(asset) = self.assets.iter().find(|a| a.asset_id == asset_id) else {
            info!("Session {} asked for unknown asset {}", self.session_id, asset_id);
            return ActionAck::display(false, format!("Asset {} not found", asset_id));
        };

        self.relay.enqueue(ClientMessage::ShowAsset {
            asset_id: asset_id.to_string(),
            asset: asset.clone(),
            start_time,
            end_time,
        });

        let clip = if start_time.is_some() || end_time.is_some() {
            format!(
                " (clip: {}s - {})",
                start_time.unwrap_or(0.0),
                end_time.map_or_else(|| "end".to_string(), |end| format!("{}s", end))
            )
        } else {
            String::new()
        };
        ActionAck::display(true, format!("Now showing {}{}", asset.title, clip))
    }

    pub fn hide_asset(&self) -> ActionAck {
        self.relay.enqueue(ClientMessage::HideAsset);
        ActionAck::display(true, "Asset hidden")
    }

    pub fn lookup_term(&self, term: &str) -> ActionAck {
        let Some(knowledge) = &self.knowledge else {
            return ActionAck::not_found(
                "No knowledge base available for this session.".to_string(),
            );
        };

        match knowledge.lookup(term) {
            Some(hit) => {
                let definition = match &hit.example {
                    Some(example) => format!("{} For example: {}", hit.definition, example),
                    None => hit.definition,
                };
                ActionAck::Lookup(LookupAck {
                    found: true,
                    term: Some(hit.term),
                    definition: Some(definition),
                    why: hit.why,
                    message: None,
                })
            }
            None => ActionAck::not_found(format!(
                "I don't have a definition for '{}' in my knowledge base.",
                term
            )),
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(
    name: &str,
    args: &serde_json::Value,
) -> SessionResult<T> {
    serde_json::from_value(args.clone())
        .map_err(|e| SessionError::InvalidInput(format!("Bad arguments for {}: {}", name, e)))
}

use crate::session::{Asset, Speaker};
use serde::{Deserialize, Serialize};

/// Message delivered to the connected client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Transcript {
        speaker: Speaker,
        text: String,
        is_final: bool,
    },
    ShowAsset {
        asset_id: String,
        asset: Asset,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_time: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_time: Option<f64>,
    },
    HideAsset,
    Pong,
}

/// Control frame sent by the client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Ping,
    /// Any other frame type; accepted and ignored
    #[serde(other)]
    Unknown,
}

impl ClientFrame {
    /// `None` when the text is not a JSON object with a `type` field
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

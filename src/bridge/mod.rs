//! Pipeline-to-client event bridge
//!
//! Turns speech-recognition and bot-utterance events into relay messages and
//! transcript writes, and serves the LLM's `show_asset`, `hide_asset` and
//! `kb_lookup` function calls.

mod events;
mod knowledge;

pub use events::{ActionAck, DisplayAck, EventBridge, FunctionCall, LookupAck, PipelineEvent};
pub use knowledge::{KnowledgeBase, TermDefinition, TermLookup};

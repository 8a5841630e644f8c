// Integration tests for the event bridge
//
// Pipeline events and function calls go in; relay messages, transcript
// writes and acknowledgements come out.

mod common;

use anyhow::Result;
use common::{image_asset, memory_store, video_asset};
use futures::channel::mpsc;
use futures::StreamExt;
use interview_relay::bridge::{TermDefinition, TermLookup};
use interview_relay::{
    ActionAck, EventBridge, FunctionCall, PipelineEvent, RelayChannel, SessionError, SessionStore,
    Speaker,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

struct Harness {
    store: Arc<SessionStore>,
    relay: Arc<RelayChannel>,
    bridge: EventBridge,
}

async fn harness(knowledge_base: Option<Value>) -> Result<Harness> {
    let store = memory_store();
    let session = store
        .create(
            "s-1",
            "Intro",
            vec![
                image_asset("img-1", "Org chart"),
                video_asset("vid-1", "Product demo", 90.0),
            ],
            knowledge_base,
        )
        .await?;
    let relay = Arc::new(RelayChannel::new("s-1", 0));
    let bridge = EventBridge::new(Arc::clone(&store), Arc::clone(&relay), &session);
    Ok(Harness {
        store,
        relay,
        bridge,
    })
}

/// Attach a client and collect `count` delivered messages
async fn drain(relay: &RelayChannel, count: usize) -> Result<Vec<Value>> {
    let (sink, mut received) = mpsc::unbounded::<String>();
    let (_frames, inbound) = mpsc::unbounded::<String>();
    relay.attach(sink, inbound)?;

    let mut messages = Vec::with_capacity(count);
    for _ in 0..count {
        let text = timeout(Duration::from_secs(2), received.next())
            .await?
            .ok_or_else(|| anyhow::anyhow!("relay closed early"))?;
        messages.push(serde_json::from_str(&text)?);
    }
    Ok(messages)
}

#[tokio::test]
async fn test_partial_transcript_is_relayed_not_recorded() -> Result<()> {
    let h = harness(None).await?;

    h.bridge
        .handle_event(PipelineEvent::PartialTranscript {
            text: "  I think ".to_string(),
        })
        .await?;

    assert_eq!(h.relay.pending(), 1);
    assert!(h.store.get("s-1").await?.transcript.is_empty());

    let messages = drain(&h.relay, 1).await?;
    assert_eq!(
        messages[0],
        json!({"type": "transcript", "speaker": "user", "text": "I think", "is_final": false})
    );
    Ok(())
}

#[tokio::test]
async fn test_final_transcripts_are_relayed_and_recorded() -> Result<()> {
    let h = harness(None).await?;

    h.bridge
        .handle_event(PipelineEvent::FinalTranscript {
            speaker: Speaker::User,
            text: "I think so".to_string(),
        })
        .await?;
    h.bridge
        .handle_event(PipelineEvent::FinalTranscript {
            speaker: Speaker::Bot,
            text: "Great, let's continue.".to_string(),
        })
        .await?;

    let session = h.store.get("s-1").await?;
    assert_eq!(session.turn_count(), 2);
    assert_eq!(session.transcript.entries()[1].speaker, Speaker::Bot);

    let messages = drain(&h.relay, 2).await?;
    assert_eq!(messages[0]["speaker"], "user");
    assert_eq!(messages[0]["is_final"], true);
    assert_eq!(messages[1]["speaker"], "bot");
    assert_eq!(messages[1]["text"], "Great, let's continue.");
    Ok(())
}

#[tokio::test]
async fn test_blank_events_are_dropped() -> Result<()> {
    let h = harness(None).await?;

    h.bridge
        .handle_event(PipelineEvent::PartialTranscript { text: " ".to_string() })
        .await?;
    h.bridge
        .handle_event(PipelineEvent::FinalTranscript {
            speaker: Speaker::Bot,
            text: String::new(),
        })
        .await?;

    assert_eq!(h.relay.pending(), 0);
    assert!(h.store.get("s-1").await?.transcript.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_show_known_asset() -> Result<()> {
    let h = harness(None).await?;

    let ack = h.bridge.show_asset("img-1", None, None);
    assert!(ack.is_success());
    assert_eq!(
        serde_json::to_value(&ack)?,
        json!({"success": true, "message": "Now showing Org chart"})
    );

    let messages = drain(&h.relay, 1).await?;
    assert_eq!(messages[0]["type"], "show_asset");
    assert_eq!(messages[0]["asset_id"], "img-1");
    assert_eq!(messages[0]["asset"]["title"], "Org chart");
    assert_eq!(messages[0]["asset"]["type"], "image");
    assert!(messages[0].get("start_time").is_none());
    Ok(())
}

#[tokio::test]
async fn test_show_unknown_asset_enqueues_nothing() -> Result<()> {
    let h = harness(None).await?;

    let ack = h.bridge.show_asset("img-99", None, None);
    assert!(!ack.is_success());
    assert_eq!(
        serde_json::to_value(&ack)?,
        json!({"success": false, "message": "Asset img-99 not found"})
    );
    assert_eq!(h.relay.pending(), 0);
    Ok(())
}

#[tokio::test]
async fn test_show_video_clip() -> Result<()> {
    let h = harness(None).await?;

    let ack = h.bridge.show_asset("vid-1", Some(12.5), None);
    match &ack {
        ActionAck::Display(display) => {
            assert_eq!(display.message, "Now showing Product demo (clip: 12.5s - end)")
        }
        other => panic!("unexpected ack {:?}", other),
    }

    let messages = drain(&h.relay, 1).await?;
    assert_eq!(messages[0]["start_time"], 12.5);
    assert!(messages[0].get("end_time").is_none());
    Ok(())
}

#[tokio::test]
async fn test_hide_asset_always_succeeds() -> Result<()> {
    let h = harness(None).await?;

    let ack = h.bridge.hide_asset();
    assert!(ack.is_success());

    let messages = drain(&h.relay, 1).await?;
    assert_eq!(messages[0], json!({"type": "hide_asset"}));
    Ok(())
}

#[tokio::test]
async fn test_lookup_without_knowledge_base() -> Result<()> {
    let h = harness(None).await?;

    let ack = serde_json::to_value(h.bridge.lookup_term("ETL"))?;
    assert_eq!(
        ack,
        json!({"found": false, "message": "No knowledge base available for this session."})
    );
    Ok(())
}

#[tokio::test]
async fn test_lookup_from_session_snapshot() -> Result<()> {
    let h = harness(Some(json!({
        "terms": [{
            "term": "ETL",
            "definition": "Extract, transform, load.",
            "example": "Nightly warehouse import.",
            "why": "Moves data between systems."
        }]
    })))
    .await?;

    let ack = serde_json::to_value(h.bridge.lookup_term("etl"))?;
    assert_eq!(ack["found"], true);
    assert_eq!(ack["term"], "etl");
    assert_eq!(
        ack["definition"],
        "Extract, transform, load. For example: Nightly warehouse import."
    );
    assert_eq!(ack["why"], "Moves data between systems.");

    let miss = h.bridge.lookup_term("kubernetes");
    assert!(!miss.is_success());
    Ok(())
}

struct FixedLookup;

impl TermLookup for FixedLookup {
    fn lookup(&self, query: &str) -> Option<TermDefinition> {
        (query == "SLA").then(|| TermDefinition {
            term: "SLA".to_string(),
            definition: "Service level agreement.".to_string(),
            why: None,
            example: None,
        })
    }
}

#[tokio::test]
async fn test_lookup_uses_injected_collaborator() -> Result<()> {
    let h = harness(None).await?;
    let bridge = h.bridge.with_term_lookup(Some(Arc::new(FixedLookup)));

    let ack = serde_json::to_value(bridge.lookup_term("SLA"))?;
    assert_eq!(
        ack,
        json!({"found": true, "term": "SLA", "definition": "Service level agreement."})
    );
    Ok(())
}

#[tokio::test]
async fn test_function_call_dispatch() -> Result<()> {
    let h = harness(None).await?;

    let ack = h.bridge.call_function(&FunctionCall {
        name: "show_asset".to_string(),
        args: json!({"asset_id": "img-1"}),
    })?;
    assert!(ack.is_success());

    let ack = h.bridge.call_function(&FunctionCall {
        name: "hide_asset".to_string(),
        args: Value::Null,
    })?;
    assert!(ack.is_success());
    assert_eq!(h.relay.pending(), 2);
    Ok(())
}

#[tokio::test]
async fn test_function_call_rejects_bad_input() -> Result<()> {
    let h = harness(None).await?;

    let missing_arg = h.bridge.call_function(&FunctionCall {
        name: "show_asset".to_string(),
        args: json!({}),
    });
    assert!(matches!(missing_arg, Err(SessionError::InvalidInput(_))));

    let unknown = h.bridge.call_function(&FunctionCall {
        name: "launch_rocket".to_string(),
        args: json!({}),
    });
    assert!(matches!(unknown, Err(SessionError::InvalidInput(_))));

    assert_eq!(h.relay.pending(), 0);
    Ok(())
}

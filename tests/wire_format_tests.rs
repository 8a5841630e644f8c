use interview_relay::bridge::{DisplayAck, LookupAck};
use interview_relay::nats::{events_subject, functions_subject};
use interview_relay::{
    ActionAck, Asset, AssetKind, ClientFrame, ClientMessage, FunctionCall, PipelineEvent, Speaker,
};
use serde_json::json;

#[test]
fn test_transcript_message_serialization() {
    let msg = ClientMessage::Transcript {
        speaker: Speaker::Bot,
        text: "Tell me about your role.".to_string(),
        is_final: true,
    };

    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(
        value,
        json!({
            "type": "transcript",
            "speaker": "bot",
            "text": "Tell me about your role.",
            "is_final": true
        })
    );
}

#[test]
fn test_show_asset_message_serialization() {
    let msg = ClientMessage::ShowAsset {
        asset_id: "vid-1".to_string(),
        asset: Asset {
            asset_id: "vid-1".to_string(),
            title: "Demo".to_string(),
            kind: AssetKind::Video,
            url: "/storage/demo.mp4".to_string(),
            poster_url: None,
            duration_sec: Some(42.0),
            start_time: None,
            end_time: None,
        },
        start_time: Some(5.0),
        end_time: Some(20.0),
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"type\":\"show_asset\""));
    assert!(json.contains("\"start_time\":5.0"));
    assert!(!json.contains("poster_url"));

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["asset"]["type"], "video");
    assert_eq!(value["asset"]["duration_sec"], 42.0);
}

#[test]
fn test_control_messages_serialization() {
    assert_eq!(
        serde_json::to_string(&ClientMessage::HideAsset).unwrap(),
        r#"{"type":"hide_asset"}"#
    );
    assert_eq!(
        serde_json::to_string(&ClientMessage::Pong).unwrap(),
        r#"{"type":"pong"}"#
    );
}

#[test]
fn test_client_frame_parsing() {
    assert_eq!(ClientFrame::parse(r#"{"type":"ping"}"#), Some(ClientFrame::Ping));
    assert_eq!(
        ClientFrame::parse(r#"{"type":"resize","width":800}"#),
        Some(ClientFrame::Unknown)
    );
    assert_eq!(ClientFrame::parse("ping"), None);
    assert_eq!(ClientFrame::parse(r#"{"kind":"ping"}"#), None);
}

#[test]
fn test_pipeline_event_deserialization() {
    let partial: PipelineEvent =
        serde_json::from_str(r#"{"type":"partial_transcript","text":"I was"}"#).unwrap();
    assert_eq!(
        partial,
        PipelineEvent::PartialTranscript {
            text: "I was".to_string()
        }
    );

    let final_event: PipelineEvent = serde_json::from_str(
        r#"{"type":"final_transcript","speaker":"user","text":"I was a lead"}"#,
    )
    .unwrap();
    assert_eq!(
        final_event,
        PipelineEvent::FinalTranscript {
            speaker: Speaker::User,
            text: "I was a lead".to_string()
        }
    );

    assert!(serde_json::from_str::<PipelineEvent>(r#"{"type":"audio"}"#).is_err());
}

#[test]
fn test_function_call_args_default() {
    let call: FunctionCall = serde_json::from_str(r#"{"name":"hide_asset"}"#).unwrap();
    assert_eq!(call.name, "hide_asset");
    assert!(call.args.is_null());

    let call: FunctionCall =
        serde_json::from_str(r#"{"name":"kb_lookup","args":{"term":"ETL"}}"#).unwrap();
    assert_eq!(call.args["term"], "ETL");
}

#[test]
fn test_action_ack_shapes() {
    let display = ActionAck::Display(DisplayAck {
        success: true,
        message: "Asset hidden".to_string(),
    });
    assert_eq!(
        serde_json::to_value(&display).unwrap(),
        json!({"success": true, "message": "Asset hidden"})
    );

    let lookup = ActionAck::Lookup(LookupAck {
        found: true,
        term: Some("etl".to_string()),
        definition: Some("Extract, transform, load.".to_string()),
        why: None,
        message: None,
    });
    assert_eq!(
        serde_json::to_value(&lookup).unwrap(),
        json!({"found": true, "term": "etl", "definition": "Extract, transform, load."})
    );

    let parsed: ActionAck = serde_json::from_str(r#"{"found":false,"message":"nope"}"#).unwrap();
    assert!(matches!(parsed, ActionAck::Lookup(_)));
    assert!(!parsed.is_success());
}

#[test]
fn test_pipeline_subjects() {
    assert_eq!(events_subject("pipeline", "s-1"), "pipeline.s-1.events");
    assert_eq!(functions_subject("pipeline", "s-1"), "pipeline.s-1.functions");
}

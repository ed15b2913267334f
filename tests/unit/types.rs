use send_channel::types::{
    ConfirmedMessage, DraftPayload, DraftState, FileMeta, MessageType, OutboundPayload, TempId,
    Upload, UploadResult, VoiceMeta,
};
use serde_json::json;

#[test]
fn test_draft_state_serde() {
    assert_eq!(serde_json::to_value(DraftState::Pending).unwrap(), json!("pending"));
    assert_eq!(serde_json::to_value(DraftState::Canceled).unwrap(), json!("canceled"));
    let parsed: DraftState = serde_json::from_value(json!("sent")).unwrap();
    assert_eq!(parsed, DraftState::Sent);
}

#[test]
fn test_temp_id_is_transparent() {
    let id = TempId::from("tmp_abc");
    assert_eq!(serde_json::to_value(&id).unwrap(), json!("tmp_abc"));
    assert_eq!(id.to_string(), "tmp_abc");
}

#[test]
fn test_payload_message_type() {
    let text = DraftPayload::Text {
        content: "hi".to_string(),
    };
    assert_eq!(text.message_type(), MessageType::Text);
    assert_eq!(
        DraftPayload::File(FileMeta::default()).message_type(),
        MessageType::File
    );
    assert_eq!(
        DraftPayload::Voice(VoiceMeta::default()).message_type(),
        MessageType::Voice
    );
}

#[test]
fn test_apply_upload_fills_url_and_size() {
    let mut payload = DraftPayload::File(FileMeta {
        name: "report.pdf".to_string(),
        size: 10,
        mime_type: None,
        url: None,
    });
    payload.apply_upload(&UploadResult {
        url: "https://cdn/report.pdf".to_string(),
        size: Some(2048),
        mime_type: Some("application/pdf".to_string()),
    });
    match payload {
        DraftPayload::File(meta) => {
            assert_eq!(meta.url.as_deref(), Some("https://cdn/report.pdf"));
            assert_eq!(meta.size, 2048);
            assert_eq!(meta.mime_type.as_deref(), Some("application/pdf"));
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn test_apply_upload_keeps_size_when_missing() {
    let mut payload = DraftPayload::Voice(VoiceMeta {
        duration_ms: 3000,
        size: 512,
        mime_type: Some("audio/webm".to_string()),
        url: None,
    });
    payload.apply_upload(&UploadResult {
        url: "https://cdn/v.webm".to_string(),
        size: None,
        mime_type: None,
    });
    match payload {
        DraftPayload::Voice(meta) => {
            assert_eq!(meta.size, 512);
            assert_eq!(meta.mime_type.as_deref(), Some("audio/webm"));
            assert_eq!(meta.url.as_deref(), Some("https://cdn/v.webm"));
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn test_upload_size() {
    let upload = Upload::new("a.bin", None, vec![0u8; 7]);
    assert_eq!(upload.size(), 7);
    assert!(upload.mime_type.is_none());
}

#[test]
fn test_voice_meta_aliases() {
    let meta: VoiceMeta = serde_json::from_value(json!({"durationMs": 4200, "size": 9})).unwrap();
    assert_eq!(meta.duration_ms, 4200);
    let meta: VoiceMeta = serde_json::from_value(json!({"duration": 100})).unwrap();
    assert_eq!(meta.duration_ms, 100);
}

#[test]
fn test_outbound_payload_skips_empty_attachments() {
    let payload = OutboundPayload {
        conversation_id: "c1".to_string(),
        sender_type: "agent".to_string(),
        sender_id: "admin".to_string(),
        message_type: MessageType::Text,
        temp_id: TempId::from("tmp_1"),
        content: "hello".to_string(),
        files: vec![],
        voice: None,
    };
    let value = serde_json::to_value(&payload).unwrap();
    assert_eq!(value["message_type"], "text");
    assert_eq!(value["temp_id"], "tmp_1");
    assert!(value.get("files").is_none());
    assert!(value.get("voice").is_none());
}

#[test]
fn test_confirmed_message_timestamp_precedence() {
    let msg: ConfirmedMessage = serde_json::from_value(json!({
        "conversation_id": "c1",
        "sent_at": 2000,
        "created_at": 3000
    }))
    .unwrap();
    assert_eq!(msg.effective_timestamp(), 2000);

    let msg: ConfirmedMessage = serde_json::from_value(json!({
        "conversation_id": "c1",
        "timestamp": "1500",
        "sent_at": 2000
    }))
    .unwrap();
    assert_eq!(msg.effective_timestamp(), 1500);
}

#[test]
fn test_confirmed_message_without_timestamp() {
    let msg: ConfirmedMessage = serde_json::from_value(json!({"conversation_id": "c1"})).unwrap();
    assert_eq!(msg.effective_timestamp(), 0);
    assert!(msg.id.is_none());
    assert!(msg.temp_id.is_none());
}

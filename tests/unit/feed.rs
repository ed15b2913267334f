use send_channel::feed::parse_feed_frame;
use serde_json::json;

#[test]
fn test_domain_event_with_nested_message() {
    let frame = json!({
        "type": "domain.event.message_appended",
        "data": {
            "message": {
                "id": 981,
                "conversation_id": "c1",
                "temp_id": "tmp_abc",
                "content": "hello",
                "created_at": "2024-05-01T10:00:00Z"
            }
        }
    });
    let message = parse_feed_frame(&frame).unwrap();
    assert_eq!(message.id.as_deref(), Some("981"));
    assert_eq!(message.conversation_id, "c1");
    assert_eq!(message.temp_id.unwrap().as_str(), "tmp_abc");
    assert_eq!(message.content.as_deref(), Some("hello"));
}

#[test]
fn test_bare_message_payload() {
    let frame = json!({
        "type": "new_message",
        "data": {"id": "srv-2", "conversation_id": "c1", "content": "hi", "timestamp": 1000}
    });
    let message = parse_feed_frame(&frame).unwrap();
    assert_eq!(message.id.as_deref(), Some("srv-2"));
    assert_eq!(message.effective_timestamp(), 1000);
    assert!(message.temp_id.is_none());
}

#[test]
fn test_msg_type_key() {
    let frame = json!({
        "msg_type": "message",
        "data": {"conversation_id": "c1", "content": "x"}
    });
    assert!(parse_feed_frame(&frame).is_some());
}

#[test]
fn test_unrelated_frames_ignored() {
    assert!(parse_feed_frame(&json!({"type": "typing", "data": {}})).is_none());
    assert!(parse_feed_frame(&json!({"type": "message"})).is_none());
    assert!(parse_feed_frame(&json!({"type": "message", "data": "text"})).is_none());
    assert!(parse_feed_frame(&json!({"data": {"conversation_id": "c1"}})).is_none());
}

#[test]
fn test_message_with_file_attachment() {
    let frame = json!({
        "type": "message",
        "data": {
            "message": {
                "conversation_id": "c1",
                "files": [{"name": "a.pdf", "size": 10, "url": "https://cdn/a.pdf"}]
            }
        }
    });
    let message = parse_feed_frame(&frame).unwrap();
    assert_eq!(message.files.len(), 1);
    assert_eq!(message.files[0].name, "a.pdf");
}

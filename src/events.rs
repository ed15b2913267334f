use crate::types::{Draft, DraftError, DraftState, MessageType, TempId};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const SEND_QUEUED: &str = "send.queued";
pub const SEND_DISPATCH: &str = "send.dispatch";
pub const STATE_CHANGED: &str = "message.state_changed";
pub const SEND_FAILED: &str = "send.failed";
pub const SEND_FINALIZED: &str = "send.finalized";
pub const SEND_ACK_TIMEOUT: &str = "send.ack_timeout";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelEvent {
    pub event: String,
    pub payload: serde_json::Value,
}

impl ChannelEvent {
    pub fn queued(temp_id: &TempId, message_type: MessageType, conversation_id: &str) -> Self {
        Self {
            event: SEND_QUEUED.to_string(),
            payload: json!({
                "temp_id": temp_id,
                "message_type": message_type,
                "conversation_id": conversation_id,
            }),
        }
    }

    pub fn dispatch(temp_id: &TempId, attempt: u32) -> Self {
        Self {
            event: SEND_DISPATCH.to_string(),
            payload: json!({"temp_id": temp_id, "attempt": attempt}),
        }
    }

    pub fn state_changed(draft: &Draft) -> Self {
        Self::state(&draft.temp_id, draft.state, &draft.conversation_id)
    }

    pub fn state(temp_id: &TempId, state: DraftState, conversation_id: &str) -> Self {
        Self {
            event: STATE_CHANGED.to_string(),
            payload: json!({
                "temp_id": temp_id,
                "state": state,
                "conversation_id": conversation_id,
            }),
        }
    }

    pub fn failed(temp_id: &TempId, error: &DraftError) -> Self {
        Self {
            event: SEND_FAILED.to_string(),
            payload: json!({"temp_id": temp_id, "reason": error}),
        }
    }

    pub fn finalized(temp_id: &TempId, server_id: Option<&str>) -> Self {
        Self {
            event: SEND_FINALIZED.to_string(),
            payload: json!({"temp_id": temp_id, "server_id": server_id}),
        }
    }

    pub fn ack_timeout(temp_id: &TempId) -> Self {
        Self {
            event: SEND_ACK_TIMEOUT.to_string(),
            payload: json!({"temp_id": temp_id}),
        }
    }
}

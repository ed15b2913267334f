use bytes::Bytes;
use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::task::AbortHandle;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TempId(pub String);

impl TempId {
    pub fn generate() -> Self {
        Self(format!("tmp_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TempId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftState {
    Pending,
    Sending,
    Sent,
    Failed,
    Canceled,
}

impl DraftState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for DraftState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    File,
    Voice,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::File => "file",
            Self::Voice => "voice",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceMeta {
    #[serde(default, alias = "durationMs", alias = "duration")]
    pub duration_ms: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DraftPayload {
    Text { content: String },
    File(FileMeta),
    Voice(VoiceMeta),
}

impl DraftPayload {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Text { .. } => MessageType::Text,
            Self::File(_) => MessageType::File,
            Self::Voice(_) => MessageType::Voice,
        }
    }

    /// Text shown in the bubble and sent as `content` on the wire.
    pub fn display_content(&self) -> String {
        match self {
            Self::Text { content } => content.clone(),
            Self::File(meta) if !meta.name.is_empty() => meta.name.clone(),
            Self::File(_) => "File".to_string(),
            Self::Voice(_) => "Voice message".to_string(),
        }
    }

    pub fn apply_upload(&mut self, result: &UploadResult) {
        match self {
            Self::Text { .. } => {}
            Self::File(meta) => {
                meta.url = Some(result.url.clone());
                if let Some(size) = result.size {
                    meta.size = size;
                }
                if result.mime_type.is_some() {
                    meta.mime_type = result.mime_type.clone();
                }
            }
            Self::Voice(meta) => {
                meta.url = Some(result.url.clone());
                if let Some(size) = result.size {
                    meta.size = size;
                }
                if result.mime_type.is_some() {
                    meta.mime_type = result.mime_type.clone();
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftError {
    pub code: String,
    pub cause: String,
    pub message: String,
}

/// File or voice blob handed in by the UI, uploaded before transmission.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub mime_type: Option<String>,
    pub data: Bytes,
}

impl Upload {
    pub fn new(name: impl Into<String>, mime_type: Option<&str>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.map(|s| s.to_string()),
            data: data.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub url: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Draft {
    pub temp_id: TempId,
    pub conversation_id: String,
    pub message_type: MessageType,
    pub payload: DraftPayload,
    pub state: DraftState,
    pub attempt: u32,
    pub max_retries: u32,
    pub created_at: i64,
    pub last_attempt_at: Option<i64>,
    pub fingerprint: String,
    pub error: Option<DraftError>,
    pub server_id: Option<String>,
    pub(crate) upload: Option<Upload>,
    pub(crate) timer: Option<Arc<AbortHandle>>,
}

impl Draft {
    pub(crate) fn is_dispatchable(&self) -> bool {
        self.state == DraftState::Pending && self.timer.is_none()
    }

    pub(crate) fn clear_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// True while the draft still holds a blob that has not been uploaded.
    /// Cleared after the first successful upload so retries reuse the url.
    pub fn awaiting_upload(&self) -> bool {
        self.upload.is_some()
    }
}

/// Optimistic representation handed to the UI before confirmation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalEcho {
    pub id: Option<String>,
    pub temp_id: TempId,
    pub conversation_id: String,
    pub content: String,
    pub files: Vec<FileMeta>,
    pub voice: Option<VoiceMeta>,
    pub sender_type: String,
    pub timestamp: i64,
    pub status: String,
    pub message_type: MessageType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalPatch {
    pub state: DraftState,
    pub attempt: u32,
    pub error: Option<DraftError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_in_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
}

impl LocalPatch {
    pub(crate) fn of(draft: &Draft) -> Self {
        Self {
            state: draft.state,
            attempt: draft.attempt,
            error: draft.error.clone(),
            retry_in_ms: None,
            server_id: draft.server_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    pub temp_id: TempId,
    pub state: DraftState,
    pub attempt: u32,
    pub message_type: MessageType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub sending: usize,
    pub sent: usize,
    pub failed: usize,
    pub canceled: usize,
}

/// Wire request produced for the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundPayload {
    pub conversation_id: String,
    pub sender_type: String,
    pub sender_id: String,
    pub message_type: MessageType,
    pub temp_id: TempId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceMeta>,
}

/// Authoritative copy of a message as delivered by the live feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedMessage {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de_id")]
    pub conversation_id: String,
    #[serde(default)]
    pub temp_id: Option<TempId>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub files: Vec<FileMeta>,
    #[serde(default)]
    pub voice: Option<VoiceMeta>,
    #[serde(default, deserialize_with = "de_timestamp")]
    pub timestamp: Option<i64>,
    #[serde(default, deserialize_with = "de_timestamp", skip_serializing)]
    pub sent_at: Option<i64>,
    #[serde(default, deserialize_with = "de_timestamp", skip_serializing)]
    pub created_at: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ConfirmedMessage {
    pub fn effective_timestamp(&self) -> i64 {
        self.timestamp
            .or(self.sent_at)
            .or(self.created_at)
            .unwrap_or(0)
    }
}

fn value_to_id(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn de_opt_id<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(de)?;
    Ok(value.and_then(value_to_id))
}

fn de_id<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(de)?;
    Ok(value.and_then(value_to_id).unwrap_or_default())
}

fn de_timestamp<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(de)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(serde_json::Value::String(s)) => s
            .parse::<i64>()
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.timestamp_millis())),
        _ => None,
    })
}

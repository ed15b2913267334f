use crate::types::DraftState;
use thiserror::Error;

pub const RETRIES_EXCEEDED: &str = "RETRIES_EXCEEDED";
pub const ACK_TIMEOUT: &str = "ACK_TIMEOUT";

/// Why a single transmission attempt failed.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("upload failed: {0}")]
    Upload(#[source] anyhow::Error),
    #[error("transport rejected the message")]
    Rejected,
    #[error("transport not connected")]
    NotConnected,
    #[error("request timed out")]
    Timeout,
    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(#[source] anyhow::Error),
}

impl SendError {
    /// Classify the failure into a stable cause code for the UI.
    pub fn cause_code(&self) -> &'static str {
        match self {
            Self::Upload(_) => "UPLOAD_FAILED",
            Self::Rejected => "REJECTED",
            Self::NotConnected => "NOT_CONNECTED",
            Self::Timeout => "TIMEOUT",
            Self::Status { status: 429, .. } => "RATE_LIMIT",
            Self::Status { status, .. } if *status >= 500 => "SERVER_ERROR",
            Self::Status { status: 400 | 413 | 422, .. } => "PAYLOAD_INVALID",
            Self::Status { .. } => "UNKNOWN",
            Self::Transport(err) => classify_transport_error(err),
        }
    }
}

fn classify_transport_error(err: &anyhow::Error) -> &'static str {
    if let Some(inner) = err.downcast_ref::<SendError>() {
        return inner.cause_code();
    }
    if let Some(req) = err.downcast_ref::<reqwest::Error>() {
        if req.is_timeout() {
            return "TIMEOUT";
        }
        if req.is_connect() {
            return "NOT_CONNECTED";
        }
        if let Some(status) = req.status() {
            return SendError::Status {
                status: status.as_u16(),
                body: String::new(),
            }
            .cause_code();
        }
    }
    let raw = err.to_string().to_lowercase();
    if raw.contains("not connected") || raw.contains("closed") {
        "NOT_CONNECTED"
    } else if raw.contains("timeout") || raw.contains("timed out") {
        "TIMEOUT"
    } else if raw.contains("429") || raw.contains("rate limit") {
        "RATE_LIMIT"
    } else if raw.contains("payload") || raw.contains("invalid") {
        "PAYLOAD_INVALID"
    } else if raw.contains("server error") {
        "SERVER_ERROR"
    } else {
        "UNKNOWN"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal draft transition {from} -> {to}")]
pub struct TransitionError {
    pub from: DraftState,
    pub to: DraftState,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

use crate::collaborators::Transport;
use crate::config::TransportConfig;
use crate::error::SendError;
use crate::types::OutboundPayload;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Submits drafts to `POST {base_url}/api/conversations/{id}/messages`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    session_id: Option<String>,
}

impl HttpTransport {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: None,
            session_id: None,
        }
    }

    pub fn from_config(cfg: &TransportConfig) -> Result<Self> {
        let base_url = cfg
            .base_url
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("transport base_url missing"))?;
        let client = build_client(cfg.timeout_ms)?;
        let mut transport = Self::new(client, base_url.clone());
        transport.api_token = cfg.api_token.clone();
        transport.session_id = cfg.session_id.clone();
        Ok(transport)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn messages_url(&self, conversation_id: &str) -> String {
        format!(
            "{}/api/conversations/{}/messages",
            self.base_url, conversation_id
        )
    }
}

pub(crate) fn build_client(timeout_ms: Option<u64>) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(ms) = timeout_ms {
        builder = builder.timeout(Duration::from_millis(ms));
    }
    Ok(builder.build()?)
}

pub(crate) fn map_request_error(err: reqwest::Error) -> anyhow::Error {
    if err.is_timeout() {
        anyhow::Error::new(SendError::Timeout)
    } else if err.is_connect() {
        anyhow::Error::new(SendError::NotConnected)
    } else {
        anyhow::Error::new(err)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn submit(&self, payload: &OutboundPayload) -> Result<bool> {
        let url = self.messages_url(&payload.conversation_id);
        let mut req = self.client.post(&url).json(payload);
        if let Some(token) = self.api_token.as_ref() {
            req = req.bearer_auth(token);
        }
        if let Some(session) = self.session_id.as_ref() {
            req = req.header("X-Session-Id", session);
        }

        let resp = req.send().await.map_err(map_request_error)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow::Error::new(SendError::Status {
                status: status.as_u16(),
                body,
            }));
        }

        let value: Value = resp.json().await?;
        let accepted = value
            .get("success")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if !accepted {
            tracing::warn!(
                temp_id = %payload.temp_id,
                reason = value.get("message").and_then(|v| v.as_str()).unwrap_or_default(),
                "server declined message"
            );
        }
        Ok(accepted)
    }
}

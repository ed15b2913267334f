use crate::adapters::http::{build_client, map_request_error};
use crate::collaborators::Uploader;
use crate::config::TransportConfig;
use crate::types::{Upload, UploadResult};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

/// Multipart upload of file and voice blobs ahead of transmission.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: Client,
    upload_url: String,
    api_token: Option<String>,
}

impl HttpUploader {
    pub fn new(client: Client, upload_url: impl Into<String>) -> Self {
        Self {
            client,
            upload_url: upload_url.into(),
            api_token: None,
        }
    }

    pub fn from_config(cfg: &TransportConfig) -> Result<Self> {
        let upload_url = cfg
            .upload_url
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("transport upload_url missing"))?;
        let mut uploader = Self::new(build_client(cfg.timeout_ms)?, upload_url.clone());
        uploader.api_token = cfg.api_token.clone();
        Ok(uploader)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }
}

/// Accepts `{url, size?, mime_type?}` either at the top level or under `data`.
pub fn parse_upload_response(value: &Value) -> Option<UploadResult> {
    let body = value.get("data").filter(|v| v.is_object()).unwrap_or(value);
    let url = body
        .get("url")
        .or_else(|| body.get("file_url"))
        .and_then(|v| v.as_str())?;
    Some(UploadResult {
        url: url.to_string(),
        size: body.get("size").and_then(|v| v.as_u64()),
        mime_type: body
            .get("mime_type")
            .or_else(|| body.get("mimetype"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
    })
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, upload: &Upload) -> Result<UploadResult> {
        let mut part = reqwest::multipart::Part::bytes(upload.data.to_vec())
            .file_name(upload.name.clone());
        if let Some(mime) = upload.mime_type.as_deref() {
            part = part.mime_str(mime)?;
        }
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut req = self.client.post(&self.upload_url).multipart(form);
        if let Some(token) = self.api_token.as_ref() {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(map_request_error)?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("upload failed: {} {}", status, body));
        }
        let value: Value = resp.json().await?;
        parse_upload_response(&value)
            .ok_or_else(|| anyhow::anyhow!("upload response missing url: {}", value))
    }
}

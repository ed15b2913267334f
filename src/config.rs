use crate::backoff::{
    DEFAULT_ACK_TIMEOUT_MS, DEFAULT_BASE_DELAY_MS, DEFAULT_CAP_DELAY_MS, DEFAULT_MAX_RETRIES,
};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub retry: RetryConfig,
    pub sender: SenderConfig,
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub cap_delay_ms: u64,
    pub ack_timeout_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            cap_delay_ms: DEFAULT_CAP_DELAY_MS,
            ack_timeout_ms: Some(DEFAULT_ACK_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    pub sender_type: String,
    pub sender_id: String,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            sender_type: "agent".to_string(),
            sender_id: "admin".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub base_url: Option<String>,
    pub api_token: Option<String>,
    pub session_id: Option<String>,
    pub upload_url: Option<String>,
    pub timeout_ms: Option<u64>,
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn resolve_config_path() -> PathBuf {
    env::var("SEND_CHANNEL_CONFIG")
        .ok()
        .map(PathBuf::from)
        .unwrap_or_else(|| expand_tilde("~/.send-channel/send-channel.json"))
}

pub fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Defaults, then the config file if present, then environment overrides.
pub fn load_config() -> Result<Config, ConfigError> {
    let path = resolve_config_path();
    let mut cfg = if path.exists() {
        read_config_file(&path)?
    } else {
        Config::default()
    };
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub fn apply_env_overrides(cfg: &mut Config) {
    if let Some(url) = non_empty_env("SEND_CHANNEL_BASE_URL") {
        cfg.transport.base_url = Some(url);
    }
    if let Some(token) = non_empty_env("SEND_CHANNEL_TOKEN") {
        cfg.transport.api_token = Some(token);
    }
    if let Some(session) = non_empty_env("SEND_CHANNEL_SESSION_ID") {
        cfg.transport.session_id = Some(session);
    }
    if let Some(url) = non_empty_env("SEND_CHANNEL_UPLOAD_URL") {
        cfg.transport.upload_url = Some(url);
    }
    if let Some(sender_id) = non_empty_env("SEND_CHANNEL_SENDER_ID") {
        cfg.sender.sender_id = sender_id;
    }
    if let Some(sender_type) = non_empty_env("SEND_CHANNEL_SENDER_TYPE") {
        cfg.sender.sender_type = sender_type;
    }
}

use send_channel::config::{
    apply_env_overrides, expand_tilde, read_config_file, resolve_config_path, Config,
};
use send_channel::error::ConfigError;
use std::io::Write;

#[test]
fn test_default_config() {
    let cfg = Config::default();
    assert_eq!(cfg.retry.max_retries, 3);
    assert_eq!(cfg.retry.base_delay_ms, 800);
    assert_eq!(cfg.retry.cap_delay_ms, 10_000);
    assert_eq!(cfg.retry.ack_timeout_ms, Some(8_000));
    assert_eq!(cfg.sender.sender_type, "agent");
    assert_eq!(cfg.sender.sender_id, "admin");
    assert!(cfg.transport.base_url.is_none());
    assert!(cfg.transport.upload_url.is_none());
}

#[test]
fn test_expand_tilde() {
    let path = expand_tilde("~/.send-channel/send-channel.json");
    assert!(path.to_string_lossy().ends_with(".send-channel/send-channel.json"));
}

#[test]
fn test_expand_tilde_no_tilde() {
    let path = expand_tilde("relative/config.json");
    assert_eq!(path.to_string_lossy(), "relative/config.json");
}

#[test]
fn test_read_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "retry": {{"max_retries": 5, "ack_timeout_ms": 8000}},
            "transport": {{"base_url": "http://localhost:3030", "session_id": "s-1"}}
        }}"#
    )
    .unwrap();

    let cfg = read_config_file(file.path()).unwrap();
    assert_eq!(cfg.retry.max_retries, 5);
    assert_eq!(cfg.retry.base_delay_ms, 800);
    assert_eq!(cfg.retry.ack_timeout_ms, Some(8000));
    assert_eq!(cfg.transport.base_url.as_deref(), Some("http://localhost:3030"));
    assert_eq!(cfg.transport.session_id.as_deref(), Some("s-1"));
    assert_eq!(cfg.sender.sender_id, "admin");
}

#[test]
fn test_read_config_file_invalid_json() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    let err = read_config_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn test_read_config_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_config_file(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
    assert!(err.to_string().contains("absent.json"));
}

// Environment is process-wide; keep every env mutation in this one test.
#[test]
fn test_env_overrides_and_config_path() {
    std::env::remove_var("SEND_CHANNEL_CONFIG");
    assert!(resolve_config_path()
        .to_string_lossy()
        .ends_with("send-channel.json"));

    std::env::set_var("SEND_CHANNEL_CONFIG", "/tmp/custom-send-channel.json");
    assert_eq!(
        resolve_config_path().to_string_lossy(),
        "/tmp/custom-send-channel.json"
    );
    std::env::remove_var("SEND_CHANNEL_CONFIG");

    std::env::set_var("SEND_CHANNEL_BASE_URL", "http://api.local");
    std::env::set_var("SEND_CHANNEL_TOKEN", "secret");
    std::env::set_var("SEND_CHANNEL_SENDER_ID", "agent-7");
    std::env::set_var("SEND_CHANNEL_SENDER_TYPE", "   ");

    let mut cfg = Config::default();
    apply_env_overrides(&mut cfg);
    assert_eq!(cfg.transport.base_url.as_deref(), Some("http://api.local"));
    assert_eq!(cfg.transport.api_token.as_deref(), Some("secret"));
    assert_eq!(cfg.sender.sender_id, "agent-7");
    assert_eq!(cfg.sender.sender_type, "agent");

    for key in [
        "SEND_CHANNEL_BASE_URL",
        "SEND_CHANNEL_TOKEN",
        "SEND_CHANNEL_SENDER_ID",
        "SEND_CHANNEL_SENDER_TYPE",
    ] {
        std::env::remove_var(key);
    }
}

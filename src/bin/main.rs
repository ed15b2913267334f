use send_channel::config::load_config;
use send_channel::events::{SEND_FAILED, SEND_FINALIZED};
use send_channel::{build_http_channel, feed};
use std::env;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let conversation_id = env::args()
        .nth(1)
        .or_else(|| env::var("SEND_CHANNEL_CONVERSATION_ID").ok())
        .ok_or_else(|| anyhow::anyhow!("usage: send-channel <conversation-id>"))?;

    let config = load_config()?;
    let channel = build_http_channel(&config, &conversation_id)?;

    let mut events = channel.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) if event.event == SEND_FAILED => {
                    error!(payload = %event.payload, "{}", event.event)
                }
                Ok(event) if event.event == SEND_FINALIZED => {
                    info!(payload = %event.payload, "{}", event.event)
                }
                Ok(event) => info!(payload = %event.payload, "{}", event.event),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event stream lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    // JSON lines are live-feed frames; anything else is message text.
                    Some(line) if line.trim_start().starts_with('{') => {
                        match serde_json::from_str::<serde_json::Value>(&line) {
                            Ok(frame) => {
                                if !feed::handle_frame(&channel, &frame) {
                                    warn!("frame carried no message");
                                }
                            }
                            Err(err) => warn!(error = %err, "invalid frame"),
                        }
                    }
                    Some(line) => {
                        if let Some(temp_id) = channel.send_text(&line) {
                            info!(%temp_id, "queued");
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    let stats = channel.queue_stats();
    info!(
        pending = stats.pending,
        sending = stats.sending,
        failed = stats.failed,
        "shutting down"
    );
    Ok(())
}

//! Turns live-feed frames into confirmations for the channel.

use crate::channel::SendChannel;
use crate::types::ConfirmedMessage;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace};

const MESSAGE_FRAME_TYPES: &[&str] = &["domain.event.message_appended", "message", "new_message"];

fn frame_type(frame: &Value) -> Option<&str> {
    frame
        .get("type")
        .or_else(|| frame.get("msg_type"))
        .and_then(|v| v.as_str())
}

/// Extracts the confirmed message carried by a feed frame, if any.
///
/// The message sits either at `data.message` or directly in `data`.
pub fn parse_feed_frame(frame: &Value) -> Option<ConfirmedMessage> {
    let kind = frame_type(frame)?;
    if !MESSAGE_FRAME_TYPES.contains(&kind) {
        return None;
    }
    let data = frame.get("data")?;
    let body = match data.get("message") {
        Some(inner) if inner.is_object() => inner,
        _ => data,
    };
    if !body.is_object() {
        return None;
    }
    match serde_json::from_value::<ConfirmedMessage>(body.clone()) {
        Ok(message) => Some(message),
        Err(err) => {
            debug!(frame_type = kind, error = %err, "unreadable message frame");
            None
        }
    }
}

/// Feeds one frame to the channel. Returns true when it carried a message.
pub fn handle_frame(channel: &SendChannel, frame: &Value) -> bool {
    match parse_feed_frame(frame) {
        Some(message) => {
            channel.mark_server_message(message);
            true
        }
        None => {
            trace!(frame_type = ?frame_type(frame), "frame skipped");
            false
        }
    }
}

/// Drains `rx` until every sender is dropped.
pub async fn pump_confirmations(channel: SendChannel, mut rx: mpsc::Receiver<Value>) {
    while let Some(frame) = rx.recv().await {
        handle_frame(&channel, &frame);
    }
    debug!("confirmation feed closed");
}

pub async fn pump_stream<S>(channel: SendChannel, mut frames: S)
where
    S: Stream<Item = Value> + Unpin,
{
    while let Some(frame) = frames.next().await {
        handle_frame(&channel, &frame);
    }
    debug!("confirmation stream ended");
}

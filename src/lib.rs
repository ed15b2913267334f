pub mod adapters;
pub mod backoff;
pub mod channel;
pub mod collaborators;
pub mod config;
pub mod draft;
pub mod error;
pub mod events;
pub mod feed;
pub mod reconcile;
pub mod state;
pub mod types;

pub use channel::SendChannel;
pub use collaborators::{
    ChannelObserver, Clock, Collaborators, ConversationResolver, FixedConversation, Transport,
    Uploader,
};
pub use config::Config;
pub use error::SendError;
pub use events::ChannelEvent;
pub use types::{ConfirmedMessage, Draft, DraftState, MessageType, TempId, Upload};

use crate::adapters::http::HttpTransport;
use crate::adapters::upload::HttpUploader;
use tracing::info;

/// Wires the HTTP adapters from `config` into a channel bound to one
/// conversation. The uploader is only installed when `upload_url` is set.
pub fn build_http_channel(config: &Config, conversation_id: &str) -> anyhow::Result<SendChannel> {
    let transport = HttpTransport::from_config(&config.transport)?;
    let mut collab = Collaborators::default()
        .with_transport(transport)
        .with_resolver(FixedConversation(conversation_id.to_string()));
    if config.transport.upload_url.is_some() {
        collab = collab.with_uploader(HttpUploader::from_config(&config.transport)?);
    }
    info!(
        conversation_id,
        max_retries = config.retry.max_retries,
        "send channel ready"
    );
    Ok(SendChannel::new(config, collab))
}

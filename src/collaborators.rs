use crate::draft::{DefaultFingerprinter, Fingerprinter};
use crate::types::{
    ConfirmedMessage, LocalEcho, LocalPatch, OutboundPayload, TempId, Upload, UploadResult,
};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one submission. Never retries.
    async fn submit(&self, payload: &OutboundPayload) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, upload: &Upload) -> anyhow::Result<UploadResult>;
}

pub trait ConversationResolver: Send + Sync {
    fn resolve(&self) -> Option<String>;
}

impl<F> ConversationResolver for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn resolve(&self) -> Option<String> {
        self()
    }
}

pub trait ChannelObserver: Send + Sync {
    fn on_local_enqueue(&self, _echo: &LocalEcho) {}
    fn on_local_patch(&self, _temp_id: &TempId, _patch: &LocalPatch) {}
    fn on_finalized(&self, _temp_id: &TempId, _message: &ConfirmedMessage) {}
}

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

impl<F> Clock for F
where
    F: Fn() -> i64 + Send + Sync,
{
    fn now_millis(&self) -> i64 {
        self()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

pub struct DisconnectedTransport;

#[async_trait]
impl Transport for DisconnectedTransport {
    async fn submit(&self, _payload: &OutboundPayload) -> anyhow::Result<bool> {
        Err(anyhow::Error::new(crate::error::SendError::NotConnected))
    }
}

pub struct MissingUploader;

#[async_trait]
impl Uploader for MissingUploader {
    async fn upload(&self, _upload: &Upload) -> anyhow::Result<UploadResult> {
        Err(anyhow::anyhow!("no uploader configured"))
    }
}

pub struct NoConversation;

impl ConversationResolver for NoConversation {
    fn resolve(&self) -> Option<String> {
        None
    }
}

pub struct FixedConversation(pub String);

impl ConversationResolver for FixedConversation {
    fn resolve(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

pub struct NoopObserver;

impl ChannelObserver for NoopObserver {}

#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn Transport>,
    pub uploader: Arc<dyn Uploader>,
    pub resolver: Arc<dyn ConversationResolver>,
    pub observer: Arc<dyn ChannelObserver>,
    pub fingerprinter: Arc<dyn Fingerprinter>,
    pub clock: Arc<dyn Clock>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            transport: Arc::new(DisconnectedTransport),
            uploader: Arc::new(MissingUploader),
            resolver: Arc::new(NoConversation),
            observer: Arc::new(NoopObserver),
            fingerprinter: Arc::new(DefaultFingerprinter),
            clock: Arc::new(SystemClock),
        }
    }
}

impl Collaborators {
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn with_uploader(mut self, uploader: impl Uploader + 'static) -> Self {
        self.uploader = Arc::new(uploader);
        self
    }

    pub fn with_resolver(mut self, resolver: impl ConversationResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ChannelObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_fingerprinter(mut self, fingerprinter: impl Fingerprinter + 'static) -> Self {
        self.fingerprinter = Arc::new(fingerprinter);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}

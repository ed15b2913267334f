//! Outbound queue, single-flight scheduler and reconciliation entry point.
//!
//! All queue mutation happens synchronously under one lock. The lock is
//! never held across an await, and observer callbacks run after it is
//! released so they may call back into the channel.

use crate::backoff::{RetryDecision, RetryPolicy};
use crate::collaborators::Collaborators;
use crate::config::{Config, SenderConfig};
use crate::draft::{self, build_draft, local_echo, outbound_payload};
use crate::error::{SendError, ACK_TIMEOUT, RETRIES_EXCEEDED};
use crate::events::ChannelEvent;
use crate::reconcile::{find_match, MatchOutcome};
use crate::state::apply_transition;
use crate::types::{
    ConfirmedMessage, Draft, DraftError, DraftPayload, DraftState, LocalEcho, LocalPatch,
    OutboundPayload, QueueEntry, QueueStats, TempId, Upload, UploadResult,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::AbortHandle;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

const EVENT_CAPACITY: usize = 100;

enum Notice {
    Enqueued(LocalEcho),
    Patch(TempId, LocalPatch),
    Finalized(TempId, ConfirmedMessage),
    Event(ChannelEvent),
}

#[derive(Default)]
struct QueueState {
    drafts: Vec<Draft>,
    dispatching: bool,
}

impl QueueState {
    fn find_mut(&mut self, temp_id: &TempId) -> Option<&mut Draft> {
        self.drafts.iter_mut().find(|d| &d.temp_id == temp_id)
    }

    fn slot_busy(&self) -> bool {
        self.dispatching || self.drafts.iter().any(|d| d.state == DraftState::Sending)
    }
}

struct Job {
    temp_id: TempId,
    payload: OutboundPayload,
    upload: Option<Upload>,
}

struct Inner {
    policy: RetryPolicy,
    sender: SenderConfig,
    ack_timeout: Option<Duration>,
    collab: Collaborators,
    queue: Mutex<QueueState>,
    events: broadcast::Sender<ChannelEvent>,
}

/// Cheap to clone; every clone drives the same queue.
#[derive(Clone)]
pub struct SendChannel {
    inner: Arc<Inner>,
}

impl SendChannel {
    pub fn new(config: &Config, collab: Collaborators) -> Self {
        Self::with_policy(
            RetryPolicy::from(&config.retry),
            config.sender.clone(),
            config.retry.ack_timeout_ms.map(Duration::from_millis),
            collab,
        )
    }

    pub fn with_policy(
        policy: RetryPolicy,
        sender: SenderConfig,
        ack_timeout: Option<Duration>,
        collab: Collaborators,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                policy,
                sender,
                ack_timeout,
                collab,
                queue: Mutex::new(QueueState::default()),
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.inner.events.subscribe()
    }

    pub fn send_text(&self, content: &str) -> Option<TempId> {
        let conversation_id = self.resolve_conversation()?;
        let Some(payload) = draft::text_payload(content) else {
            debug!("send_text ignored: empty content");
            return None;
        };
        let temp_id = self.enqueue(conversation_id, payload, None);
        self.schedule_soon();
        Some(temp_id)
    }

    pub async fn send_file(&self, file: Upload) -> Option<TempId> {
        let conversation_id = self.resolve_conversation()?;
        if file.data.is_empty() {
            debug!("send_file ignored: empty file");
            return None;
        }
        let payload = draft::file_payload(&file);
        let temp_id = self.enqueue(conversation_id, payload, Some(file));
        self.schedule_soon();
        Some(temp_id)
    }

    pub async fn send_voice(&self, blob: Upload, duration_ms: u64) -> Option<TempId> {
        let conversation_id = self.resolve_conversation()?;
        if blob.data.is_empty() {
            debug!("send_voice ignored: empty recording");
            return None;
        }
        let payload = draft::voice_payload(&blob, duration_ms);
        let temp_id = self.enqueue(conversation_id, payload, Some(blob));
        self.schedule_soon();
        Some(temp_id)
    }

    /// Reopens a failed or canceled draft.
    pub fn retry(&self, temp_id: &TempId) -> bool {
        self.reopen(temp_id, &[DraftState::Failed, DraftState::Canceled])
    }

    pub fn resend_failed(&self, temp_id: &TempId) -> bool {
        self.reopen(temp_id, &[DraftState::Failed])
    }

    /// Marks a pending or sending draft canceled. An in-flight request is
    /// not recalled; its outcome is dropped when it arrives.
    pub fn cancel(&self, temp_id: &TempId) -> bool {
        let mut notices = Vec::new();
        {
            let mut queue = self.inner.queue.lock();
            let Some(draft) = queue.find_mut(temp_id) else {
                return false;
            };
            if !matches!(draft.state, DraftState::Pending | DraftState::Sending) {
                return false;
            }
            draft.clear_timer();
            if !record_transition(draft, DraftState::Canceled, &mut notices) {
                return false;
            }
            notices.push(Notice::Patch(temp_id.clone(), LocalPatch::of(draft)));
        }
        info!(%temp_id, "draft canceled");
        self.emit(notices);
        self.schedule();
        true
    }

    pub fn mark_server_message(&self, message: ConfirmedMessage) {
        if message.conversation_id.is_empty() {
            debug!("confirmed message without conversation id ignored");
            return;
        }
        let mut notices = Vec::new();
        {
            let mut queue = self.inner.queue.lock();
            let outcome = find_match(&queue.drafts, &message, &*self.inner.collab.fingerprinter);
            match outcome {
                MatchOutcome::NoMatch => {
                    trace!(server_id = ?message.id, "confirmed message matches no draft");
                    return;
                }
                MatchOutcome::AlreadySent { index } => {
                    debug!(temp_id = %queue.drafts[index].temp_id, "draft already finalized");
                    return;
                }
                MatchOutcome::Discard { index, kind } => {
                    debug!(
                        temp_id = %queue.drafts[index].temp_id,
                        ?kind,
                        "confirmation for canceled draft discarded"
                    );
                    return;
                }
                MatchOutcome::Finalize { index, kind } => {
                    let draft = &mut queue.drafts[index];
                    draft.clear_timer();
                    for &step in finalize_path(draft.state) {
                        if !record_transition(draft, step, &mut notices) {
                            return;
                        }
                    }
                    draft.error = None;
                    draft.server_id = message.id.clone();
                    info!(
                        temp_id = %draft.temp_id,
                        server_id = ?draft.server_id,
                        ?kind,
                        "draft reconciled"
                    );
                    let temp_id = draft.temp_id.clone();
                    notices.push(Notice::Patch(temp_id.clone(), LocalPatch::of(draft)));
                    notices.push(Notice::Event(ChannelEvent::finalized(
                        &temp_id,
                        draft.server_id.as_deref(),
                    )));
                    notices.push(Notice::Finalized(temp_id, message));
                }
            }
        }
        self.emit(notices);
        self.schedule();
    }

    pub fn queue_snapshot(&self) -> Vec<QueueEntry> {
        self.inner
            .queue
            .lock()
            .drafts
            .iter()
            .map(|d| QueueEntry {
                temp_id: d.temp_id.clone(),
                state: d.state,
                attempt: d.attempt,
                message_type: d.message_type,
            })
            .collect()
    }

    pub fn draft(&self, temp_id: &TempId) -> Option<Draft> {
        self.inner
            .queue
            .lock()
            .drafts
            .iter()
            .find(|d| &d.temp_id == temp_id)
            .cloned()
    }

    pub fn queue_stats(&self) -> QueueStats {
        let queue = self.inner.queue.lock();
        let mut stats = QueueStats {
            total: queue.drafts.len(),
            ..QueueStats::default()
        };
        for draft in &queue.drafts {
            match draft.state {
                DraftState::Pending => stats.pending += 1,
                DraftState::Sending => stats.sending += 1,
                DraftState::Sent => stats.sent += 1,
                DraftState::Failed => stats.failed += 1,
                DraftState::Canceled => stats.canceled += 1,
            }
        }
        stats
    }

    /// Drops finalized drafts. Returns how many were removed.
    pub fn prune_sent(&self) -> usize {
        let mut queue = self.inner.queue.lock();
        let before = queue.drafts.len();
        queue.drafts.retain(|d| d.state != DraftState::Sent);
        before - queue.drafts.len()
    }

    fn resolve_conversation(&self) -> Option<String> {
        let resolved = self
            .inner
            .collab
            .resolver
            .resolve()
            .filter(|id| !id.trim().is_empty());
        if resolved.is_none() {
            debug!("send ignored: no active conversation");
        }
        resolved
    }

    fn enqueue(
        &self,
        conversation_id: String,
        payload: DraftPayload,
        upload: Option<Upload>,
    ) -> TempId {
        let created_at = self.inner.collab.clock.now_millis();
        let draft = build_draft(
            &*self.inner.collab.fingerprinter,
            conversation_id,
            payload,
            upload,
            self.inner.policy.max_retries,
            created_at,
        );
        let temp_id = draft.temp_id.clone();
        let notices = vec![
            Notice::Enqueued(local_echo(&draft, &self.inner.sender)),
            Notice::Event(ChannelEvent::queued(
                &temp_id,
                draft.message_type,
                &draft.conversation_id,
            )),
        ];
        debug!(%temp_id, message_type = %draft.message_type, "draft enqueued");
        self.inner.queue.lock().drafts.push(draft);
        self.emit(notices);
        temp_id
    }

    fn reopen(&self, temp_id: &TempId, from: &[DraftState]) -> bool {
        let mut notices = Vec::new();
        {
            let mut queue = self.inner.queue.lock();
            let Some(draft) = queue.find_mut(temp_id) else {
                return false;
            };
            if !from.contains(&draft.state) {
                return false;
            }
            draft.clear_timer();
            if !record_transition(draft, DraftState::Pending, &mut notices) {
                return false;
            }
            draft.error = None;
            notices.push(Notice::Patch(temp_id.clone(), LocalPatch::of(draft)));
        }
        info!(%temp_id, "draft requeued by caller");
        self.emit(notices);
        self.schedule_soon();
        true
    }

    fn schedule_soon(&self) {
        let channel = self.clone();
        tokio::spawn(async move { channel.schedule() });
    }

    /// Dispatches the first ready pending draft unless the slot is taken.
    fn schedule(&self) {
        let now = self.inner.collab.clock.now_millis();
        let mut notices = Vec::new();
        let job = {
            let mut queue = self.inner.queue.lock();
            if queue.slot_busy() {
                return;
            }
            let Some(draft) = queue.drafts.iter_mut().find(|d| d.is_dispatchable()) else {
                return;
            };
            if !record_transition(draft, DraftState::Sending, &mut notices) {
                return;
            }
            draft.attempt += 1;
            draft.last_attempt_at = Some(now);
            notices.push(Notice::Patch(draft.temp_id.clone(), LocalPatch::of(draft)));
            notices.push(Notice::Event(ChannelEvent::dispatch(
                &draft.temp_id,
                draft.attempt,
            )));
            debug!(temp_id = %draft.temp_id, attempt = draft.attempt, "dispatching draft");
            let job = Job {
                temp_id: draft.temp_id.clone(),
                payload: outbound_payload(draft, &self.inner.sender),
                upload: draft.upload.clone(),
            };
            queue.dispatching = true;
            job
        };
        self.emit(notices);
        tokio::spawn(self.clone().process(job));
    }

    async fn process(self, job: Job) {
        let outcome = self.attempt(&job).await;
        self.complete(&job.temp_id, outcome);
        self.schedule();
    }

    async fn attempt(&self, job: &Job) -> Result<(), SendError> {
        let mut payload = job.payload.clone();
        if let Some(upload) = job.upload.as_ref() {
            let result = self
                .inner
                .collab
                .uploader
                .upload(upload)
                .await
                .map_err(SendError::Upload)?;
            match self.record_upload(&job.temp_id, &result) {
                Some(updated) => payload = updated,
                // canceled while uploading
                None => return Ok(()),
            }
        }
        match self.inner.collab.transport.submit(&payload).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(SendError::Rejected),
            Err(err) => Err(err.downcast::<SendError>().unwrap_or_else(SendError::Transport)),
        }
    }

    fn record_upload(
        &self,
        temp_id: &TempId,
        result: &UploadResult,
    ) -> Option<OutboundPayload> {
        let mut queue = self.inner.queue.lock();
        let draft = queue.find_mut(temp_id)?;
        draft.payload.apply_upload(result);
        draft.upload = None;
        if draft.state != DraftState::Sending {
            return None;
        }
        Some(outbound_payload(draft, &self.inner.sender))
    }

    fn complete(&self, temp_id: &TempId, outcome: Result<(), SendError>) {
        let mut notices = Vec::new();
        {
            let mut queue = self.inner.queue.lock();
            queue.dispatching = false;
            let Some(draft) = queue.find_mut(temp_id) else {
                return;
            };
            if draft.state != DraftState::Sending {
                debug!(%temp_id, state = %draft.state, "stale outcome dropped");
                return;
            }
            match outcome {
                Ok(()) => {
                    debug!(%temp_id, "submitted; awaiting confirmation");
                    if let Some(timeout) = self.inner.ack_timeout {
                        draft.timer = Some(self.spawn_ack_timer(temp_id.clone(), timeout));
                    }
                }
                Err(err) => self.handle_failure(draft, err, &mut notices),
            }
        }
        self.emit(notices);
    }

    fn handle_failure(&self, draft: &mut Draft, err: SendError, notices: &mut Vec<Notice>) {
        match self.inner.policy.decide(draft.attempt, draft.max_retries) {
            RetryDecision::Requeue(delay) => {
                warn!(
                    temp_id = %draft.temp_id,
                    attempt = draft.attempt,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %err,
                    "send attempt failed"
                );
                if !record_transition(draft, DraftState::Pending, notices) {
                    return;
                }
                draft.timer = Some(self.spawn_retry_timer(draft.temp_id.clone(), delay));
                let mut patch = LocalPatch::of(draft);
                patch.retry_in_ms = Some(delay.as_millis() as u64);
                notices.push(Notice::Patch(draft.temp_id.clone(), patch));
            }
            RetryDecision::Fail => {
                warn!(
                    temp_id = %draft.temp_id,
                    attempt = draft.attempt,
                    error = %err,
                    "send failed; retries exhausted"
                );
                let error = DraftError {
                    code: RETRIES_EXCEEDED.to_string(),
                    cause: err.cause_code().to_string(),
                    message: err.to_string(),
                };
                self.fail(draft, error, notices);
            }
        }
    }

    fn fail(&self, draft: &mut Draft, error: DraftError, notices: &mut Vec<Notice>) {
        if !record_transition(draft, DraftState::Failed, notices) {
            return;
        }
        notices.push(Notice::Event(ChannelEvent::failed(&draft.temp_id, &error)));
        draft.error = Some(error);
        notices.push(Notice::Patch(draft.temp_id.clone(), LocalPatch::of(draft)));
    }

    fn spawn_retry_timer(&self, temp_id: TempId, delay: Duration) -> Arc<AbortHandle> {
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            if let Some(channel) = upgrade(&weak) {
                channel.release_backoff(&temp_id);
            }
        });
        Arc::new(handle.abort_handle())
    }

    fn release_backoff(&self, temp_id: &TempId) {
        {
            let mut queue = self.inner.queue.lock();
            if let Some(draft) = queue.find_mut(temp_id) {
                if draft.state == DraftState::Pending {
                    draft.timer = None;
                }
            }
        }
        trace!(%temp_id, "backoff elapsed");
        self.schedule();
    }

    fn spawn_ack_timer(&self, temp_id: TempId, timeout: Duration) -> Arc<AbortHandle> {
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            sleep(timeout).await;
            if let Some(channel) = upgrade(&weak) {
                channel.expire_ack(&temp_id);
            }
        });
        Arc::new(handle.abort_handle())
    }

    fn expire_ack(&self, temp_id: &TempId) {
        let mut notices = Vec::new();
        {
            let mut queue = self.inner.queue.lock();
            let Some(draft) = queue.find_mut(temp_id) else {
                return;
            };
            if draft.state != DraftState::Sending {
                return;
            }
            draft.timer = None;
            warn!(%temp_id, "server did not confirm in time");
            let error = DraftError {
                code: ACK_TIMEOUT.to_string(),
                cause: "TIMEOUT".to_string(),
                message: "server did not confirm the message in time".to_string(),
            };
            notices.push(Notice::Event(ChannelEvent::ack_timeout(temp_id)));
            self.fail(draft, error, &mut notices);
        }
        self.emit(notices);
        self.schedule();
    }

    fn emit(&self, notices: Vec<Notice>) {
        let observer = &self.inner.collab.observer;
        for notice in notices {
            match notice {
                Notice::Enqueued(echo) => observer.on_local_enqueue(&echo),
                Notice::Patch(temp_id, patch) => observer.on_local_patch(&temp_id, &patch),
                Notice::Finalized(temp_id, message) => observer.on_finalized(&temp_id, &message),
                Notice::Event(event) => {
                    let _ = self.inner.events.send(event);
                }
            }
        }
    }
}

fn upgrade(weak: &Weak<Inner>) -> Option<SendChannel> {
    weak.upgrade().map(|inner| SendChannel { inner })
}

/// Legal edges from `from` to Sent. A confirmation can overtake a failed
/// attempt, so backing-off and failed drafts finalize too.
fn finalize_path(from: DraftState) -> &'static [DraftState] {
    match from {
        DraftState::Sending => &[DraftState::Sent],
        DraftState::Pending => &[DraftState::Sending, DraftState::Sent],
        DraftState::Failed => &[DraftState::Pending, DraftState::Sending, DraftState::Sent],
        DraftState::Sent | DraftState::Canceled => &[],
    }
}

fn record_transition(draft: &mut Draft, to: DraftState, notices: &mut Vec<Notice>) -> bool {
    match apply_transition(draft, to) {
        Ok(()) => {
            notices.push(Notice::Event(ChannelEvent::state_changed(draft)));
            true
        }
        Err(err) => {
            warn!(temp_id = %draft.temp_id, error = %err, "transition rejected");
            false
        }
    }
}

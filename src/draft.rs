//! Draft construction, fingerprints and the UI/wire views of a draft.

use crate::config::SenderConfig;
use crate::types::{
    ConfirmedMessage, Draft, DraftPayload, DraftState, FileMeta, LocalEcho, OutboundPayload,
    TempId, Upload, VoiceMeta,
};

const TEXT_PREFIX_CHARS: usize = 32;
const FILE_NAME_PREFIX_CHARS: usize = 24;

pub trait Fingerprinter: Send + Sync {
    fn draft_fingerprint(&self, draft: &Draft) -> String;
    fn confirmed_fingerprint(&self, message: &ConfirmedMessage) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFingerprinter;

impl Fingerprinter for DefaultFingerprinter {
    fn draft_fingerprint(&self, draft: &Draft) -> String {
        match &draft.payload {
            DraftPayload::Text { content } => {
                text_fingerprint(&draft.conversation_id, content, draft.created_at)
            }
            DraftPayload::File(meta) => {
                file_fingerprint(&draft.conversation_id, &meta.name, meta.size, draft.created_at)
            }
            DraftPayload::Voice(meta) => voice_fingerprint(
                &draft.conversation_id,
                meta.duration_ms,
                meta.size,
                draft.created_at,
            ),
        }
    }

    fn confirmed_fingerprint(&self, message: &ConfirmedMessage) -> String {
        let ts = message.effective_timestamp();
        if let Some(file) = message.files.first() {
            return file_fingerprint(&message.conversation_id, &file.name, file.size, ts);
        }
        if let Some(voice) = message.voice.as_ref() {
            return voice_fingerprint(&message.conversation_id, voice.duration_ms, voice.size, ts);
        }
        text_fingerprint(
            &message.conversation_id,
            message.content.as_deref().unwrap_or_default(),
            ts,
        )
    }
}

fn prefix(value: &str, chars: usize) -> &str {
    match value.char_indices().nth(chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

pub fn text_fingerprint(conversation_id: &str, content: &str, ts: i64) -> String {
    format!(
        "{}|text|{}|{}",
        conversation_id,
        prefix(content, TEXT_PREFIX_CHARS),
        ts
    )
}

pub fn file_fingerprint(conversation_id: &str, name: &str, size: u64, ts: i64) -> String {
    format!(
        "{}|file|{}|{}|{}",
        conversation_id,
        prefix(name, FILE_NAME_PREFIX_CHARS),
        size,
        ts
    )
}

pub fn voice_fingerprint(conversation_id: &str, duration_ms: u64, size: u64, ts: i64) -> String {
    format!("{}|voice|{}|{}|{}", conversation_id, duration_ms, size, ts)
}

pub fn text_payload(content: &str) -> Option<DraftPayload> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(DraftPayload::Text {
        content: trimmed.to_string(),
    })
}

pub fn file_payload(upload: &Upload) -> DraftPayload {
    DraftPayload::File(FileMeta {
        name: upload.name.clone(),
        size: upload.size(),
        mime_type: upload.mime_type.clone(),
        url: None,
    })
}

pub fn voice_payload(upload: &Upload, duration_ms: u64) -> DraftPayload {
    DraftPayload::Voice(VoiceMeta {
        duration_ms,
        size: upload.size(),
        mime_type: upload.mime_type.clone(),
        url: None,
    })
}

pub fn build_draft(
    fingerprinter: &dyn Fingerprinter,
    conversation_id: String,
    payload: DraftPayload,
    upload: Option<Upload>,
    max_retries: u32,
    created_at: i64,
) -> Draft {
    let mut draft = Draft {
        temp_id: TempId::generate(),
        conversation_id,
        message_type: payload.message_type(),
        payload,
        state: DraftState::Pending,
        attempt: 0,
        max_retries,
        created_at,
        last_attempt_at: None,
        fingerprint: String::new(),
        error: None,
        server_id: None,
        upload,
        timer: None,
    };
    draft.fingerprint = fingerprinter.draft_fingerprint(&draft);
    draft
}

fn attachments(payload: &DraftPayload) -> (Vec<FileMeta>, Option<VoiceMeta>) {
    match payload {
        DraftPayload::Text { .. } => (Vec::new(), None),
        DraftPayload::File(meta) => (vec![meta.clone()], None),
        DraftPayload::Voice(meta) => (Vec::new(), Some(meta.clone())),
    }
}

pub fn local_echo(draft: &Draft, sender: &SenderConfig) -> LocalEcho {
    let (files, voice) = attachments(&draft.payload);
    LocalEcho {
        id: draft.server_id.clone(),
        temp_id: draft.temp_id.clone(),
        conversation_id: draft.conversation_id.clone(),
        content: draft.payload.display_content(),
        files,
        voice,
        sender_type: sender.sender_type.clone(),
        timestamp: draft.created_at,
        status: draft.state.as_str().to_string(),
        message_type: draft.message_type,
    }
}

pub fn outbound_payload(draft: &Draft, sender: &SenderConfig) -> OutboundPayload {
    let (files, voice) = attachments(&draft.payload);
    OutboundPayload {
        conversation_id: draft.conversation_id.clone(),
        sender_type: sender.sender_type.clone(),
        sender_id: sender.sender_id.clone(),
        message_type: draft.message_type,
        temp_id: draft.temp_id.clone(),
        content: draft.payload.display_content(),
        files,
        voice,
    }
}

use crate::draft::Fingerprinter;
use crate::types::{ConfirmedMessage, Draft, DraftState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    TempId,
    Fingerprint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Draft at this queue index should be finalized.
    Finalize { index: usize, kind: MatchKind },
    /// Draft was already finalized; nothing to do.
    AlreadySent { index: usize },
    /// Draft was canceled; the confirmation is dropped.
    Discard { index: usize, kind: MatchKind },
    /// Message belongs to someone else.
    NoMatch,
}

/// Exact temp id first, then the first non-sent draft with an equal
/// fingerprint in queue order. Identical content created in the same
/// millisecond resolves to the earliest draft.
pub fn find_match(
    drafts: &[Draft],
    message: &ConfirmedMessage,
    fingerprinter: &dyn Fingerprinter,
) -> MatchOutcome {
    if let Some(temp_id) = message.temp_id.as_ref() {
        if let Some(index) = drafts.iter().position(|d| &d.temp_id == temp_id) {
            return classify(&drafts[index], index, MatchKind::TempId);
        }
    }

    let fingerprint = fingerprinter.confirmed_fingerprint(message);
    match drafts
        .iter()
        .position(|d| d.state != DraftState::Sent && d.fingerprint == fingerprint)
    {
        Some(index) => classify(&drafts[index], index, MatchKind::Fingerprint),
        None => MatchOutcome::NoMatch,
    }
}

fn classify(draft: &Draft, index: usize, kind: MatchKind) -> MatchOutcome {
    match draft.state {
        DraftState::Sent => MatchOutcome::AlreadySent { index },
        DraftState::Canceled => MatchOutcome::Discard { index, kind },
        _ => MatchOutcome::Finalize { index, kind },
    }
}

use crate::error::TransitionError;
use crate::types::{Draft, DraftState};
use tracing::trace;

pub fn is_allowed(from: DraftState, to: DraftState) -> bool {
    use DraftState::*;
    matches!(
        (from, to),
        (Pending, Sending)
            | (Sending, Sent)
            | (Sending, Pending)
            | (Sending, Failed)
            | (Pending, Canceled)
            | (Sending, Canceled)
            | (Failed, Pending)
            | (Canceled, Pending)
    )
}

/// The single place draft state is written.
pub fn apply_transition(draft: &mut Draft, to: DraftState) -> Result<(), TransitionError> {
    let from = draft.state;
    if !is_allowed(from, to) {
        return Err(TransitionError { from, to });
    }
    trace!(temp_id = %draft.temp_id, %from, %to, "draft transition");
    draft.state = to;
    Ok(())
}

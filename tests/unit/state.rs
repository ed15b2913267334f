use send_channel::draft::{build_draft, text_payload, DefaultFingerprinter};
use send_channel::state::{apply_transition, is_allowed};
use send_channel::types::{Draft, DraftState};

use DraftState::*;

const ALL: [DraftState; 5] = [Pending, Sending, Sent, Failed, Canceled];

fn draft_in(state: DraftState) -> Draft {
    let mut draft = build_draft(
        &DefaultFingerprinter,
        "c1".to_string(),
        text_payload("hello").unwrap(),
        None,
        3,
        0,
    );
    draft.state = state;
    draft
}

#[test]
fn test_transition_table() {
    let allowed = [
        (Pending, Sending),
        (Sending, Sent),
        (Sending, Pending),
        (Sending, Failed),
        (Pending, Canceled),
        (Sending, Canceled),
        (Failed, Pending),
        (Canceled, Pending),
    ];
    for from in ALL {
        for to in ALL {
            assert_eq!(
                is_allowed(from, to),
                allowed.contains(&(from, to)),
                "{from} -> {to}"
            );
        }
    }
}

#[test]
fn test_apply_transition_updates_state() {
    let mut draft = draft_in(Pending);
    apply_transition(&mut draft, Sending).unwrap();
    assert_eq!(draft.state, Sending);
    apply_transition(&mut draft, Sent).unwrap();
    assert_eq!(draft.state, Sent);
}

#[test]
fn test_apply_transition_rejects_illegal() {
    let mut draft = draft_in(Sent);
    let err = apply_transition(&mut draft, Pending).unwrap_err();
    assert_eq!(err.from, Sent);
    assert_eq!(err.to, Pending);
    assert_eq!(draft.state, Sent);
    assert_eq!(err.to_string(), "illegal draft transition sent -> pending");
}

#[test]
fn test_pending_cannot_skip_to_sent() {
    let mut draft = draft_in(Pending);
    assert!(apply_transition(&mut draft, Sent).is_err());
    assert!(apply_transition(&mut draft, Failed).is_err());
    assert_eq!(draft.state, Pending);
}

#[test]
fn test_failed_only_reopens() {
    for to in ALL {
        let mut draft = draft_in(Failed);
        assert_eq!(apply_transition(&mut draft, to).is_ok(), to == Pending);
    }
}

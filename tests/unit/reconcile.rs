use send_channel::draft::{build_draft, text_payload, DefaultFingerprinter};
use send_channel::reconcile::{find_match, MatchKind, MatchOutcome};
use send_channel::types::{ConfirmedMessage, Draft, DraftState};

fn draft(content: &str, created_at: i64, state: DraftState) -> Draft {
    let mut draft = build_draft(
        &DefaultFingerprinter,
        "c1".to_string(),
        text_payload(content).unwrap(),
        None,
        3,
        created_at,
    );
    draft.state = state;
    draft
}

fn confirmed(content: &str, ts: i64) -> ConfirmedMessage {
    ConfirmedMessage {
        id: Some("srv-1".to_string()),
        conversation_id: "c1".to_string(),
        content: Some(content.to_string()),
        timestamp: Some(ts),
        ..ConfirmedMessage::default()
    }
}

#[test]
fn test_exact_temp_id_match() {
    let drafts = vec![
        draft("a", 1, DraftState::Sent),
        draft("b", 2, DraftState::Sending),
    ];
    let mut msg = confirmed("unrelated", 99);
    msg.temp_id = Some(drafts[1].temp_id.clone());
    assert_eq!(
        find_match(&drafts, &msg, &DefaultFingerprinter),
        MatchOutcome::Finalize {
            index: 1,
            kind: MatchKind::TempId
        }
    );
}

#[test]
fn test_temp_id_match_on_sent_is_noop() {
    let drafts = vec![draft("a", 1, DraftState::Sent)];
    let mut msg = confirmed("a", 1);
    msg.temp_id = Some(drafts[0].temp_id.clone());
    assert_eq!(
        find_match(&drafts, &msg, &DefaultFingerprinter),
        MatchOutcome::AlreadySent { index: 0 }
    );
}

#[test]
fn test_unknown_temp_id_falls_back_to_fingerprint() {
    let drafts = vec![draft("hello", 1000, DraftState::Sending)];
    let mut msg = confirmed("hello", 1000);
    msg.temp_id = Some("tmp_from_another_tab".into());
    assert_eq!(
        find_match(&drafts, &msg, &DefaultFingerprinter),
        MatchOutcome::Finalize {
            index: 0,
            kind: MatchKind::Fingerprint
        }
    );
}

#[test]
fn test_fingerprint_skips_sent_drafts() {
    let drafts = vec![
        draft("hello", 1000, DraftState::Sent),
        draft("hello", 1000, DraftState::Sending),
    ];
    assert_eq!(
        find_match(&drafts, &confirmed("hello", 1000), &DefaultFingerprinter),
        MatchOutcome::Finalize {
            index: 1,
            kind: MatchKind::Fingerprint
        }
    );
}

#[test]
fn test_fingerprint_first_in_queue_order_wins() {
    let drafts = vec![
        draft("same", 500, DraftState::Pending),
        draft("same", 500, DraftState::Sending),
    ];
    assert_eq!(
        find_match(&drafts, &confirmed("same", 500), &DefaultFingerprinter),
        MatchOutcome::Finalize {
            index: 0,
            kind: MatchKind::Fingerprint
        }
    );
}

#[test]
fn test_fingerprint_hit_on_canceled_discards() {
    let drafts = vec![
        draft("bye", 7, DraftState::Canceled),
        draft("bye", 7, DraftState::Sending),
    ];
    assert_eq!(
        find_match(&drafts, &confirmed("bye", 7), &DefaultFingerprinter),
        MatchOutcome::Discard {
            index: 0,
            kind: MatchKind::Fingerprint
        }
    );
}

#[test]
fn test_no_match() {
    let drafts = vec![draft("hello", 1000, DraftState::Sending)];
    assert_eq!(
        find_match(&drafts, &confirmed("hello", 1001), &DefaultFingerprinter),
        MatchOutcome::NoMatch
    );
    assert_eq!(
        find_match(&[], &confirmed("hello", 1000), &DefaultFingerprinter),
        MatchOutcome::NoMatch
    );
}

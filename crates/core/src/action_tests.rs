// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use super::*;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    send_message = { "send_message", ActionKind::SendMessage },
    kebab_case = { "super-like", ActionKind::SuperLike },
    upper_case = { "BLOCK_USER", ActionKind::BlockUser },
    typing = { "stop_typing", ActionKind::StopTyping },
)]
fn action_kind_from_str(input: &str, expected: ActionKind) {
    assert_eq!(input.parse::<ActionKind>().unwrap(), expected);
}

#[test]
fn action_kind_round_trips_all_names() {
    for kind in ActionKind::ALL {
        assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
    }
}

#[test]
fn action_kind_rejects_unknown() {
    assert!(matches!(
        "poke".parse::<ActionKind>(),
        Err(Error::InvalidActionKind(_))
    ));
}

#[test]
fn only_typing_is_ephemeral() {
    let ephemeral: Vec<_> = ActionKind::ALL
        .into_iter()
        .filter(|k| k.is_ephemeral())
        .collect();
    assert_eq!(ephemeral, vec![ActionKind::StartTyping, ActionKind::StopTyping]);
}

#[test]
fn priority_rank_orders_high_first() {
    assert!(ActionPriority::High.rank() < ActionPriority::Medium.rank());
    assert!(ActionPriority::Medium.rank() < ActionPriority::Low.rank());
    assert_eq!(ActionPriority::from_rank(2), Some(ActionPriority::Low));
    assert_eq!(ActionPriority::from_rank(7), None);
}

#[parameterized(
    pending_to_processing = { ActionStatus::Pending, ActionStatus::Processing, true },
    pending_to_cancelled = { ActionStatus::Pending, ActionStatus::Cancelled, true },
    processing_to_completed = { ActionStatus::Processing, ActionStatus::Completed, true },
    processing_back_to_pending = { ActionStatus::Processing, ActionStatus::Pending, true },
    failed_to_pending = { ActionStatus::Failed, ActionStatus::Pending, true },
    completed_to_pending = { ActionStatus::Completed, ActionStatus::Pending, false },
    cancelled_to_processing = { ActionStatus::Cancelled, ActionStatus::Processing, false },
    pending_to_completed = { ActionStatus::Pending, ActionStatus::Completed, false },
)]
fn status_transitions(from: ActionStatus, to: ActionStatus, allowed: bool) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[test]
fn payload_serializes_with_kind_tag() {
    let payload = ActionPayload::Like {
        user_id: "u1".into(),
    };
    let value = serde_json::to_value(&payload).unwrap();
    assert_eq!(value, json!({"kind": "like", "user_id": "u1"}));
    assert_eq!(payload.kind(), ActionKind::Like);
}

#[test]
fn snapshot_drops_kind_tag() {
    let payload = ActionPayload::UpdateProfile {
        user_id: "u1".into(),
        name: None,
        bio: Some("A".into()),
        age: Some(30),
        city: None,
        occupation: None,
        interests: None,
    };
    let snapshot = payload.snapshot().unwrap();
    assert_eq!(snapshot, json!({"user_id": "u1", "bio": "A", "age": 30}));
}

#[test]
fn from_snapshot_rebuilds_payload() {
    let value = json!({"user_id": "u1", "bio": "merged", "age": 31});
    let payload = ActionPayload::from_snapshot(ActionKind::UpdateProfile, &value).unwrap();
    match payload {
        ActionPayload::UpdateProfile { bio, age, .. } => {
            assert_eq!(bio.as_deref(), Some("merged"));
            assert_eq!(age, Some(31));
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[test]
fn from_snapshot_rejects_missing_fields() {
    let err = ActionPayload::from_snapshot(ActionKind::EditMessage, &json!({"content": "x"}))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidPayload { .. }));
}

#[test]
fn from_snapshot_rejects_non_object() {
    let err = ActionPayload::from_snapshot(ActionKind::Like, &json!("u1")).unwrap_err();
    assert!(matches!(err, Error::InvalidPayload { .. }));
}

#[test]
fn entity_id_follows_payload() {
    let send = ActionPayload::SendMessage {
        chat_id: "chat-9".into(),
        client_message_id: "m1".into(),
        content: "hi".into(),
        media_ref: None,
        reply_to: None,
    };
    assert_eq!(send.entity_id(), "chat-9");

    let story = ActionPayload::DeleteStory {
        story_id: "s-1".into(),
    };
    assert_eq!(story.entity_id(), "s-1");
}

#[test]
fn new_action_is_due_immediately() {
    let now = Utc::now();
    let action = QueuedAction::new(
        "act-1".into(),
        ActionPayload::BlockUser {
            user_id: "u2".into(),
        },
        Some("u2".into()),
        ActionPriority::High,
        3,
        now,
    );
    assert_eq!(action.kind, ActionKind::BlockUser);
    assert_eq!(action.status, ActionStatus::Pending);
    assert!(action.is_due(now));
    assert!(!action.retries_exhausted());
}

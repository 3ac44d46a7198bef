// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tag Group Reconciler Tests

mod common;

use common::Harness;
use regsync_core::registry::{RegistryCall, RegistryOp};
use regsync_core::storage::keys;
use regsync_core::sync::NamedUserRecord;
use regsync_core::{
    KeyValueStore, RegistryResponse, TagGroupDelta, TagGroupOutcome, TagMergePolicy, TagSubject,
};

fn vip_gold_add() -> TagGroupDelta {
    TagGroupDelta::new().with_add("vip", "gold")
}

fn vip_gold_remove() -> TagGroupDelta {
    TagGroupDelta::new().with_remove("vip", "gold")
}

#[test]
fn test_success_sends_delta_and_clears_pending() {
    let h = Harness::new();
    h.register_channel("C1");
    let tags = h.tag_groups(TagMergePolicy::LastWriteWins);

    let delta = vip_gold_add().with_remove("region", "eu");
    assert_eq!(
        tags.synchronize(TagSubject::Channel, &delta),
        TagGroupOutcome::Applied
    );

    assert_eq!(
        h.mock.calls(),
        vec![RegistryCall::UpdateTagGroups {
            subject: TagSubject::Channel,
            subject_id: "C1".into(),
            adds: delta.adds.clone(),
            removes: delta.removes.clone(),
        }]
    );
    assert!(tags.pending(TagSubject::Channel).unwrap().is_empty());
}

#[test]
fn test_server_error_keeps_merged_delta_pending() {
    let h = Harness::new();
    h.register_channel("C1");
    h.mock
        .push_response(RegistryOp::UpdateTagGroups, RegistryResponse::with_status(500));
    let tags = h.tag_groups(TagMergePolicy::LastWriteWins);

    assert_eq!(
        tags.synchronize(TagSubject::Channel, &vip_gold_add()),
        TagGroupOutcome::Failed
    );
    assert_eq!(
        h.storage
            .get(keys::PENDING_CHANNEL_ADD_TAG_GROUPS)
            .unwrap()
            .as_deref(),
        Some(r#"{"vip":["gold"]}"#)
    );
}

#[test]
fn test_client_error_drops_pending() {
    let h = Harness::new();
    h.register_channel("C1");
    h.mock
        .push_response(RegistryOp::UpdateTagGroups, RegistryResponse::with_status(500));
    h.mock
        .push_response(RegistryOp::UpdateTagGroups, RegistryResponse::with_status(400));
    let tags = h.tag_groups(TagMergePolicy::LastWriteWins);

    tags.synchronize(TagSubject::Channel, &vip_gold_add());
    let outcome = tags.synchronize(
        TagSubject::Channel,
        &TagGroupDelta::new().with_add("vip", "silver"),
    );

    assert_eq!(outcome, TagGroupOutcome::Rejected);
    // The rejected request carried both the pending and the new tag.
    match h.mock.calls().last() {
        Some(RegistryCall::UpdateTagGroups { adds, .. }) => {
            assert_eq!(adds["vip"].len(), 2);
        }
        other => panic!("unexpected call {:?}", other),
    }
    assert!(tags.pending(TagSubject::Channel).unwrap().is_empty());
}

#[test]
fn test_no_response_is_retryable() {
    let h = Harness::new();
    h.register_channel("C1");
    h.mock
        .push_response(RegistryOp::UpdateTagGroups, RegistryResponse::with_status(0));
    let tags = h.tag_groups(TagMergePolicy::LastWriteWins);

    let outcome = tags.synchronize(TagSubject::Channel, &vip_gold_add());
    assert!(outcome.should_retry());
    assert_eq!(tags.pending(TagSubject::Channel).unwrap(), vip_gold_add());
}

#[test]
fn test_empty_delta_makes_no_call() {
    let h = Harness::new();
    h.register_channel("C1");
    let tags = h.tag_groups(TagMergePolicy::LastWriteWins);

    assert_eq!(
        tags.synchronize(TagSubject::Channel, &TagGroupDelta::new()),
        TagGroupOutcome::NothingToSend
    );
    assert_eq!(h.mock.call_count(), 0);
}

#[test]
fn test_named_user_tags_need_named_user() {
    let h = Harness::new();
    h.register_channel("C1");
    let tags = h.tag_groups(TagMergePolicy::LastWriteWins);

    assert_eq!(
        tags.synchronize(TagSubject::NamedUser, &vip_gold_add()),
        TagGroupOutcome::Deferred
    );
    assert_eq!(h.mock.call_count(), 0);

    NamedUserRecord {
        id: Some("u1".into()),
        change_token: Some("t".into()),
    }
    .save(h.storage.as_ref())
    .unwrap();

    assert_eq!(
        tags.synchronize(TagSubject::NamedUser, &TagGroupDelta::new()),
        TagGroupOutcome::Applied
    );
    assert_eq!(
        h.mock.calls(),
        vec![RegistryCall::UpdateTagGroups {
            subject: TagSubject::NamedUser,
            subject_id: "u1".into(),
            adds: vip_gold_add().adds,
            removes: Default::default(),
        }]
    );
}

#[test]
fn test_pending_subjects_are_independent() {
    let h = Harness::new();
    h.register_channel("C1");
    h.mock
        .push_response(RegistryOp::UpdateTagGroups, RegistryResponse::with_status(503));
    let tags = h.tag_groups(TagMergePolicy::LastWriteWins);

    tags.synchronize(TagSubject::Channel, &vip_gold_add());
    tags.synchronize(TagSubject::NamedUser, &vip_gold_remove());

    assert_eq!(tags.pending(TagSubject::Channel).unwrap(), vip_gold_add());
    assert_eq!(
        tags.pending(TagSubject::NamedUser).unwrap(),
        vip_gold_remove()
    );
}

#[test]
fn test_add_then_remove_last_write_wins_sends_remove() {
    let h = Harness::new();
    h.register_channel("C1");
    h.mock
        .push_response(RegistryOp::UpdateTagGroups, RegistryResponse::with_status(500));
    let tags = h.tag_groups(TagMergePolicy::LastWriteWins);

    tags.synchronize(TagSubject::Channel, &vip_gold_add());
    h.mock.clear_calls();

    let outcome = tags.synchronize(TagSubject::Channel, &vip_gold_remove());
    assert_eq!(outcome, TagGroupOutcome::Applied);
    assert_eq!(
        h.mock.calls(),
        vec![RegistryCall::UpdateTagGroups {
            subject: TagSubject::Channel,
            subject_id: "C1".into(),
            adds: Default::default(),
            removes: vip_gold_remove().removes,
        }]
    );
}

#[test]
fn test_add_then_remove_cancel_opposing_makes_no_call() {
    let h = Harness::new();
    h.register_channel("C1");
    h.mock
        .push_response(RegistryOp::UpdateTagGroups, RegistryResponse::with_status(500));
    let tags = h.tag_groups(TagMergePolicy::CancelOpposing);

    tags.synchronize(TagSubject::Channel, &vip_gold_add());
    assert_eq!(tags.pending(TagSubject::Channel).unwrap(), vip_gold_add());
    h.mock.clear_calls();

    let outcome = tags.synchronize(TagSubject::Channel, &vip_gold_remove());
    assert_eq!(outcome, TagGroupOutcome::NothingToSend);
    assert_eq!(h.mock.call_count(), 0);
    assert!(tags.pending(TagSubject::Channel).unwrap().is_empty());
    assert_eq!(
        h.storage.get(keys::PENDING_CHANNEL_ADD_TAG_GROUPS).unwrap(),
        None
    );
}

#[test]
fn test_clear_pending_drops_deferred_tags() {
    let h = Harness::new();
    let tags = h.tag_groups(TagMergePolicy::LastWriteWins);

    tags.synchronize(TagSubject::Channel, &vip_gold_add());
    tags.clear_pending(TagSubject::Channel).unwrap();

    h.register_channel("C1");
    assert_eq!(
        tags.synchronize(TagSubject::Channel, &TagGroupDelta::new()),
        TagGroupOutcome::NothingToSend
    );
    assert_eq!(h.mock.call_count(), 0);
}

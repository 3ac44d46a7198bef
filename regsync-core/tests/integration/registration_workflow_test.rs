// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Registration Workflow Integration Tests
//!
//! End-to-end flows through the `Registrar`.

use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use crate::common::{init_tracing, payload};
use regsync_core::api::{CallbackHandler, RegSyncError, SyncEvent};
use regsync_core::registry::{RegistryCall, RegistryOp};
use regsync_core::{
    ManualClock, MockRegistryClient, Registrar, RegistryResponse, SyncConfig, TagSubject,
};

const WAIT: Duration = Duration::from_secs(5);

fn build(config: SyncConfig, mock: &Arc<MockRegistryClient>) -> (Registrar, Receiver<SyncEvent>) {
    init_tracing();
    let registrar = Registrar::builder()
        .config(config)
        .client(mock.clone())
        .clock(Arc::new(ManualClock::default()))
        .build()
        .unwrap();

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    registrar.add_event_handler(Arc::new(CallbackHandler::new(move |event| {
        let _ = tx.lock().unwrap().send(event);
    })));
    (registrar, rx)
}

fn wait_for(events: &Receiver<SyncEvent>, wanted: impl Fn(&SyncEvent) -> bool) -> SyncEvent {
    loop {
        let event = events.recv_timeout(WAIT).expect("timed out waiting for event");
        if wanted(&event) {
            return event;
        }
    }
}

#[test]
fn test_first_start_registers_channel_then_named_user_and_tags() {
    let mock = Arc::new(MockRegistryClient::new());
    mock.push_response(
        RegistryOp::CreateChannel,
        RegistryResponse::created(201, "C1", "https://x/C1"),
    );
    let (registrar, events) = build(SyncConfig::default(), &mock);

    // Edits made before the channel exists wait for it.
    registrar.named_user().set_id(Some("user-1")).unwrap();
    registrar
        .edit_channel_tag_groups()
        .add_tag("loyalty", "gold")
        .apply()
        .unwrap();

    registrar.start_registration(payload()).unwrap();

    wait_for(&events, |e| {
        matches!(e, SyncEvent::ChannelUpdated { succeeded: true, .. })
    });

    // Named user and tag workers run independently after the create.
    let tags_done = SyncEvent::TagGroupsUpdated {
        subject: TagSubject::Channel,
        succeeded: true,
    };
    let named_user_done = SyncEvent::NamedUserUpdated { succeeded: true };
    let mut seen = Vec::new();
    while !(seen.contains(&tags_done) && seen.contains(&named_user_done)) {
        seen.push(events.recv_timeout(WAIT).expect("timed out waiting for event"));
    }

    assert_eq!(registrar.channel_id().unwrap().as_deref(), Some("C1"));
    assert!(registrar
        .pending_tag_groups(TagSubject::Channel)
        .unwrap()
        .is_empty());
    assert!(mock.calls().contains(&RegistryCall::AssociateNamedUser {
        named_user_id: "user-1".into(),
        channel_id: "C1".into()
    }));
    registrar.shutdown();
}

#[test]
fn test_paused_creation_waits_for_enable() {
    let mock = Arc::new(MockRegistryClient::new());
    let (registrar, events) = build(SyncConfig::default().with_channel_creation_delay(), &mock);

    registrar.update_registration(payload()).unwrap();
    assert!(events.recv_timeout(Duration::from_millis(200)).is_err());
    assert_eq!(mock.count_of(RegistryOp::CreateChannel), 0);

    registrar.enable_channel_creation().unwrap();
    let event = wait_for(&events, |e| matches!(e, SyncEvent::ChannelUpdated { .. }));
    assert_eq!(
        event,
        SyncEvent::ChannelUpdated {
            channel_id: Some("mock-channel".into()),
            is_create_request: true,
            succeeded: true,
        }
    );
    registrar.shutdown();
}

#[test]
fn test_push_registration_gates_start() {
    let mock = Arc::new(MockRegistryClient::new());
    let (registrar, events) = build(SyncConfig::default().with_push_registration(), &mock);

    registrar.start_registration(payload()).unwrap();
    registrar.update_registration(payload()).unwrap();
    assert!(events.recv_timeout(Duration::from_millis(200)).is_err());

    registrar
        .push_registration_finished(payload().with_push_address("fresh-token"))
        .unwrap();
    wait_for(&events, |e| matches!(e, SyncEvent::ChannelUpdated { .. }));

    match mock.calls().first() {
        Some(RegistryCall::CreateChannel { payload }) => {
            assert_eq!(payload.push_address.as_deref(), Some("fresh-token"));
        }
        other => panic!("unexpected call {:?}", other),
    }
    registrar.shutdown();
}

#[test]
fn test_invalid_edits_are_rejected_up_front() {
    let mock = Arc::new(MockRegistryClient::new());
    let (registrar, _events) = build(SyncConfig::default(), &mock);

    let long_id = "u".repeat(200);
    assert!(matches!(
        registrar.named_user().set_id(Some(&long_id)),
        Err(RegSyncError::InvalidNamedUser(_))
    ));
    assert!(matches!(
        registrar
            .edit_named_user_tag_groups()
            .add_tag("", "gold")
            .apply(),
        Err(RegSyncError::TagGroup(_))
    ));
    registrar.shutdown();
}

#[test]
fn test_registration_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("regsync.db");
    let mock = Arc::new(MockRegistryClient::new());

    {
        let registrar = Registrar::builder()
            .storage_path(&path)
            .client(mock.clone())
            .build()
            .unwrap();
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        registrar.add_event_handler(Arc::new(CallbackHandler::new(move |event| {
            let _ = tx.lock().unwrap().send(event);
        })));
        registrar.start_registration(payload()).unwrap();
        wait_for(&rx, |e| matches!(e, SyncEvent::ChannelUpdated { .. }));
        registrar.shutdown();
    }

    let registrar = Registrar::builder()
        .storage_path(&path)
        .client(mock.clone())
        .build()
        .unwrap();
    assert_eq!(
        registrar.channel_id().unwrap().as_deref(),
        Some("mock-channel")
    );
    registrar.shutdown();
}

#[cfg(not(feature = "http-client"))]
#[test]
fn test_builder_requires_client_without_http() {
    assert!(matches!(
        Registrar::builder().build(),
        Err(RegSyncError::Configuration(_))
    ));
}

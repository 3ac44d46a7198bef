// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sync Engine
//!
//! Runs a single [`SyncTask`] to completion and returns the work it
//! produces. The engine owns the reconcilers, the registration gate and the
//! event broadcast; it owns no threads or timers. Retryable failures come
//! back as delayed follow-ups for the caller to re-submit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::events::{EventDispatcher, EventHandler, SyncEvent};
use super::named_user::{self, NamedUserLock};
use super::tasks::{FollowUp, SyncTask};
use crate::clock::Clock;
use crate::config::SyncConfig;
use crate::payload::ChannelRegistrationPayload;
use crate::registry::RegistryClient;
use crate::storage::KeyValueStore;
use crate::sync::{
    ChannelOutcome, ChannelReconciler, NamedUserOutcome, NamedUserReconciler, TagGroupDelta,
    TagGroupOutcome, TagGroupReconciler, TagSubject,
};

/// In-process registration flags.
#[derive(Debug, Default)]
pub struct RegistrationGate {
    started: AtomicBool,
    push_registering: AtomicBool,
}

impl RegistrationGate {
    /// Marks registration as started. Returns false if it already was.
    pub fn begin(&self) -> bool {
        !self.started.swap(true, Ordering::SeqCst)
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn set_push_registering(&self, registering: bool) {
        self.push_registering.store(registering, Ordering::SeqCst);
    }

    pub fn is_push_registering(&self) -> bool {
        self.push_registering.load(Ordering::SeqCst)
    }
}

/// Single-task executor over the three reconcilers.
pub struct SyncEngine {
    store: Arc<dyn KeyValueStore>,
    config: SyncConfig,
    channel: ChannelReconciler,
    named_user: NamedUserReconciler,
    tag_groups: TagGroupReconciler,
    gate: RegistrationGate,
    named_user_lock: NamedUserLock,
    events: RwLock<EventDispatcher>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        client: Arc<dyn RegistryClient>,
        clock: Arc<dyn Clock>,
        config: SyncConfig,
    ) -> Self {
        SyncEngine {
            channel: ChannelReconciler::new(store.clone(), client.clone(), clock, &config),
            named_user: NamedUserReconciler::new(store.clone(), client.clone()),
            tag_groups: TagGroupReconciler::new(store.clone(), client, config.tag_merge_policy),
            store,
            config,
            gate: RegistrationGate::default(),
            named_user_lock: NamedUserLock::default(),
            events: RwLock::new(EventDispatcher::new()),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn gate(&self) -> &RegistrationGate {
        &self.gate
    }

    pub fn channel(&self) -> &ChannelReconciler {
        &self.channel
    }

    pub fn tag_groups(&self) -> &TagGroupReconciler {
        &self.tag_groups
    }

    /// Lock that a [`NamedUser`](super::NamedUser) handle must share with
    /// this engine.
    pub fn named_user_lock(&self) -> NamedUserLock {
        self.named_user_lock.clone()
    }

    /// Adds a handler for sync events.
    pub fn add_event_handler(&self, handler: Arc<dyn EventHandler>) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add_handler(handler);
    }

    /// Executes `task`. `attempt` is 0 for fresh work and counts retries.
    pub fn handle(&self, task: SyncTask, attempt: u32) -> Vec<FollowUp> {
        tracing::debug!(task = task.kind(), attempt, "handling sync task");

        match task {
            SyncTask::StartRegistration { payload } => self.start_registration(payload),
            SyncTask::PushRegistrationFinished { payload } => {
                self.gate.set_push_registering(false);
                tracing::debug!("push registration finished");
                vec![FollowUp::now(SyncTask::UpdateChannel { payload })]
            }
            SyncTask::UpdateChannel { payload } => self.update_channel(payload, attempt),
            SyncTask::UpdateNamedUser => self.update_named_user(attempt),
            SyncTask::UpdateTagGroups { subject, delta } => {
                self.update_tag_groups(subject, &delta, attempt)
            }
            SyncTask::ClearPendingTags { subject } => {
                if let Err(e) = self.tag_groups.clear_pending(subject) {
                    tracing::error!(%subject, error = %e, "failed to clear pending tag groups");
                }
                Vec::new()
            }
        }
    }

    fn start_registration(&self, payload: ChannelRegistrationPayload) -> Vec<FollowUp> {
        if !self.gate.begin() {
            tracing::debug!("registration already started");
            return Vec::new();
        }

        if self.config.push_registration_required {
            self.gate.set_push_registering(true);
            tracing::info!("waiting for push registration before registering the channel");
            return Vec::new();
        }

        vec![FollowUp::now(SyncTask::UpdateChannel { payload })]
    }

    fn update_channel(&self, payload: ChannelRegistrationPayload, attempt: u32) -> Vec<FollowUp> {
        if self.gate.is_push_registering() {
            tracing::debug!("push registration in progress, skipping channel update");
            return Vec::new();
        }

        let outcome = self.channel.synchronize(&payload);
        if outcome != ChannelOutcome::Skipped {
            self.dispatch(SyncEvent::ChannelUpdated {
                channel_id: outcome.channel_id().map(str::to_string),
                is_create_request: outcome.is_create_request(),
                succeeded: outcome.succeeded(),
            });
        }

        match outcome {
            ChannelOutcome::Created { existing, .. } => self.channel_created(existing),
            outcome if outcome.should_retry() => {
                vec![self.retry(SyncTask::UpdateChannel { payload }, attempt)]
            }
            _ => Vec::new(),
        }
    }

    /// Work that follows a successful create.
    fn channel_created(&self, existing: bool) -> Vec<FollowUp> {
        if existing && self.config.clear_named_user_on_reinstall {
            let reset =
                named_user::disassociate_if_unset(self.store.as_ref(), &self.named_user_lock);
            match reset {
                Ok(true) => tracing::info!("reinstall detected, disassociating named user"),
                Ok(false) => {}
                Err(e) => tracing::error!(error = %e, "failed to reset named user on reinstall"),
            }
        }

        vec![
            FollowUp::now(SyncTask::UpdateNamedUser),
            FollowUp::now(SyncTask::flush_tag_groups(TagSubject::Channel)),
            FollowUp::now(SyncTask::flush_tag_groups(TagSubject::NamedUser)),
        ]
    }

    fn update_named_user(&self, attempt: u32) -> Vec<FollowUp> {
        let outcome = self.named_user.synchronize();
        if matches!(
            outcome,
            NamedUserOutcome::Applied | NamedUserOutcome::Failed { .. }
        ) {
            self.dispatch(SyncEvent::NamedUserUpdated {
                succeeded: outcome.succeeded(),
            });
        }

        if outcome.should_retry() {
            vec![self.retry(SyncTask::UpdateNamedUser, attempt)]
        } else {
            Vec::new()
        }
    }

    fn update_tag_groups(
        &self,
        subject: TagSubject,
        delta: &TagGroupDelta,
        attempt: u32,
    ) -> Vec<FollowUp> {
        let outcome = self.tag_groups.synchronize(subject, delta);
        if outcome.attempted() {
            self.dispatch(SyncEvent::TagGroupsUpdated {
                subject,
                succeeded: outcome.succeeded(),
            });
        }

        // The merged delta is already pending; a retry only has to flush it.
        if outcome == TagGroupOutcome::Failed {
            vec![self.retry(SyncTask::flush_tag_groups(subject), attempt)]
        } else {
            Vec::new()
        }
    }

    fn retry(&self, task: SyncTask, attempt: u32) -> FollowUp {
        let attempt = attempt.saturating_add(1);
        let delay = self.config.retry.delay_for(attempt);
        tracing::debug!(task = task.kind(), attempt, ?delay, "scheduling retry");
        FollowUp {
            task,
            attempt,
            delay,
        }
    }

    fn dispatch(&self, event: SyncEvent) {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .dispatch(event);
    }
}

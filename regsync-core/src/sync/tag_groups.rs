// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tag Group Reconciler
//!
//! Folds newly requested tag mutations into the pending delta, sends the net
//! result, and decides what stays pending:
//!
//! - 2xx: the registry applied everything, pending is cleared
//! - 4xx (409 included): the registry will never accept it, pending is cleared
//! - 5xx / no response: the merged delta is kept for the next attempt

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::state::{ChannelRecord, NamedUserRecord, SyncError};
use super::tags::{TagGroupDelta, TagSubject};
use crate::config::TagMergePolicy;
use crate::registry::{RegistryClient, StatusClass};
use crate::storage::{KeyValueStore, PendingTagStore};

/// Result of one tag group synchronization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagGroupOutcome {
    /// The merged delta was empty; no request was made.
    NothingToSend,
    /// The subject has no registry id yet; the delta stays pending.
    Deferred,
    /// The registry applied the delta.
    Applied,
    /// The registry rejected the delta for good; it was dropped.
    Rejected,
    /// The request failed transiently; the delta stays pending.
    Failed,
}

impl TagGroupOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, TagGroupOutcome::Applied)
    }

    pub fn should_retry(&self) -> bool {
        matches!(self, TagGroupOutcome::Failed)
    }

    /// Whether a registry request was made.
    pub fn attempted(&self) -> bool {
        matches!(
            self,
            TagGroupOutcome::Applied | TagGroupOutcome::Rejected | TagGroupOutcome::Failed
        )
    }
}

/// Applies pending tag group mutations for both subjects.
pub struct TagGroupReconciler {
    store: Arc<dyn KeyValueStore>,
    pending: PendingTagStore,
    client: Arc<dyn RegistryClient>,
    policy: TagMergePolicy,
    channel_lock: Mutex<()>,
    named_user_lock: Mutex<()>,
}

impl TagGroupReconciler {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        client: Arc<dyn RegistryClient>,
        policy: TagMergePolicy,
    ) -> Self {
        TagGroupReconciler {
            pending: PendingTagStore::new(store.clone()),
            store,
            client,
            policy,
            channel_lock: Mutex::new(()),
            named_user_lock: Mutex::new(()),
        }
    }

    /// Merges `delta` into the pending mutations for `subject` and sends them.
    pub fn synchronize(&self, subject: TagSubject, delta: &TagGroupDelta) -> TagGroupOutcome {
        let _guard = self.lock(subject);

        match self.try_synchronize(subject, delta) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(%subject, error = %e, "tag group sync failed");
                TagGroupOutcome::Failed
            }
        }
    }

    /// Drops everything pending for `subject` without contacting the registry.
    pub fn clear_pending(&self, subject: TagSubject) -> Result<(), SyncError> {
        let _guard = self.lock(subject);
        self.pending.clear(subject)?;
        tracing::debug!(%subject, "cleared pending tag groups");
        Ok(())
    }

    /// Current pending mutations for `subject`.
    pub fn pending(&self, subject: TagSubject) -> Result<TagGroupDelta, SyncError> {
        let _guard = self.lock(subject);
        Ok(self.pending.load(subject)?)
    }

    fn try_synchronize(
        &self,
        subject: TagSubject,
        delta: &TagGroupDelta,
    ) -> Result<TagGroupOutcome, SyncError> {
        let pending = self.pending.load(subject)?;
        let merged = pending.merged(delta, self.policy);

        if merged.is_empty() {
            if !pending.is_empty() {
                self.pending.clear(subject)?;
            }
            tracing::debug!(%subject, "no tag group changes to send");
            return Ok(TagGroupOutcome::NothingToSend);
        }

        let Some(subject_id) = self.subject_id(subject)? else {
            self.pending.save(subject, &merged)?;
            tracing::debug!(%subject, "no registry id yet, keeping tag groups pending");
            return Ok(TagGroupOutcome::Deferred);
        };

        let response =
            self.client
                .update_tag_groups(subject, &subject_id, &merged.adds, &merged.removes);

        match response.status_class() {
            StatusClass::Success => {
                self.pending.clear(subject)?;
                tracing::info!(%subject, "tag groups updated");
                Ok(TagGroupOutcome::Applied)
            }
            StatusClass::ClientError | StatusClass::Conflict => {
                self.pending.clear(subject)?;
                tracing::error!(%subject, status = ?response.status, "tag group update rejected, dropping it");
                Ok(TagGroupOutcome::Rejected)
            }
            StatusClass::ServerError | StatusClass::TransportFailure => {
                self.pending.save(subject, &merged)?;
                tracing::warn!(%subject, status = ?response.status, "tag group update failed, will retry");
                Ok(TagGroupOutcome::Failed)
            }
        }
    }

    fn subject_id(&self, subject: TagSubject) -> Result<Option<String>, SyncError> {
        match subject {
            TagSubject::Channel => ChannelRecord::channel_id(self.store.as_ref()),
            TagSubject::NamedUser => Ok(NamedUserRecord::load(self.store.as_ref())?.id),
        }
    }

    fn lock(&self, subject: TagSubject) -> MutexGuard<'_, ()> {
        let lock = match subject {
            TagSubject::Channel => &self.channel_lock,
            TagSubject::NamedUser => &self.named_user_lock,
        };
        lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Named User Reconciler
//!
//! Associates the channel with the current named user, or disassociates it
//! when no named user is set. Each attempt is stamped with the identity's
//! change token; a result is only recorded if the token is still current
//! when the registry answers.

use std::sync::{Arc, Mutex, PoisonError};

use super::state::{ChannelRecord, NamedUserRecord, SyncError};
use crate::registry::{RegistryClient, StatusClass};
use crate::storage::KeyValueStore;

/// Result of one named user synchronization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedUserOutcome {
    /// No channel yet, or the current token was already applied.
    Skipped,
    /// The registry accepted the update and its token was recorded.
    Applied,
    /// The registry accepted the update but the identity changed meanwhile.
    Stale,
    /// The registry did not accept the update.
    Failed { retry: bool },
}

impl NamedUserOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, NamedUserOutcome::Applied)
    }

    pub fn should_retry(&self) -> bool {
        matches!(self, NamedUserOutcome::Failed { retry: true })
    }
}

/// Applies named user association changes.
pub struct NamedUserReconciler {
    store: Arc<dyn KeyValueStore>,
    client: Arc<dyn RegistryClient>,
    lock: Mutex<()>,
}

impl NamedUserReconciler {
    pub fn new(store: Arc<dyn KeyValueStore>, client: Arc<dyn RegistryClient>) -> Self {
        NamedUserReconciler {
            store,
            client,
            lock: Mutex::new(()),
        }
    }

    /// Pushes the current named user association to the registry.
    pub fn synchronize(&self) -> NamedUserOutcome {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        match self.try_synchronize() {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "named user sync failed");
                NamedUserOutcome::Failed { retry: false }
            }
        }
    }

    fn try_synchronize(&self) -> Result<NamedUserOutcome, SyncError> {
        let store = self.store.as_ref();

        let Some(channel_id) = ChannelRecord::channel_id(store)? else {
            tracing::debug!("no channel id yet, skipping named user update");
            return Ok(NamedUserOutcome::Skipped);
        };

        let snapshot = NamedUserRecord::load(store)?;
        if snapshot.change_token == NamedUserRecord::last_applied_token(store)? {
            tracing::debug!("named user already up to date");
            return Ok(NamedUserOutcome::Skipped);
        }

        let response = match &snapshot.id {
            Some(id) => self.client.associate_named_user(id, &channel_id),
            None => self.client.disassociate_named_user(&channel_id),
        };

        let class = response.status_class();
        if class != StatusClass::Success {
            let retry = class.is_retryable();
            if retry {
                tracing::warn!(status = ?response.status, "named user update failed, will retry");
            } else {
                tracing::error!(status = ?response.status, "named user update rejected");
            }
            return Ok(NamedUserOutcome::Failed { retry });
        }

        let current = NamedUserRecord::load(store)?;
        if current.change_token != snapshot.change_token {
            tracing::warn!("named user changed during update, discarding result");
            return Ok(NamedUserOutcome::Stale);
        }

        if let Some(token) = &snapshot.change_token {
            NamedUserRecord::set_last_applied_token(store, token)?;
        }
        tracing::info!(associated = snapshot.id.is_some(), "named user updated");
        Ok(NamedUserOutcome::Applied)
    }
}

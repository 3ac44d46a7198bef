// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Channel Reconciler
//!
//! Keeps the registry's channel entry in line with the local payload.
//!
//! - No channel record: create, unless creation is paused.
//! - Channel record present: update, unless the payload is unchanged and the
//!   last registration is younger than the re-registration interval.
//! - A 409 on update means the registry forgot the channel: the record is
//!   cleared and a create is issued right away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::state::{ChannelRecord, LastRegistration, SyncError};
use crate::clock::Clock;
use crate::config::SyncConfig;
use crate::payload::ChannelRegistrationPayload;
use crate::registry::{RegistryClient, RegistryResponse, StatusClass};
use crate::storage::KeyValueStore;

/// Result of one channel synchronization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// Nothing was sent: the registry is already up to date, or creation
    /// is paused.
    Skipped,

    /// A channel was created.
    Created {
        channel_id: String,
        /// The registry answered 200: the channel already existed.
        existing: bool,
    },

    /// The existing channel was updated.
    Updated { channel_id: String },

    /// The attempt failed.
    Failed {
        is_create_request: bool,
        channel_id: Option<String>,
        /// Whether re-submitting the same request may succeed.
        retry: bool,
    },
}

impl ChannelOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(
            self,
            ChannelOutcome::Created { .. } | ChannelOutcome::Updated { .. }
        )
    }

    pub fn is_create_request(&self) -> bool {
        match self {
            ChannelOutcome::Created { .. } => true,
            ChannelOutcome::Failed {
                is_create_request, ..
            } => *is_create_request,
            _ => false,
        }
    }

    pub fn channel_id(&self) -> Option<&str> {
        match self {
            ChannelOutcome::Created { channel_id, .. }
            | ChannelOutcome::Updated { channel_id } => Some(channel_id),
            ChannelOutcome::Failed { channel_id, .. } => channel_id.as_deref(),
            ChannelOutcome::Skipped => None,
        }
    }

    pub fn should_retry(&self) -> bool {
        matches!(self, ChannelOutcome::Failed { retry: true, .. })
    }
}

/// Creates and updates this device's channel.
pub struct ChannelReconciler {
    store: Arc<dyn KeyValueStore>,
    client: Arc<dyn RegistryClient>,
    clock: Arc<dyn Clock>,
    reregistration_interval_ms: u64,
    creation_paused: AtomicBool,
    lock: Mutex<()>,
}

impl ChannelReconciler {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        client: Arc<dyn RegistryClient>,
        clock: Arc<dyn Clock>,
        config: &SyncConfig,
    ) -> Self {
        ChannelReconciler {
            store,
            client,
            clock,
            reregistration_interval_ms: config.reregistration_interval.as_millis() as u64,
            creation_paused: AtomicBool::new(config.channel_creation_delay_enabled),
            lock: Mutex::new(()),
        }
    }

    /// Pauses or resumes channel creation. Updates are never paused.
    pub fn set_creation_paused(&self, paused: bool) {
        self.creation_paused.store(paused, Ordering::SeqCst);
    }

    pub fn is_creation_paused(&self) -> bool {
        self.creation_paused.load(Ordering::SeqCst)
    }

    /// Brings the registry in line with `payload`.
    ///
    /// Never fails: storage errors are logged and reported as a failed,
    /// non-retryable outcome.
    pub fn synchronize(&self, payload: &ChannelRegistrationPayload) -> ChannelOutcome {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut request = Request::default();
        match self.try_synchronize(payload, &mut request) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    is_create_request = request.is_create,
                    "channel sync failed"
                );
                ChannelOutcome::Failed {
                    is_create_request: request.is_create,
                    channel_id: request.channel_id,
                    retry: false,
                }
            }
        }
    }

    fn try_synchronize(
        &self,
        payload: &ChannelRegistrationPayload,
        request: &mut Request,
    ) -> Result<ChannelOutcome, SyncError> {
        match ChannelRecord::load(self.store.as_ref())? {
            Some(record) => self.update(&record, payload, request),
            None => self.create(payload, request),
        }
    }

    fn create(
        &self,
        payload: &ChannelRegistrationPayload,
        request: &mut Request,
    ) -> Result<ChannelOutcome, SyncError> {
        request.is_create = true;
        request.channel_id = None;

        if self.is_creation_paused() {
            tracing::debug!("channel creation is paused, skipping");
            return Ok(ChannelOutcome::Skipped);
        }

        let response = self.client.create_channel(payload);
        let class = response.status_class();

        if class == StatusClass::Success {
            if let Some(record) = created_record(&response) {
                record.save(self.store.as_ref())?;
                self.record_success(payload)?;

                let existing = response.status == Some(200);
                tracing::info!(channel_id = %record.channel_id, existing, "channel created");
                return Ok(ChannelOutcome::Created {
                    channel_id: record.channel_id,
                    existing,
                });
            }
        }

        let retry = class.is_retryable();
        if retry {
            tracing::warn!(status = ?response.status, "channel create failed, will retry");
        } else {
            tracing::error!(status = ?response.status, "channel create rejected");
        }

        Ok(ChannelOutcome::Failed {
            is_create_request: true,
            channel_id: None,
            retry,
        })
    }

    fn update(
        &self,
        record: &ChannelRecord,
        payload: &ChannelRegistrationPayload,
        request: &mut Request,
    ) -> Result<ChannelOutcome, SyncError> {
        request.channel_id = Some(record.channel_id.clone());

        if !self.should_update(payload)? {
            tracing::debug!(channel_id = %record.channel_id, "channel already up to date");
            return Ok(ChannelOutcome::Skipped);
        }

        let response = self.client.update_channel(&record.location, payload);

        match response.status_class() {
            StatusClass::Success => {
                self.record_success(payload)?;
                tracing::info!(channel_id = %record.channel_id, "channel updated");
                Ok(ChannelOutcome::Updated {
                    channel_id: record.channel_id.clone(),
                })
            }
            StatusClass::Conflict => {
                tracing::warn!(
                    channel_id = %record.channel_id,
                    "channel no longer exists in the registry, recreating"
                );
                ChannelRecord::clear(self.store.as_ref())?;
                self.create(payload, request)
            }
            class => {
                let retry = class.is_retryable();
                if retry {
                    tracing::warn!(status = ?response.status, "channel update failed, will retry");
                } else {
                    tracing::error!(status = ?response.status, "channel update rejected");
                }
                Ok(ChannelOutcome::Failed {
                    is_create_request: false,
                    channel_id: Some(record.channel_id.clone()),
                    retry,
                })
            }
        }
    }

    /// True unless the payload matches the last accepted one and that
    /// registration is still inside the re-registration interval.
    fn should_update(&self, payload: &ChannelRegistrationPayload) -> Result<bool, SyncError> {
        let now = self.clock.now_ms();
        let Some(last) = LastRegistration::load(self.store.as_ref(), now)? else {
            return Ok(true);
        };

        if last.payload != *payload {
            return Ok(true);
        }
        Ok(now.saturating_sub(last.timestamp_ms) >= self.reregistration_interval_ms)
    }

    fn record_success(&self, payload: &ChannelRegistrationPayload) -> Result<(), SyncError> {
        LastRegistration {
            payload: payload.clone(),
            timestamp_ms: self.clock.now_ms(),
        }
        .save(self.store.as_ref())
    }
}

/// The request an attempt is making, kept for reporting absorbed errors.
#[derive(Default)]
struct Request {
    is_create: bool,
    channel_id: Option<String>,
}

/// Extracts a channel record from a 200/201 create response.
fn created_record(response: &RegistryResponse) -> Option<ChannelRecord> {
    if !matches!(response.status, Some(200) | Some(201)) {
        return None;
    }

    let channel_id = response.channel_id.as_deref().filter(|id| !id.is_empty())?;
    let location = response
        .channel_location
        .as_deref()
        .filter(|loc| !loc.is_empty())?;

    match url::Url::parse(location) {
        Ok(location) => Some(ChannelRecord {
            channel_id: channel_id.to_string(),
            location,
        }),
        Err(e) => {
            tracing::error!(location, error = %e, "registry returned an invalid channel location");
            None
        }
    }
}

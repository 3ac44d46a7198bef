// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Persisted Reconciliation Records
//!
//! Typed views over the key/value entries the reconcilers own. Records are
//! always reloaded from the store; nothing here is cached in memory.

use thiserror::Error;
use url::Url;

use crate::payload::ChannelRegistrationPayload;
use crate::storage::{keys, KeyValueStore, KeyValueStoreExt, StorageError};

/// Sync error types.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Registry identity of this device's channel.
///
/// Only complete records exist: an id without a usable location (or the
/// reverse) reads back as unregistered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub channel_id: String,
    pub location: Url,
}

impl ChannelRecord {
    /// Loads the record, if the device is registered.
    pub fn load(store: &dyn KeyValueStore) -> Result<Option<Self>, SyncError> {
        let Some(channel_id) = Self::channel_id(store)? else {
            return Ok(None);
        };
        let Some(raw_location) = store.get(keys::CHANNEL_LOCATION)? else {
            return Ok(None);
        };

        match Url::parse(&raw_location) {
            Ok(location) => Ok(Some(ChannelRecord {
                channel_id,
                location,
            })),
            Err(e) => {
                tracing::warn!(
                    location = %raw_location,
                    error = %e,
                    "stored channel location is not a valid URL"
                );
                Ok(None)
            }
        }
    }

    /// Returns the stored channel id alone.
    pub fn channel_id(store: &dyn KeyValueStore) -> Result<Option<String>, SyncError> {
        Ok(store
            .get(keys::CHANNEL_ID)?
            .filter(|id| !id.trim().is_empty()))
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), SyncError> {
        store.write_batch(&[
            (keys::CHANNEL_ID, Some(self.channel_id.as_str())),
            (keys::CHANNEL_LOCATION, Some(self.location.as_str())),
        ])?;
        Ok(())
    }

    /// Forgets the channel; the next sync creates a new one.
    pub fn clear(store: &dyn KeyValueStore) -> Result<(), SyncError> {
        store.write_batch(&[(keys::CHANNEL_ID, None), (keys::CHANNEL_LOCATION, None)])?;
        Ok(())
    }
}

/// The last payload the registry accepted, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastRegistration {
    pub payload: ChannelRegistrationPayload,
    /// Milliseconds since epoch.
    pub timestamp_ms: u64,
}

impl LastRegistration {
    /// Loads the last registration as seen at `now_ms`.
    ///
    /// A timestamp in the future (clock moved backwards) reads as 0.
    pub fn load(store: &dyn KeyValueStore, now_ms: u64) -> Result<Option<Self>, SyncError> {
        let Some(payload) =
            store.get_json::<ChannelRegistrationPayload>(keys::LAST_REGISTRATION_PAYLOAD)?
        else {
            return Ok(None);
        };

        let mut timestamp_ms = store
            .get_json::<u64>(keys::LAST_REGISTRATION_TIME)?
            .unwrap_or(0);
        if timestamp_ms > now_ms {
            tracing::debug!(timestamp_ms, now_ms, "last registration time is in the future");
            timestamp_ms = 0;
        }

        Ok(Some(LastRegistration {
            payload,
            timestamp_ms,
        }))
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), SyncError> {
        let payload = serde_json::to_string(&self.payload).map_err(StorageError::from)?;
        let time = self.timestamp_ms.to_string();
        store.write_batch(&[
            (keys::LAST_REGISTRATION_PAYLOAD, Some(payload.as_str())),
            (keys::LAST_REGISTRATION_TIME, Some(time.as_str())),
        ])?;
        Ok(())
    }
}

/// Application-owned named user identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedUserRecord {
    pub id: Option<String>,
    pub change_token: Option<String>,
}

impl NamedUserRecord {
    pub fn load(store: &dyn KeyValueStore) -> Result<Self, SyncError> {
        Ok(NamedUserRecord {
            id: store.get(keys::NAMED_USER_ID)?,
            change_token: store.get(keys::NAMED_USER_CHANGE_TOKEN)?,
        })
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), SyncError> {
        store.write_batch(&[
            (keys::NAMED_USER_ID, self.id.as_deref()),
            (keys::NAMED_USER_CHANGE_TOKEN, self.change_token.as_deref()),
        ])?;
        Ok(())
    }

    /// Token of the last update the registry accepted.
    pub fn last_applied_token(store: &dyn KeyValueStore) -> Result<Option<String>, SyncError> {
        Ok(store.get(keys::NAMED_USER_LAST_APPLIED_TOKEN)?)
    }

    pub fn set_last_applied_token(store: &dyn KeyValueStore, token: &str) -> Result<(), SyncError> {
        store.put(keys::NAMED_USER_LAST_APPLIED_TOKEN, token)?;
        Ok(())
    }
}

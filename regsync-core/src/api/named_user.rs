// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Named User Handle
//!
//! Application-facing owner of the named user identity. Every real change
//! gets a fresh change token so in-flight updates for the previous identity
//! can be recognised as stale.

use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use super::error::{RegSyncError, RegSyncResult};
use super::tasks::{SyncTask, TaskSink};
use crate::storage::KeyValueStore;
use crate::sync::{NamedUserRecord, SyncError, TagSubject};

/// Maximum named user id length, in characters.
pub const MAX_NAMED_USER_ID_LENGTH: usize = 128;

/// Guards every read-modify-write of the named user record.
///
/// The application handle and the engine's reinstall reset share one.
pub type NamedUserLock = Arc<Mutex<()>>;

/// Handle for reading and changing the named user.
pub struct NamedUser {
    store: Arc<dyn KeyValueStore>,
    sink: Arc<dyn TaskSink>,
    lock: NamedUserLock,
}

impl NamedUser {
    pub fn new(store: Arc<dyn KeyValueStore>, sink: Arc<dyn TaskSink>) -> Self {
        Self::with_lock(store, sink, NamedUserLock::default())
    }

    /// Creates a handle that serializes its writes with other holders of
    /// `lock`.
    pub fn with_lock(
        store: Arc<dyn KeyValueStore>,
        sink: Arc<dyn TaskSink>,
        lock: NamedUserLock,
    ) -> Self {
        NamedUser { store, sink, lock }
    }

    /// Current named user id.
    pub fn id(&self) -> RegSyncResult<Option<String>> {
        Ok(NamedUserRecord::load(self.store.as_ref())?.id)
    }

    /// Current change token.
    pub fn change_token(&self) -> RegSyncResult<Option<String>> {
        Ok(NamedUserRecord::load(self.store.as_ref())?.change_token)
    }

    /// Sets or clears the named user id.
    ///
    /// The id is trimmed and an empty id clears it. Setting the current id
    /// again does nothing.
    pub fn set_id(&self, id: Option<&str>) -> RegSyncResult<()> {
        let id = id.map(str::trim).filter(|id| !id.is_empty());
        if let Some(id) = id {
            if id.chars().count() > MAX_NAMED_USER_ID_LENGTH {
                return Err(RegSyncError::InvalidNamedUser(format!(
                    "id exceeds {} characters",
                    MAX_NAMED_USER_ID_LENGTH
                )));
            }
        }

        {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            let mut record = NamedUserRecord::load(self.store.as_ref())?;
            if record.id.as_deref() == id {
                tracing::debug!("named user unchanged");
                return Ok(());
            }

            record.id = id.map(str::to_string);
            record.change_token = Some(new_token());
            record.save(self.store.as_ref())?;
        }

        tracing::info!(set = id.is_some(), "named user changed");
        self.sink.submit(SyncTask::UpdateNamedUser)?;
        self.sink.submit(SyncTask::ClearPendingTags {
            subject: TagSubject::NamedUser,
        })
    }

    /// Re-sends the current association even if nothing changed.
    pub fn force_update(&self) -> RegSyncResult<()> {
        {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            let mut record = NamedUserRecord::load(self.store.as_ref())?;
            record.change_token = Some(new_token());
            record.save(self.store.as_ref())?;
        }
        self.sink.submit(SyncTask::UpdateNamedUser)
    }
}

/// Gives the identity a new change token when no named user is set, so the
/// next named user update disassociates the channel.
///
/// Returns whether a new token was written.
pub(crate) fn disassociate_if_unset(
    store: &dyn KeyValueStore,
    lock: &Mutex<()>,
) -> Result<bool, SyncError> {
    let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
    let mut record = NamedUserRecord::load(store)?;
    if record.id.is_some() {
        return Ok(false);
    }
    record.change_token = Some(new_token());
    record.save(store)?;
    Ok(true)
}

fn new_token() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tasks::RecordingSink;
    use crate::storage::Storage;

    fn handle() -> (Arc<RecordingSink>, NamedUser) {
        let sink = Arc::new(RecordingSink::default());
        let named_user = NamedUser::new(Arc::new(Storage::in_memory().unwrap()), sink.clone());
        (sink, named_user)
    }

    #[test]
    fn test_set_id_trims_and_schedules() {
        let (sink, named_user) = handle();
        named_user.set_id(Some("  u1 ")).unwrap();

        assert_eq!(named_user.id().unwrap().as_deref(), Some("u1"));
        assert!(named_user.change_token().unwrap().is_some());
        assert_eq!(
            sink.take(),
            vec![
                SyncTask::UpdateNamedUser,
                SyncTask::ClearPendingTags {
                    subject: TagSubject::NamedUser
                }
            ]
        );
    }

    #[test]
    fn test_same_id_keeps_token() {
        let (sink, named_user) = handle();
        named_user.set_id(Some("u1")).unwrap();
        let token = named_user.change_token().unwrap();
        sink.take();

        named_user.set_id(Some("u1")).unwrap();
        assert_eq!(named_user.change_token().unwrap(), token);
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_empty_id_clears() {
        let (_, named_user) = handle();
        named_user.set_id(Some("u1")).unwrap();
        named_user.set_id(Some("   ")).unwrap();
        assert_eq!(named_user.id().unwrap(), None);
    }

    #[test]
    fn test_rejects_long_id() {
        let (sink, named_user) = handle();
        let long = "x".repeat(MAX_NAMED_USER_ID_LENGTH + 1);
        assert!(matches!(
            named_user.set_id(Some(&long)),
            Err(RegSyncError::InvalidNamedUser(_))
        ));
        assert!(sink.take().is_empty());

        let max = "x".repeat(MAX_NAMED_USER_ID_LENGTH);
        named_user.set_id(Some(&max)).unwrap();
    }

    #[test]
    fn test_force_update_changes_token() {
        let (sink, named_user) = handle();
        named_user.set_id(Some("u1")).unwrap();
        let before = named_user.change_token().unwrap();
        sink.take();

        named_user.force_update().unwrap();
        assert_ne!(named_user.change_token().unwrap(), before);
        assert_eq!(sink.take(), vec![SyncTask::UpdateNamedUser]);
    }

    #[test]
    fn test_disassociate_if_unset() {
        let storage = Storage::in_memory().unwrap();
        let lock = Mutex::new(());
        assert!(disassociate_if_unset(&storage, &lock).unwrap());
        assert!(NamedUserRecord::load(&storage).unwrap().change_token.is_some());

        NamedUserRecord {
            id: Some("u1".into()),
            change_token: Some("t".into()),
        }
        .save(&storage)
        .unwrap();
        assert!(!disassociate_if_unset(&storage, &lock).unwrap());
    }
}

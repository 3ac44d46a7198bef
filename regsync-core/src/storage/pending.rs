// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Pending tag group storage operations.

use std::sync::Arc;

use super::{keys, KeyValueStore, KeyValueStoreExt, StorageError};
use crate::sync::tags::{TagGroupDelta, TagGroups, TagSubject};

/// Outstanding tag group mutations per subject.
///
/// Adds and removes are kept under separate keys; an empty side is stored
/// as an absent key.
#[derive(Clone)]
pub struct PendingTagStore {
    store: Arc<dyn KeyValueStore>,
}

impl PendingTagStore {
    /// Creates a pending store backed by `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        PendingTagStore { store }
    }

    /// Loads the pending delta for `subject`.
    pub fn load(&self, subject: TagSubject) -> Result<TagGroupDelta, StorageError> {
        let (add_key, remove_key) = pending_keys(subject);
        let adds: TagGroups = self.store.get_json(add_key)?.unwrap_or_default();
        let removes: TagGroups = self.store.get_json(remove_key)?.unwrap_or_default();
        Ok(TagGroupDelta::from_parts(adds, removes))
    }

    /// Replaces the pending delta for `subject`. Both sides are written in
    /// one batch.
    pub fn save(&self, subject: TagSubject, delta: &TagGroupDelta) -> Result<(), StorageError> {
        let (add_key, remove_key) = pending_keys(subject);
        let adds = encode(&delta.adds)?;
        let removes = encode(&delta.removes)?;
        self.store.write_batch(&[
            (add_key, adds.as_deref()),
            (remove_key, removes.as_deref()),
        ])
    }

    /// Drops everything pending for `subject`.
    pub fn clear(&self, subject: TagSubject) -> Result<(), StorageError> {
        let (add_key, remove_key) = pending_keys(subject);
        self.store.write_batch(&[(add_key, None), (remove_key, None)])
    }
}

fn encode(groups: &TagGroups) -> Result<Option<String>, StorageError> {
    if groups.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(groups)?))
}

/// Returns the (add, remove) keys for a subject.
pub(crate) fn pending_keys(subject: TagSubject) -> (&'static str, &'static str) {
    match subject {
        TagSubject::Channel => (
            keys::PENDING_CHANNEL_ADD_TAG_GROUPS,
            keys::PENDING_CHANNEL_REMOVE_TAG_GROUPS,
        ),
        TagSubject::NamedUser => (
            keys::PENDING_NAMED_USER_ADD_TAG_GROUPS,
            keys::PENDING_NAMED_USER_REMOVE_TAG_GROUPS,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;

    fn pending_store() -> (Arc<Storage>, PendingTagStore) {
        let storage = Arc::new(Storage::in_memory().unwrap());
        let pending = PendingTagStore::new(storage.clone());
        (storage, pending)
    }

    #[test]
    fn test_load_empty() {
        let (_, pending) = pending_store();
        assert!(pending.load(TagSubject::Channel).unwrap().is_empty());
    }

    #[test]
    fn test_save_writes_only_non_empty_sides() {
        let (storage, pending) = pending_store();
        let delta = TagGroupDelta::new().with_add("vip", "gold");
        pending.save(TagSubject::Channel, &delta).unwrap();

        assert_eq!(
            storage
                .get(keys::PENDING_CHANNEL_ADD_TAG_GROUPS)
                .unwrap()
                .as_deref(),
            Some(r#"{"vip":["gold"]}"#)
        );
        assert_eq!(
            storage.get(keys::PENDING_CHANNEL_REMOVE_TAG_GROUPS).unwrap(),
            None
        );
        assert_eq!(pending.load(TagSubject::Channel).unwrap(), delta);
    }

    #[test]
    fn test_save_replaces_both_sides_together() {
        let (storage, pending) = pending_store();
        pending
            .save(
                TagSubject::Channel,
                &TagGroupDelta::new().with_remove("vip", "gold"),
            )
            .unwrap();

        let newer = TagGroupDelta::new().with_add("vip", "gold");
        pending.save(TagSubject::Channel, &newer).unwrap();

        assert_eq!(
            storage.get(keys::PENDING_CHANNEL_REMOVE_TAG_GROUPS).unwrap(),
            None
        );
        assert_eq!(pending.load(TagSubject::Channel).unwrap(), newer);
    }

    #[test]
    fn test_subjects_are_independent() {
        let (_, pending) = pending_store();
        pending
            .save(
                TagSubject::NamedUser,
                &TagGroupDelta::new().with_remove("g", "t"),
            )
            .unwrap();

        assert!(pending.load(TagSubject::Channel).unwrap().is_empty());
        pending.clear(TagSubject::Channel).unwrap();
        assert!(!pending.load(TagSubject::NamedUser).unwrap().is_empty());
    }
}

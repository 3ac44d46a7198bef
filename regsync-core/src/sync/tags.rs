// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tag Group Deltas
//!
//! Outstanding add/remove mutations per tag group, and the rules for folding
//! a newly requested delta into the pending one.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::TagMergePolicy;

/// Tags keyed by tag group name.
pub type TagGroups = BTreeMap<String, BTreeSet<String>>;

/// Which registry entity a tag group mutation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagSubject {
    /// Tags on this device's channel.
    Channel,
    /// Tags on the named user associated with this device.
    NamedUser,
}

impl fmt::Display for TagSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagSubject::Channel => write!(f, "channel"),
            TagSubject::NamedUser => write!(f, "named_user"),
        }
    }
}

/// A set of tag group mutations.
///
/// After any merge a tag never appears in both `adds` and `removes` of the
/// same group, and groups with no tags are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagGroupDelta {
    /// Tags to add, by group.
    #[serde(default)]
    pub adds: TagGroups,
    /// Tags to remove, by group.
    #[serde(default)]
    pub removes: TagGroups,
}

impl TagGroupDelta {
    /// Creates an empty delta.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a delta from explicit add and remove maps.
    pub fn from_parts(adds: TagGroups, removes: TagGroups) -> Self {
        let mut delta = TagGroupDelta { adds, removes };
        delta.resolve_conflicts();
        delta.prune();
        delta
    }

    /// Builder-style add of a single tag.
    pub fn with_add(mut self, group: &str, tag: &str) -> Self {
        insert(&mut self.adds, group, tag);
        self
    }

    /// Builder-style remove of a single tag.
    pub fn with_remove(mut self, group: &str, tag: &str) -> Self {
        insert(&mut self.removes, group, tag);
        self
    }

    /// Returns true if there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.adds.values().all(BTreeSet::is_empty) && self.removes.values().all(BTreeSet::is_empty)
    }

    /// Folds a newer delta into this one.
    ///
    /// A tag requested as both add and remove inside `newer` counts as a
    /// remove. How a newer operation interacts with the opposite pending
    /// operation for the same (group, tag) depends on `policy`.
    pub fn merge(&mut self, newer: &TagGroupDelta, policy: TagMergePolicy) {
        let mut newer = newer.clone();
        newer.resolve_conflicts();

        for (group, tags) in &newer.adds {
            for tag in tags {
                let cancelled = take(&mut self.removes, group, tag);
                if !(cancelled && policy == TagMergePolicy::CancelOpposing) {
                    insert(&mut self.adds, group, tag);
                }
            }
        }

        for (group, tags) in &newer.removes {
            for tag in tags {
                let cancelled = take(&mut self.adds, group, tag);
                if !(cancelled && policy == TagMergePolicy::CancelOpposing) {
                    insert(&mut self.removes, group, tag);
                }
            }
        }

        self.prune();
    }

    /// Returns the merge of `self` and `newer` without modifying either.
    pub fn merged(&self, newer: &TagGroupDelta, policy: TagMergePolicy) -> TagGroupDelta {
        let mut out = self.clone();
        out.merge(newer, policy);
        out
    }

    /// Drops adds that are also requested as removes (remove wins).
    fn resolve_conflicts(&mut self) {
        for (group, removes) in &self.removes {
            if let Some(adds) = self.adds.get_mut(group) {
                adds.retain(|tag| !removes.contains(tag));
            }
        }
    }

    /// Drops groups that have no tags left.
    fn prune(&mut self) {
        self.adds.retain(|_, tags| !tags.is_empty());
        self.removes.retain(|_, tags| !tags.is_empty());
    }
}

fn insert(groups: &mut TagGroups, group: &str, tag: &str) {
    groups
        .entry(group.to_string())
        .or_default()
        .insert(tag.to_string());
}

fn take(groups: &mut TagGroups, group: &str, tag: &str) -> bool {
    groups
        .get_mut(group)
        .map(|tags| tags.remove(tag))
        .unwrap_or(false)
}

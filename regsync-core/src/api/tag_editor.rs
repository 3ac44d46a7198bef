// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tag Groups Editor
//!
//! Collects tag group mutations for one subject and submits them as a single
//! update. Within one editor the later operation on a tag wins.

use std::sync::Arc;

use thiserror::Error;

use super::error::RegSyncResult;
use super::tasks::{SyncTask, TaskSink};
use crate::config::TagMergePolicy;
use crate::sync::{TagGroupDelta, TagSubject};

/// Maximum tag length, in characters.
pub const MAX_TAG_LENGTH: usize = 127;

/// Invalid tag group edits.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagGroupError {
    #[error("tag group name is empty")]
    EmptyGroup,

    #[error("tag in group {group} exceeds {max} characters")]
    TagTooLong { group: String, max: usize },
}

/// Builder for one tag group update.
#[must_use = "call apply() to submit the edits"]
pub struct TagGroupsEditor {
    subject: TagSubject,
    delta: TagGroupDelta,
    error: Option<TagGroupError>,
    sink: Arc<dyn TaskSink>,
}

impl TagGroupsEditor {
    pub fn new(subject: TagSubject, sink: Arc<dyn TaskSink>) -> Self {
        TagGroupsEditor {
            subject,
            delta: TagGroupDelta::new(),
            error: None,
            sink,
        }
    }

    pub fn add_tag(self, group: &str, tag: &str) -> Self {
        self.add_tags(group, [tag])
    }

    pub fn add_tags<'a, I>(mut self, group: &str, tags: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        if let Some(edit) = self.normalize(group, tags, TagGroupDelta::with_add) {
            self.delta.merge(&edit, TagMergePolicy::LastWriteWins);
        }
        self
    }

    pub fn remove_tag(self, group: &str, tag: &str) -> Self {
        self.remove_tags(group, [tag])
    }

    pub fn remove_tags<'a, I>(mut self, group: &str, tags: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        if let Some(edit) = self.normalize(group, tags, TagGroupDelta::with_remove) {
            self.delta.merge(&edit, TagMergePolicy::LastWriteWins);
        }
        self
    }

    /// The edits collected so far.
    pub fn delta(&self) -> &TagGroupDelta {
        &self.delta
    }

    /// Submits the edits. Fails on the first invalid edit; an editor with
    /// nothing in it submits nothing.
    pub fn apply(self) -> RegSyncResult<()> {
        if let Some(error) = self.error {
            return Err(error.into());
        }
        if self.delta.is_empty() {
            tracing::debug!(subject = %self.subject, "no tag group edits to apply");
            return Ok(());
        }

        self.sink.submit(SyncTask::UpdateTagGroups {
            subject: self.subject,
            delta: self.delta,
        })
    }

    fn normalize<'a, I>(
        &mut self,
        group: &str,
        tags: I,
        op: fn(TagGroupDelta, &str, &str) -> TagGroupDelta,
    ) -> Option<TagGroupDelta>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let group = group.trim();
        if group.is_empty() {
            self.fail(TagGroupError::EmptyGroup);
            return None;
        }

        let mut edit = TagGroupDelta::new();
        for tag in tags.into_iter().map(str::trim).filter(|t| !t.is_empty()) {
            if tag.chars().count() > MAX_TAG_LENGTH {
                self.fail(TagGroupError::TagTooLong {
                    group: group.to_string(),
                    max: MAX_TAG_LENGTH,
                });
                return None;
            }
            edit = op(edit, group, tag);
        }
        Some(edit)
    }

    fn fail(&mut self, error: TagGroupError) {
        tracing::error!(%error, "invalid tag group edit");
        self.error.get_or_insert(error);
    }
}

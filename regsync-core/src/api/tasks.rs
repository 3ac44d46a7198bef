// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sync Tasks
//!
//! One typed task per synchronization request. Every task belongs to exactly
//! one subsystem, and each subsystem processes its tasks in order.

use std::fmt;
use std::time::Duration;

use super::error::RegSyncResult;
use crate::payload::ChannelRegistrationPayload;
use crate::sync::{TagGroupDelta, TagSubject};

/// Worker lane a task runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Channel,
    NamedUser,
    TagGroups,
}

impl Subsystem {
    pub const ALL: [Subsystem; 3] = [Subsystem::Channel, Subsystem::NamedUser, Subsystem::TagGroups];

    pub fn name(&self) -> &'static str {
        match self {
            Subsystem::Channel => "channel",
            Subsystem::NamedUser => "named-user",
            Subsystem::TagGroups => "tag-groups",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A synchronization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTask {
    /// Initial registration; runs at most once per process.
    StartRegistration { payload: ChannelRegistrationPayload },

    /// Push token registration completed; unblocks channel updates.
    PushRegistrationFinished { payload: ChannelRegistrationPayload },

    /// Create or update the channel with `payload`.
    UpdateChannel { payload: ChannelRegistrationPayload },

    /// Push the current named user association.
    UpdateNamedUser,

    /// Merge `delta` into the pending tag groups of `subject` and send them.
    UpdateTagGroups {
        subject: TagSubject,
        delta: TagGroupDelta,
    },

    /// Drop pending tag groups of `subject`.
    ClearPendingTags { subject: TagSubject },
}

impl SyncTask {
    pub fn subsystem(&self) -> Subsystem {
        match self {
            SyncTask::StartRegistration { .. }
            | SyncTask::PushRegistrationFinished { .. }
            | SyncTask::UpdateChannel { .. } => Subsystem::Channel,
            SyncTask::UpdateNamedUser => Subsystem::NamedUser,
            SyncTask::UpdateTagGroups { .. } | SyncTask::ClearPendingTags { .. } => {
                Subsystem::TagGroups
            }
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncTask::StartRegistration { .. } => "start_registration",
            SyncTask::PushRegistrationFinished { .. } => "push_registration_finished",
            SyncTask::UpdateChannel { .. } => "update_channel",
            SyncTask::UpdateNamedUser => "update_named_user",
            SyncTask::UpdateTagGroups { .. } => "update_tag_groups",
            SyncTask::ClearPendingTags { .. } => "clear_pending_tags",
        }
    }

    /// Flushes pending tag groups of `subject` without adding anything.
    pub fn flush_tag_groups(subject: TagSubject) -> Self {
        SyncTask::UpdateTagGroups {
            subject,
            delta: TagGroupDelta::new(),
        }
    }
}

/// Work produced by handling a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUp {
    pub task: SyncTask,
    /// Retry count; 0 for fresh work.
    pub attempt: u32,
    /// How long to wait before submitting.
    pub delay: Duration,
}

impl FollowUp {
    /// Fresh work to run right away.
    pub fn now(task: SyncTask) -> Self {
        FollowUp {
            task,
            attempt: 0,
            delay: Duration::ZERO,
        }
    }
}

/// Accepts tasks for asynchronous processing.
pub trait TaskSink: Send + Sync {
    /// Enqueues `task` on its subsystem's lane.
    fn submit(&self, task: SyncTask) -> RegSyncResult<()>;
}

/// Sink that only records submitted tasks.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub tasks: std::sync::Mutex<Vec<SyncTask>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn take(&self) -> Vec<SyncTask> {
        std::mem::take(&mut *self.tasks.lock().unwrap())
    }
}

#[cfg(test)]
impl TaskSink for RecordingSink {
    fn submit(&self, task: SyncTask) -> RegSyncResult<()> {
        self.tasks.lock().unwrap().push(task);
        Ok(())
    }
}

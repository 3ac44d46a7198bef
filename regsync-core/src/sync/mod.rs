// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Registration Reconciliation Module
//!
//! Keeps this device's registry state (channel, named user association and
//! tag groups) consistent with local state. Each reconciler runs one attempt
//! at a time, reads everything it needs from the key/value store, and
//! reports an outcome value instead of an error.

pub mod channel;
pub mod named_user;
pub mod state;
pub mod tag_groups;
pub mod tags;

pub use channel::{ChannelOutcome, ChannelReconciler};
pub use named_user::{NamedUserOutcome, NamedUserReconciler};
pub use state::{ChannelRecord, LastRegistration, NamedUserRecord, SyncError};
pub use tag_groups::{TagGroupOutcome, TagGroupReconciler};
pub use tags::{TagGroupDelta, TagGroups, TagSubject};

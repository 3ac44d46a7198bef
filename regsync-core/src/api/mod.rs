// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Registration Sync API Layer
//!
//! High-level API for keeping a device's registry entry in sync.
//!
//! # Overview
//!
//! The API layer coordinates:
//! - Channel registration (start workflow, push registration gating)
//! - Named user association
//! - Tag group edits
//! - Per-subsystem task dispatch and retries
//! - Event handling
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use regsync_core::api::{CallbackHandler, Registrar};
//! use regsync_core::registry::MockRegistryClient;
//! use regsync_core::ChannelRegistrationPayload;
//!
//! let registrar = Registrar::builder()
//!     .storage_path("regsync.db")
//!     .client(Arc::new(MockRegistryClient::new()))
//!     .build()?;
//!
//! registrar.add_event_handler(Arc::new(CallbackHandler::new(|event| {
//!     println!("{:?}", event);
//! })));
//!
//! registrar.start_registration(ChannelRegistrationPayload::new("android").with_opt_in(true))?;
//! registrar.named_user().set_id(Some("user-1"))?;
//! registrar
//!     .edit_channel_tag_groups()
//!     .add_tag("loyalty", "gold")
//!     .apply()?;
//! ```
//!
//! # Module Structure
//!
//! - [`error`] - Error types for the API layer
//! - [`events`] - Event system for callbacks
//! - [`tasks`] - Typed sync requests
//! - [`engine`] - Single-task executor
//! - [`dispatcher`] - Per-subsystem workers
//! - [`named_user`] - Named user handle
//! - [`tag_editor`] - Tag group edits
//! - [`registrar`] - Main entry point

pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod events;
pub mod named_user;
pub mod registrar;
pub mod tag_editor;
pub mod tasks;

// Error types
pub use error::{RegSyncError, RegSyncResult};

// Events
pub use events::{CallbackHandler, EventDispatcher, EventHandler, SyncEvent};

// Dispatch
pub use dispatcher::{Dispatcher, TaskQueue};
pub use engine::{RegistrationGate, SyncEngine};
pub use tasks::{FollowUp, Subsystem, SyncTask, TaskSink};

// Handles
pub use named_user::{NamedUser, NamedUserLock, MAX_NAMED_USER_ID_LENGTH};
pub use tag_editor::{TagGroupError, TagGroupsEditor, MAX_TAG_LENGTH};

// Registrar
pub use registrar::{Registrar, RegistrarBuilder};

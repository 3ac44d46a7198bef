// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Error Types
//!
//! Unified error type for the registration sync API layer.

use thiserror::Error;

use super::tag_editor::TagGroupError;
use crate::registry::RegistryError;
use crate::storage::StorageError;
use crate::sync::SyncError;

/// Unified error type for registration sync operations.
#[derive(Error, Debug)]
pub enum RegSyncError {
    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Reading or writing reconciliation state failed.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Registry client could not be constructed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Tag group edit was invalid.
    #[error("tag group error: {0}")]
    TagGroup(#[from] TagGroupError),

    /// Named user id was invalid.
    #[error("invalid named user: {0}")]
    InvalidNamedUser(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A worker thread could not be started.
    #[error("worker error: {0}")]
    Worker(String),

    /// The dispatcher no longer accepts work.
    #[error("dispatcher is shut down")]
    ShutDown,
}

/// Result type for registration sync operations.
pub type RegSyncResult<T> = Result<T, RegSyncError>;

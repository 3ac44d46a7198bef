//! Regsync Core Library
//!
//! Client-side registration sync: keeps a device's channel, named user
//! association and tag groups consistent with a remote registry across
//! flaky networks and restarts, without redundant registry calls and
//! without losing unacknowledged local changes.

pub mod api;
pub mod clock;
pub mod config;
pub mod payload;
pub mod registry;
pub mod storage;
pub mod sync;

pub use api::{
    CallbackHandler, EventHandler, NamedUser, RegSyncError, RegSyncResult, Registrar,
    RegistrarBuilder, SyncEngine, SyncEvent, SyncTask, TagGroupsEditor,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DeviceType, RetryPolicy, SyncConfig, TagMergePolicy};
pub use payload::{AttributeValue, ChannelRegistrationPayload};
#[cfg(feature = "http-client")]
pub use registry::HttpRegistryClient;
pub use registry::{
    MockRegistryClient, RegistryClient, RegistryError, RegistryResponse, StatusClass,
};
pub use storage::{KeyValueStore, KeyValueStoreExt, PendingTagStore, Storage, StorageError};
pub use sync::{
    ChannelOutcome, ChannelReconciler, NamedUserOutcome, NamedUserReconciler, SyncError,
    TagGroupDelta, TagGroupOutcome, TagGroupReconciler, TagGroups, TagSubject,
};

//! Persisted state keys.
//!
//! Each key is owned by exactly one reconciler (or, for the named user
//! identity, by the application-facing handle).

/// Channel id assigned by the registry.
pub const CHANNEL_ID: &str = "regsync.channel.ID";

/// Channel location URL returned by the registry on create.
pub const CHANNEL_LOCATION: &str = "regsync.channel.LOCATION";

/// Last successfully applied registration payload.
pub const LAST_REGISTRATION_PAYLOAD: &str = "regsync.channel.LAST_REGISTRATION_PAYLOAD";

/// Time (ms since epoch) of the last successfully applied registration.
pub const LAST_REGISTRATION_TIME: &str = "regsync.channel.LAST_REGISTRATION_TIME";

/// Current named user id, written by the application.
pub const NAMED_USER_ID: &str = "regsync.named_user.ID";

/// Change token regenerated whenever the named user id changes.
pub const NAMED_USER_CHANGE_TOKEN: &str = "regsync.named_user.CHANGE_TOKEN";

/// Change token of the last named user update the registry accepted.
pub const NAMED_USER_LAST_APPLIED_TOKEN: &str = "regsync.named_user.LAST_UPDATED_TOKEN";

/// Pending channel tag group adds.
pub const PENDING_CHANNEL_ADD_TAG_GROUPS: &str = "regsync.tag_groups.PENDING_CHANNEL_ADD";

/// Pending channel tag group removes.
pub const PENDING_CHANNEL_REMOVE_TAG_GROUPS: &str = "regsync.tag_groups.PENDING_CHANNEL_REMOVE";

/// Pending named user tag group adds.
pub const PENDING_NAMED_USER_ADD_TAG_GROUPS: &str = "regsync.tag_groups.PENDING_NAMED_USER_ADD";

/// Pending named user tag group removes.
pub const PENDING_NAMED_USER_REMOVE_TAG_GROUPS: &str =
    "regsync.tag_groups.PENDING_NAMED_USER_REMOVE";

// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration for registration sync

use std::time::Duration;

/// Platform the channel registers as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceType {
    #[default]
    Android,
    Amazon,
}

impl DeviceType {
    /// Device type string used by the registry.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Android => "android",
            DeviceType::Amazon => "amazon",
        }
    }

    /// Audience selector for channel tag requests.
    pub fn channel_audience_key(&self) -> &'static str {
        match self {
            DeviceType::Android => "android_channel",
            DeviceType::Amazon => "amazon_channel",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "android" => Some(DeviceType::Android),
            "amazon" => Some(DeviceType::Amazon),
            _ => None,
        }
    }
}

/// How a newly requested tag operation interacts with the opposite pending
/// operation for the same (group, tag) pair.
///
/// Both policies guarantee that a pair is never pending as add and remove at
/// once, and that an empty merged delta makes no registry call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagMergePolicy {
    /// The newer operation replaces the opposite pending one, so only the
    /// latest request for a pair is ever sent. A pending add followed by a
    /// remove sends the remove.
    #[default]
    LastWriteWins,
    /// The newer operation and the opposite pending one annihilate. A
    /// pending add followed by a remove sends nothing and clears the pending
    /// state.
    CancelOpposing,
}

/// Backoff applied when re-submitting retryable work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(5120),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): base * 2^(attempt-1), capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exponent);
        delay.min(self.max_delay)
    }
}

/// Configuration for the registration sync engine
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Registry base URL
    pub registry_url: String,

    /// Application key (basic auth user)
    pub app_key: String,

    /// Application secret (basic auth password)
    pub app_secret: String,

    /// Platform this channel registers as
    pub device_type: DeviceType,

    /// HTTP timeout for registry requests
    pub request_timeout: Duration,

    /// Maximum time an unchanged payload may go without re-registering
    pub reregistration_interval: Duration,

    /// Disassociate the named user when a reinstall finds an existing channel
    /// and no named user is set locally
    pub clear_named_user_on_reinstall: bool,

    /// Initial state of the channel creation pause
    pub channel_creation_delay_enabled: bool,

    /// Wait for a push token before the first channel registration
    pub push_registration_required: bool,

    /// Pending tag merge behavior
    pub tag_merge_policy: TagMergePolicy,

    /// Backoff for retryable failures
    pub retry: RetryPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            registry_url: "https://device-api.urbanairship.com/".to_string(),
            app_key: String::new(),
            app_secret: String::new(),
            device_type: DeviceType::Android,
            request_timeout: Duration::from_secs(30),
            reregistration_interval: Duration::from_secs(24 * 60 * 60), // 24 hours
            clear_named_user_on_reinstall: false,
            channel_creation_delay_enabled: false,
            push_registration_required: false,
            tag_merge_policy: TagMergePolicy::LastWriteWins,
            retry: RetryPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Loads configuration from `REGSYNC_*` environment variables.
    ///
    /// Unset variables keep their defaults; unparsable ones are logged and
    /// ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("REGSYNC_REGISTRY_URL") {
            config = config.with_registry_url(&url);
        }
        if let Some(key) = lookup("REGSYNC_APP_KEY") {
            config.app_key = key;
        }
        if let Some(secret) = lookup("REGSYNC_APP_SECRET") {
            config.app_secret = secret;
        }
        if let Some(raw) = lookup("REGSYNC_DEVICE_TYPE") {
            match DeviceType::parse(&raw) {
                Some(device_type) => config.device_type = device_type,
                None => tracing::warn!(
                    value = %raw,
                    "ignoring unknown REGSYNC_DEVICE_TYPE"
                ),
            }
        }
        if let Some(raw) = lookup("REGSYNC_CLEAR_NAMED_USER_ON_REINSTALL") {
            match raw.trim().parse::<bool>() {
                Ok(clear) => config.clear_named_user_on_reinstall = clear,
                Err(_) => tracing::warn!(
                    value = %raw,
                    "ignoring invalid REGSYNC_CLEAR_NAMED_USER_ON_REINSTALL, expected true or false"
                ),
            }
        }

        config
    }

    /// Configure application credentials
    pub fn with_credentials(mut self, app_key: &str, app_secret: &str) -> Self {
        self.app_key = app_key.to_string();
        self.app_secret = app_secret.to_string();
        self
    }

    /// Configure a custom registry URL. Endpoint paths are resolved below
    /// it, so a path prefix is kept.
    pub fn with_registry_url(mut self, url: &str) -> Self {
        let url = url.trim();
        self.registry_url = if url.ends_with('/') {
            url.to_string()
        } else {
            format!("{}/", url)
        };
        self
    }

    /// Configure the device type
    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    /// Clear the named user on reinstall when none is set locally
    pub fn with_clear_named_user_on_reinstall(mut self) -> Self {
        self.clear_named_user_on_reinstall = true;
        self
    }

    /// Pause channel creation until explicitly enabled
    pub fn with_channel_creation_delay(mut self) -> Self {
        self.channel_creation_delay_enabled = true;
        self
    }

    /// Wait for a push token before the first channel registration
    pub fn with_push_registration(mut self) -> Self {
        self.push_registration_required = true;
        self
    }

    /// Configure the pending tag merge policy
    pub fn with_tag_merge_policy(mut self, policy: TagMergePolicy) -> Self {
        self.tag_merge_policy = policy;
        self
    }

    /// Configure the retry backoff
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

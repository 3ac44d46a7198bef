// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Common Test Utilities
//!
//! Shared harness wiring an in-memory store, a scripted registry and a
//! manual clock into the reconcilers.

#![allow(dead_code)]

pub mod strategies;

use std::sync::Arc;
use std::time::Duration;

use regsync_core::storage::keys;
use regsync_core::{
    ChannelReconciler, ChannelRegistrationPayload, KeyValueStore, ManualClock,
    MockRegistryClient, NamedUserReconciler, Storage, SyncConfig, SyncEngine, TagGroupReconciler,
    TagMergePolicy,
};

pub const HOUR_MS: u64 = 60 * 60 * 1000;

/// Installs a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Store, registry and clock shared by the components under test.
pub struct Harness {
    pub storage: Arc<Storage>,
    pub mock: Arc<MockRegistryClient>,
    pub clock: ManualClock,
    pub config: SyncConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        init_tracing();
        Harness {
            storage: Arc::new(Storage::in_memory().unwrap()),
            mock: Arc::new(MockRegistryClient::new()),
            clock: ManualClock::default(),
            config,
        }
    }

    pub fn channel(&self) -> ChannelReconciler {
        ChannelReconciler::new(
            self.storage.clone(),
            self.mock.clone(),
            Arc::new(self.clock.clone()),
            &self.config,
        )
    }

    pub fn named_user(&self) -> NamedUserReconciler {
        NamedUserReconciler::new(self.storage.clone(), self.mock.clone())
    }

    pub fn tag_groups(&self, policy: TagMergePolicy) -> TagGroupReconciler {
        TagGroupReconciler::new(self.storage.clone(), self.mock.clone(), policy)
    }

    pub fn engine(&self) -> SyncEngine {
        SyncEngine::new(
            self.storage.clone(),
            self.mock.clone(),
            Arc::new(self.clock.clone()),
            self.config.clone(),
        )
    }

    /// Stores a channel record as if a create had succeeded earlier.
    pub fn register_channel(&self, channel_id: &str) {
        self.storage.put(keys::CHANNEL_ID, channel_id).unwrap();
        self.storage
            .put(
                keys::CHANNEL_LOCATION,
                &format!("https://registry.test/api/channels/{}", channel_id),
            )
            .unwrap();
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by.as_millis() as u64);
    }
}

pub fn payload() -> ChannelRegistrationPayload {
    ChannelRegistrationPayload::new("android")
        .with_opt_in(true)
        .with_push_address("push-token")
        .with_timezone("Europe/Zurich")
}

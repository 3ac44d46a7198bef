// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Registrar
//!
//! Application-facing entry point. Wires storage, registry client and clock
//! into a [`SyncEngine`], runs it on a [`Dispatcher`], and exposes the
//! operations a host application calls.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use super::dispatcher::Dispatcher;
use super::engine::SyncEngine;
use super::error::RegSyncResult;
use super::events::EventHandler;
use super::named_user::NamedUser;
use super::tag_editor::TagGroupsEditor;
use super::tasks::{SyncTask, TaskSink};
use crate::clock::{Clock, SystemClock};
use crate::config::SyncConfig;
use crate::payload::ChannelRegistrationPayload;
use crate::registry::RegistryClient;
use crate::storage::{KeyValueStore, Storage};
use crate::sync::{ChannelRecord, TagGroupDelta, TagSubject};

/// Registration sync for one device.
pub struct Registrar {
    engine: Arc<SyncEngine>,
    dispatcher: Dispatcher,
    store: Arc<dyn KeyValueStore>,
    sink: Arc<dyn TaskSink>,
    named_user: NamedUser,
    current_payload: Mutex<Option<ChannelRegistrationPayload>>,
}

impl Registrar {
    /// Starts a builder with default configuration.
    pub fn builder() -> RegistrarBuilder {
        RegistrarBuilder::new()
    }

    /// Starts the registration workflow. Only the first call per process
    /// has any effect.
    pub fn start_registration(&self, payload: ChannelRegistrationPayload) -> RegSyncResult<()> {
        self.remember(&payload);
        self.sink.submit(SyncTask::StartRegistration { payload })
    }

    /// Requests a channel create or update with `payload`.
    pub fn update_registration(&self, payload: ChannelRegistrationPayload) -> RegSyncResult<()> {
        self.remember(&payload);
        self.sink.submit(SyncTask::UpdateChannel { payload })
    }

    /// Reports that push token registration completed.
    pub fn push_registration_finished(
        &self,
        payload: ChannelRegistrationPayload,
    ) -> RegSyncResult<()> {
        self.remember(&payload);
        self.sink
            .submit(SyncTask::PushRegistrationFinished { payload })
    }

    /// Lifts the channel creation pause and re-registers with the latest
    /// payload, if one was ever given.
    pub fn enable_channel_creation(&self) -> RegSyncResult<()> {
        self.engine.channel().set_creation_paused(false);
        tracing::info!("channel creation enabled");

        let payload = self
            .current_payload
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match payload {
            Some(payload) => self.sink.submit(SyncTask::UpdateChannel { payload }),
            None => Ok(()),
        }
    }

    /// Channel id, once the channel was created.
    pub fn channel_id(&self) -> RegSyncResult<Option<String>> {
        Ok(ChannelRecord::channel_id(self.store.as_ref())?)
    }

    pub fn named_user(&self) -> &NamedUser {
        &self.named_user
    }

    /// Starts a tag group edit for this channel.
    pub fn edit_channel_tag_groups(&self) -> TagGroupsEditor {
        TagGroupsEditor::new(TagSubject::Channel, self.sink.clone())
    }

    /// Starts a tag group edit for the named user.
    pub fn edit_named_user_tag_groups(&self) -> TagGroupsEditor {
        TagGroupsEditor::new(TagSubject::NamedUser, self.sink.clone())
    }

    /// Tag group mutations not yet confirmed by the registry.
    pub fn pending_tag_groups(&self, subject: TagSubject) -> RegSyncResult<TagGroupDelta> {
        Ok(self.engine.tag_groups().pending(subject)?)
    }

    /// Adds a handler for sync events.
    pub fn add_event_handler(&self, handler: Arc<dyn EventHandler>) {
        self.engine.add_event_handler(handler);
    }

    /// Finishes queued work and stops the workers.
    pub fn shutdown(mut self) {
        self.dispatcher.shutdown();
    }

    fn remember(&self, payload: &ChannelRegistrationPayload) {
        *self
            .current_payload
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(payload.clone());
    }
}

/// Builder for creating Registrar instances.
pub struct RegistrarBuilder {
    config: SyncConfig,
    storage_path: Option<PathBuf>,
    store: Option<Arc<dyn KeyValueStore>>,
    client: Option<Arc<dyn RegistryClient>>,
    clock: Option<Arc<dyn Clock>>,
}

impl RegistrarBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        RegistrarBuilder {
            config: SyncConfig::default(),
            storage_path: None,
            store: None,
            client: None,
            clock: None,
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Persists state in a SQLite database at `path`.
    pub fn storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Uses an existing key/value store.
    pub fn storage(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the registry client.
    pub fn client(mut self, client: Arc<dyn RegistryClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets the time source.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the Registrar and starts its workers.
    ///
    /// Without an explicit store, state lives in `storage_path` or, failing
    /// that, in memory.
    pub fn build(self) -> RegSyncResult<Registrar> {
        let store: Arc<dyn KeyValueStore> = match (self.store, self.storage_path) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(Storage::open(path)?),
            (None, None) => Arc::new(Storage::in_memory()?),
        };

        let client = match self.client {
            Some(client) => client,
            None => default_client(&self.config)?,
        };
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let engine = Arc::new(SyncEngine::new(
            store.clone(),
            client,
            clock,
            self.config,
        ));
        let dispatcher = Dispatcher::start(engine.clone())?;
        let sink: Arc<dyn TaskSink> = Arc::new(dispatcher.queue());

        Ok(Registrar {
            named_user: NamedUser::with_lock(store.clone(), sink.clone(), engine.named_user_lock()),
            engine,
            dispatcher,
            store,
            sink,
            current_payload: Mutex::new(None),
        })
    }
}

impl Default for RegistrarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "http-client")]
fn default_client(config: &SyncConfig) -> RegSyncResult<Arc<dyn RegistryClient>> {
    Ok(Arc::new(crate::registry::HttpRegistryClient::new(config)?))
}

#[cfg(not(feature = "http-client"))]
fn default_client(_config: &SyncConfig) -> RegSyncResult<Arc<dyn RegistryClient>> {
    Err(super::error::RegSyncError::Configuration(
        "no registry client configured".to_string(),
    ))
}

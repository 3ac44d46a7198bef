//! Event System
//!
//! Sync outcomes broadcast to the host application.

use std::sync::Arc;

use crate::sync::TagSubject;

/// Events emitted after a registry request completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A channel create or update finished.
    ChannelUpdated {
        /// Channel id, when one is known.
        channel_id: Option<String>,
        /// Whether the request was a create.
        is_create_request: bool,
        /// Whether the registry accepted it.
        succeeded: bool,
    },

    /// A named user association or disassociation finished.
    NamedUserUpdated {
        /// Whether the registry accepted it.
        succeeded: bool,
    },

    /// A tag group update finished.
    TagGroupsUpdated {
        /// Which entity the tags belong to.
        subject: TagSubject,
        /// Whether the registry accepted it.
        succeeded: bool,
    },
}

/// Event handler trait.
///
/// Handlers run on the worker thread that produced the event.
pub trait EventHandler: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: SyncEvent);
}

/// Simple callback-based event handler.
pub struct CallbackHandler<F>
where
    F: Fn(SyncEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: Fn(SyncEvent) + Send + Sync,
{
    /// Creates a new callback handler.
    pub fn new(callback: F) -> Self {
        CallbackHandler { callback }
    }
}

impl<F> EventHandler for CallbackHandler<F>
where
    F: Fn(SyncEvent) + Send + Sync,
{
    fn on_event(&self, event: SyncEvent) {
        (self.callback)(event);
    }
}

/// Event dispatcher for managing multiple handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    pub fn new() -> Self {
        EventDispatcher {
            handlers: Vec::new(),
        }
    }

    /// Adds an event handler.
    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// Removes all handlers.
    pub fn clear_handlers(&mut self) {
        self.handlers.clear();
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Dispatches an event to all handlers.
    pub fn dispatch(&self, event: SyncEvent) {
        tracing::debug!(?event, handlers = self.handlers.len(), "dispatching sync event");
        for handler in &self.handlers {
            handler.on_event(event.clone());
        }
    }
}

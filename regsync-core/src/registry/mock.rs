// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mock Registry Client
//!
//! Records every call and answers from per-operation response queues.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use url::Url;

use super::{RegistryClient, RegistryResponse};
use crate::payload::ChannelRegistrationPayload;
use crate::sync::tags::{TagGroups, TagSubject};

/// Registry operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryOp {
    CreateChannel,
    UpdateChannel,
    AssociateNamedUser,
    DisassociateNamedUser,
    UpdateTagGroups,
}

/// A recorded registry call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    CreateChannel {
        payload: ChannelRegistrationPayload,
    },
    UpdateChannel {
        location: String,
        payload: ChannelRegistrationPayload,
    },
    AssociateNamedUser {
        named_user_id: String,
        channel_id: String,
    },
    DisassociateNamedUser {
        channel_id: String,
    },
    UpdateTagGroups {
        subject: TagSubject,
        subject_id: String,
        adds: TagGroups,
        removes: TagGroups,
    },
}

impl RegistryCall {
    /// The operation this call invoked.
    pub fn op(&self) -> RegistryOp {
        match self {
            RegistryCall::CreateChannel { .. } => RegistryOp::CreateChannel,
            RegistryCall::UpdateChannel { .. } => RegistryOp::UpdateChannel,
            RegistryCall::AssociateNamedUser { .. } => RegistryOp::AssociateNamedUser,
            RegistryCall::DisassociateNamedUser { .. } => RegistryOp::DisassociateNamedUser,
            RegistryCall::UpdateTagGroups { .. } => RegistryOp::UpdateTagGroups,
        }
    }
}

type CallHook = Box<dyn Fn(&RegistryCall) + Send + Sync>;

/// Mock registry for testing.
///
/// Unscripted calls succeed: creates answer 201 with channel id
/// `mock-channel`, everything else answers 200.
#[derive(Default)]
pub struct MockRegistryClient {
    calls: Mutex<Vec<RegistryCall>>,
    responses: Mutex<HashMap<RegistryOp, VecDeque<RegistryResponse>>>,
    hook: Mutex<Option<CallHook>>,
}

impl MockRegistryClient {
    /// Creates a mock with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for the next call of `op`.
    pub fn push_response(&self, op: RegistryOp, response: RegistryResponse) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.entry(op).or_default().push_back(response);
        }
    }

    /// Runs `hook` while each call is in flight, after it is recorded and
    /// before its response is returned.
    pub fn set_call_hook<F>(&self, hook: F)
    where
        F: Fn(&RegistryCall) + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.hook.lock() {
            *slot = Some(Box::new(hook));
        }
    }

    /// Returns all recorded calls in order.
    pub fn calls(&self) -> Vec<RegistryCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Returns the number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Returns the number of recorded calls of `op`.
    pub fn count_of(&self, op: RegistryOp) -> usize {
        self.calls
            .lock()
            .map(|c| c.iter().filter(|call| call.op() == op).count())
            .unwrap_or(0)
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    fn respond(&self, call: RegistryCall) -> RegistryResponse {
        let op = call.op();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.clone());
        }

        if let Ok(hook) = self.hook.lock() {
            if let Some(hook) = hook.as_ref() {
                hook(&call);
            }
        }

        let scripted = self
            .responses
            .lock()
            .ok()
            .and_then(|mut r| r.get_mut(&op).and_then(VecDeque::pop_front));

        scripted.unwrap_or_else(|| match op {
            RegistryOp::CreateChannel => RegistryResponse::created(
                201,
                "mock-channel",
                "https://registry.invalid/api/channels/mock-channel",
            ),
            _ => RegistryResponse::with_status(200),
        })
    }
}

impl RegistryClient for MockRegistryClient {
    fn create_channel(&self, payload: &ChannelRegistrationPayload) -> RegistryResponse {
        self.respond(RegistryCall::CreateChannel {
            payload: payload.clone(),
        })
    }

    fn update_channel(
        &self,
        location: &Url,
        payload: &ChannelRegistrationPayload,
    ) -> RegistryResponse {
        self.respond(RegistryCall::UpdateChannel {
            location: location.to_string(),
            payload: payload.clone(),
        })
    }

    fn associate_named_user(&self, named_user_id: &str, channel_id: &str) -> RegistryResponse {
        self.respond(RegistryCall::AssociateNamedUser {
            named_user_id: named_user_id.to_string(),
            channel_id: channel_id.to_string(),
        })
    }

    fn disassociate_named_user(&self, channel_id: &str) -> RegistryResponse {
        self.respond(RegistryCall::DisassociateNamedUser {
            channel_id: channel_id.to_string(),
        })
    }

    fn update_tag_groups(
        &self,
        subject: TagSubject,
        subject_id: &str,
        adds: &TagGroups,
        removes: &TagGroups,
    ) -> RegistryResponse {
        self.respond(RegistryCall::UpdateTagGroups {
            subject,
            subject_id: subject_id.to_string(),
            adds: adds.clone(),
            removes: removes.clone(),
        })
    }
}

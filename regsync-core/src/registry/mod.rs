// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Registry Client
//!
//! Narrow request/response contract for the remote registry. Reconcilers
//! only ever look at the [`StatusClass`] of a response, plus the create
//! response's channel id and location.
//!
//! # Architecture
//!
//! - **RegistryClient trait**: typed operations, one per registry endpoint
//! - **MockRegistryClient**: scripted responses and call recording for tests
//! - **HttpRegistryClient**: blocking HTTP implementation (`http-client` feature)

#[cfg(feature = "http-client")]
mod http;
pub mod mock;

#[cfg(feature = "http-client")]
pub use http::HttpRegistryClient;
pub use mock::{MockRegistryClient, RegistryCall, RegistryOp};

use thiserror::Error;
use url::Url;

use crate::payload::ChannelRegistrationPayload;
use crate::sync::tags::{TagGroups, TagSubject};

/// Errors constructing a registry client.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// HTTP client could not be built.
    #[cfg(feature = "http-client")]
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configured registry URL is unusable.
    #[error("Invalid registry URL: {0}")]
    InvalidUrl(String),
}

/// Coarse classification of a registry response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx.
    Success,
    /// 409.
    Conflict,
    /// Any other non-5xx status.
    ClientError,
    /// 5xx.
    ServerError,
    /// No response at all (status 0 included).
    TransportFailure,
}

impl StatusClass {
    /// Whether the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StatusClass::ServerError | StatusClass::TransportFailure)
    }
}

/// Response from a registry call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryResponse {
    /// HTTP status, or `None` when no response arrived.
    pub status: Option<u16>,
    /// Channel id parsed from a create response body.
    pub channel_id: Option<String>,
    /// Location header of a create response.
    pub channel_location: Option<String>,
}

impl RegistryResponse {
    /// A response carrying only a status.
    pub fn with_status(status: u16) -> Self {
        RegistryResponse {
            status: Some(status),
            ..Default::default()
        }
    }

    /// The request never got a response.
    pub fn no_response() -> Self {
        RegistryResponse::default()
    }

    /// A channel create response.
    pub fn created(status: u16, channel_id: &str, channel_location: &str) -> Self {
        RegistryResponse {
            status: Some(status),
            channel_id: Some(channel_id.to_string()),
            channel_location: Some(channel_location.to_string()),
        }
    }

    /// Classifies the status.
    pub fn status_class(&self) -> StatusClass {
        match self.status {
            None | Some(0) => StatusClass::TransportFailure,
            Some(200..=299) => StatusClass::Success,
            Some(409) => StatusClass::Conflict,
            Some(500..=599) => StatusClass::ServerError,
            Some(_) => StatusClass::ClientError,
        }
    }
}

/// Typed operations against the remote registry.
///
/// Implementations block until the registry answers or the request fails;
/// a failed request is reported as [`RegistryResponse::no_response`].
pub trait RegistryClient: Send + Sync {
    /// Creates a channel for this device.
    fn create_channel(&self, payload: &ChannelRegistrationPayload) -> RegistryResponse;

    /// Updates the channel at `location`.
    fn update_channel(&self, location: &Url, payload: &ChannelRegistrationPayload)
        -> RegistryResponse;

    /// Associates `channel_id` with the named user.
    fn associate_named_user(&self, named_user_id: &str, channel_id: &str) -> RegistryResponse;

    /// Removes any named user association from `channel_id`.
    fn disassociate_named_user(&self, channel_id: &str) -> RegistryResponse;

    /// Applies tag group mutations to a channel or named user.
    fn update_tag_groups(
        &self,
        subject: TagSubject,
        subject_id: &str,
        adds: &TagGroups,
        removes: &TagGroups,
    ) -> RegistryResponse;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        assert_eq!(
            RegistryResponse::no_response().status_class(),
            StatusClass::TransportFailure
        );
        assert_eq!(
            RegistryResponse::with_status(0).status_class(),
            StatusClass::TransportFailure
        );
        assert_eq!(
            RegistryResponse::with_status(201).status_class(),
            StatusClass::Success
        );
        assert_eq!(
            RegistryResponse::with_status(409).status_class(),
            StatusClass::Conflict
        );
        assert_eq!(
            RegistryResponse::with_status(403).status_class(),
            StatusClass::ClientError
        );
        assert_eq!(
            RegistryResponse::with_status(302).status_class(),
            StatusClass::ClientError
        );
        assert_eq!(
            RegistryResponse::with_status(503).status_class(),
            StatusClass::ServerError
        );
    }

    #[test]
    fn test_retryable_classes() {
        assert!(StatusClass::ServerError.is_retryable());
        assert!(StatusClass::TransportFailure.is_retryable());
        assert!(!StatusClass::ClientError.is_retryable());
        assert!(!StatusClass::Conflict.is_retryable());
    }
}

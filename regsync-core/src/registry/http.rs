// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! HTTP registry client
//!
//! Blocking client for the registry REST API:
//! - Basic auth with the application key and secret
//! - Versioned `Accept` header
//! - Timeout from configuration

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, LOCATION};
use serde_json::json;
use url::Url;

use super::{RegistryClient, RegistryError, RegistryResponse};
use crate::config::{DeviceType, SyncConfig};
use crate::payload::ChannelRegistrationPayload;
use crate::sync::tags::{TagGroups, TagSubject};

const ACCEPT_VERSION: &str = "application/vnd.urbanairship+json; version=3;";

/// Registry client over HTTP.
pub struct HttpRegistryClient {
    client: Client,
    base_url: Url,
    device_type: DeviceType,
    app_key: String,
    app_secret: String,
}

impl HttpRegistryClient {
    /// Create a registry client from config
    pub fn new(config: &SyncConfig) -> Result<Self, RegistryError> {
        let mut base_url = Url::parse(&config.registry_url)
            .map_err(|e| RegistryError::InvalidUrl(format!("{}: {}", config.registry_url, e)))?;
        // Relative joins replace the last segment unless the path is a directory.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(format!(
                "regsync/{}",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            base_url,
            device_type: config.device_type,
            app_key: config.app_key.clone(),
            app_secret: config.app_secret.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Option<Url> {
        match self.base_url.join(path) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::error!(path, error = %e, "unable to build registry URL");
                None
            }
        }
    }

    fn send(&self, request: RequestBuilder) -> Option<reqwest::blocking::Response> {
        let request = request
            .basic_auth(&self.app_key, Some(&self.app_secret))
            .header(ACCEPT, ACCEPT_VERSION);

        match request.send() {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::warn!(error = %e, "registry request failed");
                None
            }
        }
    }

    fn post_json(&self, path: &str, body: serde_json::Value) -> RegistryResponse {
        let Some(url) = self.endpoint(path) else {
            return RegistryResponse::no_response();
        };
        match self.send(self.client.post(url).json(&body)) {
            Some(response) => RegistryResponse::with_status(response.status().as_u16()),
            None => RegistryResponse::no_response(),
        }
    }
}

impl RegistryClient for HttpRegistryClient {
    fn create_channel(&self, payload: &ChannelRegistrationPayload) -> RegistryResponse {
        let Some(url) = self.endpoint("api/channels/") else {
            return RegistryResponse::no_response();
        };
        let Some(response) = self.send(self.client.post(url).json(&payload.to_registry_json()))
        else {
            return RegistryResponse::no_response();
        };

        let status = response.status().as_u16();
        let channel_location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let channel_id = match response.json::<serde_json::Value>() {
            Ok(body) => body
                .get("channel_id")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            Err(e) => {
                tracing::debug!(error = %e, "unable to parse channel create response body");
                None
            }
        };

        RegistryResponse {
            status: Some(status),
            channel_id,
            channel_location,
        }
    }

    fn update_channel(
        &self,
        location: &Url,
        payload: &ChannelRegistrationPayload,
    ) -> RegistryResponse {
        let request = self
            .client
            .put(location.clone())
            .json(&payload.to_registry_json());
        match self.send(request) {
            Some(response) => RegistryResponse::with_status(response.status().as_u16()),
            None => RegistryResponse::no_response(),
        }
    }

    fn associate_named_user(&self, named_user_id: &str, channel_id: &str) -> RegistryResponse {
        self.post_json(
            "api/named_users/associate",
            json!({
                "channel_id": channel_id,
                "device_type": self.device_type.as_str(),
                "named_user_id": named_user_id,
            }),
        )
    }

    fn disassociate_named_user(&self, channel_id: &str) -> RegistryResponse {
        self.post_json(
            "api/named_users/disassociate",
            json!({
                "channel_id": channel_id,
                "device_type": self.device_type.as_str(),
            }),
        )
    }

    fn update_tag_groups(
        &self,
        subject: TagSubject,
        subject_id: &str,
        adds: &TagGroups,
        removes: &TagGroups,
    ) -> RegistryResponse {
        let (path, audience_key) = match subject {
            TagSubject::Channel => ("api/channels/tags/", self.device_type.channel_audience_key()),
            TagSubject::NamedUser => ("api/named_users/tags/", "named_user_id"),
        };

        let mut body = serde_json::Map::new();
        body.insert("audience".into(), json!({ audience_key: subject_id }));
        if !adds.is_empty() {
            body.insert("add".into(), json!(adds));
        }
        if !removes.is_empty() {
            body.insert("remove".into(), json!(removes));
        }

        self.post_json(path, serde_json::Value::Object(body))
    }
}

// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Channel Registration Payload
//!
//! Immutable description of the device attributes sent to the registry.
//! Two payloads compare equal field by field, which is what lets the channel
//! reconciler skip updates that would change nothing.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Structured attribute value.
///
/// A closed union of JSON-compatible shapes, so payload attributes round-trip
/// through storage without run-time type inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<AttributeValue>),
    Map(BTreeMap<String, AttributeValue>),
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(value.into())
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

/// Device attributes registered for a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRegistrationPayload {
    /// Registry device type ("android", "amazon").
    pub device_type: String,
    /// User-facing notification opt-in.
    pub opt_in: bool,
    /// Whether background (silent) pushes are allowed.
    pub background_enabled: bool,
    /// Platform push token, once known.
    #[serde(default)]
    pub push_address: Option<String>,
    /// Whether `tags` replaces the channel's device tags.
    pub set_tags: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    /// Identity hint: application user id.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Identity hint: legacy push id.
    #[serde(default)]
    pub apid: Option<String>,
    /// Free-form channel attributes.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl ChannelRegistrationPayload {
    /// Creates a payload with nothing opted in.
    pub fn new(device_type: &str) -> Self {
        ChannelRegistrationPayload {
            device_type: device_type.to_string(),
            opt_in: false,
            background_enabled: false,
            push_address: None,
            set_tags: false,
            tags: BTreeSet::new(),
            alias: None,
            timezone: None,
            language: None,
            country: None,
            user_id: None,
            apid: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_opt_in(mut self, opt_in: bool) -> Self {
        self.opt_in = opt_in;
        self
    }

    pub fn with_background_enabled(mut self, enabled: bool) -> Self {
        self.background_enabled = enabled;
        self
    }

    pub fn with_push_address(mut self, push_address: &str) -> Self {
        self.push_address = Some(push_address.to_string());
        self
    }

    /// Replaces the device tags; implies `set_tags`.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_tags = true;
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub fn with_timezone(mut self, timezone: &str) -> Self {
        self.timezone = Some(timezone.to_string());
        self
    }

    pub fn with_locale(mut self, language: &str, country: &str) -> Self {
        self.language = Some(language.to_string());
        self.country = Some(country.to_string());
        self
    }

    pub fn with_user_id(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn with_apid(mut self, apid: &str) -> Self {
        self.apid = Some(apid.to_string());
        self
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Builds the registry request body.
    pub fn to_registry_json(&self) -> serde_json::Value {
        let mut channel = json!({
            "device_type": self.device_type,
            "opt_in": self.opt_in,
            "background": self.background_enabled,
            "set_tags": self.set_tags,
        });

        if let Some(channel) = channel.as_object_mut() {
            if let Some(push_address) = &self.push_address {
                channel.insert("push_address".into(), json!(push_address));
            }
            if self.set_tags {
                channel.insert("tags".into(), json!(self.tags));
            }
            if let Some(alias) = &self.alias {
                channel.insert("alias".into(), json!(alias));
            }
            if let Some(timezone) = &self.timezone {
                channel.insert("timezone".into(), json!(timezone));
            }
            if let Some(language) = &self.language {
                channel.insert("locale_language".into(), json!(language));
            }
            if let Some(country) = &self.country {
                channel.insert("locale_country".into(), json!(country));
            }
            if !self.attributes.is_empty() {
                channel.insert("attributes".into(), json!(self.attributes));
            }
        }

        let mut body = json!({ "channel": channel });

        let mut hints = serde_json::Map::new();
        if let Some(user_id) = &self.user_id {
            hints.insert("user_id".into(), json!(user_id));
        }
        if let Some(apid) = &self.apid {
            hints.insert("apid".into(), json!(apid));
        }
        if !hints.is_empty() {
            if let Some(body) = body.as_object_mut() {
                body.insert("identity_hints".into(), serde_json::Value::Object(hints));
            }
        }

        body
    }
}

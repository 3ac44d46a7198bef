// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proptest Strategies
//!
//! Reusable proptest strategies for property-based testing.

use proptest::prelude::*;

use regsync_core::{AttributeValue, ChannelRegistrationPayload, TagGroupDelta};

// ============================================================
// Tag Strategies
// ============================================================

/// Small alphabet so generated deltas collide on (group, tag) pairs.
pub fn group_strategy() -> impl Strategy<Value = String> {
    "[a-c]"
}

pub fn tag_strategy() -> impl Strategy<Value = String> {
    "[x-z]{1,2}"
}

/// A single tag operation: (group, tag, is_add).
pub fn tag_op_strategy() -> impl Strategy<Value = (String, String, bool)> {
    (group_strategy(), tag_strategy(), any::<bool>())
}

/// A delta built from a handful of operations, normalized the way a
/// loaded pending delta is.
pub fn tag_delta_strategy() -> impl Strategy<Value = TagGroupDelta> {
    prop::collection::vec(tag_op_strategy(), 0..8).prop_map(|ops| {
        let delta = ops
            .into_iter()
            .fold(TagGroupDelta::new(), |delta, (group, tag, is_add)| {
                if is_add {
                    delta.with_add(&group, &tag)
                } else {
                    delta.with_remove(&group, &tag)
                }
            });
        TagGroupDelta::from_parts(delta.adds, delta.removes)
    })
}

// ============================================================
// Payload Strategies
// ============================================================

pub fn attribute_strategy() -> impl Strategy<Value = AttributeValue> {
    prop_oneof![
        any::<bool>().prop_map(AttributeValue::from),
        any::<i64>().prop_map(AttributeValue::from),
        "[a-z]{0,8}".prop_map(AttributeValue::from),
    ]
}

pub fn payload_strategy() -> impl Strategy<Value = ChannelRegistrationPayload> {
    (
        any::<bool>(),
        any::<bool>(),
        proptest::option::of("[a-f0-9]{8}"),
        prop::collection::btree_set("[a-z]{1,5}", 0..4),
        proptest::option::of("(en|de|fr)"),
        prop::collection::btree_map("[a-z]{1,4}", attribute_strategy(), 0..3),
    )
        .prop_map(|(opt_in, background, token, tags, language, attributes)| {
            let mut payload = ChannelRegistrationPayload::new("android")
                .with_opt_in(opt_in)
                .with_background_enabled(background)
                .with_tags(tags);
            if let Some(token) = token {
                payload = payload.with_push_address(&token);
            }
            if let Some(language) = language {
                payload = payload.with_locale(&language, "CH");
            }
            for (key, value) in attributes {
                payload = payload.with_attribute(&key, value);
            }
            payload
        })
}

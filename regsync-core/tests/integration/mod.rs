// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Integration Tests for Regsync Core
//!
//! These tests drive complete workflows through the `Registrar`: initial
//! registration, named user changes and tag group edits, with the registry
//! mocked and state kept in SQLite.
//!
//! Run with: cargo test --test integration

#[path = "../common/mod.rs"]
mod common;

mod registration_workflow_test;

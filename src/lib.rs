// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Secure File Host - encrypted-at-rest file storage service
//!
//! Uploaded files are sealed with AES-256-GCM and stored next to a JSON
//! descriptor. A small axum API exposes upload, listing, download and delete
//! behind a shared-secret header.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Shared-secret access gate and response hardening
//! - `config` - Environment configuration
//! - `storage` - Encrypted object store

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;

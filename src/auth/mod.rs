// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Access Gate
//!
//! A single shared secret protects the file API.
//!
//! ## Flow
//!
//! 1. Operator sets `SECRET_HEADER_VALUE` (and optionally
//!    `SECRET_HEADER_NAME`, default `X-Secret-Key`)
//! 2. Clients send the header on every `/api/*` and static request
//! 3. The server compares the value in constant time and answers 403
//!    `{"error":"Forbidden"}` on mismatch
//!
//! ## Security
//!
//! - Health probes and API docs are not gated
//! - An unset secret rejects every gated request (fail closed)
//! - Every response carries HSTS, nosniff, frame-deny and CSP headers

pub mod error;
pub mod middleware;

pub use error::AuthError;
pub use middleware::{require_secret_header, with_security_headers, SecretHeader};

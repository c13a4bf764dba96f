// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared-secret gate and response hardening middleware.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let gate = Arc::new(SecretHeader::new("X-Secret-Key", Some("s3cret"))?);
//!
//! let app = Router::new()
//!     .route("/api/files", get(list_files))
//!     .layer(axum::middleware::from_fn_with_state(gate, require_secret_header));
//! ```

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
    Router,
};
use subtle::ConstantTimeEq;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::debug;
use zeroize::Zeroizing;

use super::AuthError;
use crate::config::{ConfigError, SECRET_HEADER_NAME_ENV};

/// Header name and expected value of the access gate.
pub struct SecretHeader {
    name: HeaderName,
    expected: Option<Zeroizing<Vec<u8>>>,
}

impl SecretHeader {
    /// Build the gate. `expected = None` rejects every request.
    pub fn new(name: &str, expected: Option<&str>) -> Result<Self, ConfigError> {
        let name = HeaderName::try_from(name).map_err(|e| ConfigError::Invalid {
            var: SECRET_HEADER_NAME_ENV,
            value: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name,
            expected: expected.map(|v| Zeroizing::new(v.as_bytes().to_vec())),
        })
    }

    pub fn name(&self) -> &HeaderName {
        &self.name
    }

    pub fn is_configured(&self) -> bool {
        self.expected.is_some()
    }

    /// Check request headers against the expected secret in constant time.
    pub fn verify(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let expected = self.expected.as_ref().ok_or(AuthError::NotConfigured)?;
        let presented = headers.get(&self.name).ok_or(AuthError::MissingSecret)?;

        if bool::from(presented.as_bytes().ct_eq(expected.as_slice())) {
            Ok(())
        } else {
            Err(AuthError::InvalidSecret)
        }
    }
}

impl fmt::Debug for SecretHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretHeader")
            .field("name", &self.name)
            .field("configured", &self.is_configured())
            .finish()
    }
}

/// Reject requests that do not carry the configured secret header.
pub async fn require_secret_header(
    State(gate): State<Arc<SecretHeader>>,
    request: Request,
    next: Next,
) -> Response {
    match gate.verify(request.headers()) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            debug!(path = %request.uri().path(), code = e.error_code(), "request rejected by gate");
            e.into_response()
        }
    }
}

/// Headers added to every response unless a handler already set them.
pub const SECURITY_HEADERS: [(&str, &str); 5] = [
    (
        "strict-transport-security",
        "max-age=31536000; includeSubDomains",
    ),
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("content-security-policy", "default-src 'self'"),
];

/// Wrap `router` with the security response headers.
pub fn with_security_headers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SECURITY_HEADERS
        .iter()
        .fold(router, |router, &(name, value)| {
            router.layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            ))
        })
}

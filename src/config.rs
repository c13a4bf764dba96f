// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup; any malformed value is fatal.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ENCRYPTION_KEY` | 64 hex characters (256-bit AES key) | Required |
//! | `UPLOAD_DIR` | Root directory for encrypted objects | `./uploads` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3000` |
//! | `SECRET_HEADER_NAME` | Header carrying the shared secret | `X-Secret-Key` |
//! | `SECRET_HEADER_VALUE` | Expected secret; unset rejects every request | Unset |
//! | `MAX_FILE_SIZE` | Upload limit in bytes | `104857600` |
//! | `ID_POLICY` | `name-time` or `salted` | `name-time` |
//! | `TLS_CERT_PATH` | PEM certificate chain | Unset (plain HTTP) |
//! | `TLS_KEY_PATH` | PEM private key | Unset (plain HTTP) |
//! | `STATIC_DIR` | Browser assets served at `/` | Unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::storage::paths::DEFAULT_UPLOAD_DIR;
use crate::storage::IdPolicy;

pub const ENCRYPTION_KEY_ENV: &str = "ENCRYPTION_KEY";
pub const UPLOAD_DIR_ENV: &str = "UPLOAD_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const SECRET_HEADER_NAME_ENV: &str = "SECRET_HEADER_NAME";
pub const SECRET_HEADER_VALUE_ENV: &str = "SECRET_HEADER_VALUE";
pub const MAX_FILE_SIZE_ENV: &str = "MAX_FILE_SIZE";
pub const ID_POLICY_ENV: &str = "ID_POLICY";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const STATIC_DIR_ENV: &str = "STATIC_DIR";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SECRET_HEADER_NAME: &str = "X-Secret-Key";
/// 100 MiB.
pub const DEFAULT_MAX_FILE_SIZE: usize = 100 * 1024 * 1024;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Fatal configuration problems.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// Read `LOG_FORMAT` directly. Used before the rest of the config is
    /// loaded so that config errors are logged in the right format.
    pub fn from_env() -> Self {
        Self::parse(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// PEM files for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Process configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Hex-encoded store key; validated when the store is opened.
    pub encryption_key: String,
    pub upload_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub secret_header_name: String,
    pub secret_header_value: Option<String>,
    pub max_file_size: usize,
    pub id_policy: IdPolicy,
    pub tls: Option<TlsPaths>,
    pub static_dir: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let encryption_key = get(ENCRYPTION_KEY_ENV).ok_or(ConfigError::Missing(ENCRYPTION_KEY_ENV))?;

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let ip: IpAddr = parse_var(HOST_ENV, &host)?;
        let port = match get(PORT_ENV) {
            Some(value) => parse_var(PORT_ENV, &value)?,
            None => DEFAULT_PORT,
        };

        let max_file_size = match get(MAX_FILE_SIZE_ENV) {
            Some(value) => parse_var(MAX_FILE_SIZE_ENV, &value)?,
            None => DEFAULT_MAX_FILE_SIZE,
        };

        let id_policy = match get(ID_POLICY_ENV) {
            Some(value) => value.parse().map_err(|reason| ConfigError::Invalid {
                var: ID_POLICY_ENV,
                value,
                reason,
            })?,
            None => IdPolicy::default(),
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
            (None, None) => None,
        };

        Ok(Self {
            encryption_key,
            upload_dir: get(UPLOAD_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            bind_addr: SocketAddr::new(ip, port),
            secret_header_name: get(SECRET_HEADER_NAME_ENV)
                .unwrap_or_else(|| DEFAULT_SECRET_HEADER_NAME.to_string()),
            secret_header_value: get(SECRET_HEADER_VALUE_ENV),
            max_file_size,
            id_policy,
            tls,
            static_dir: get(STATIC_DIR_ENV).map(PathBuf::from),
            log_format: LogFormat::parse(lookup(LOG_FORMAT_ENV).as_deref()),
        })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("encryption_key", &"<redacted>")
            .field("upload_dir", &self.upload_dir)
            .field("bind_addr", &self.bind_addr)
            .field("secret_header_name", &self.secret_header_name)
            .field(
                "secret_header_value",
                &self.secret_header_value.as_ref().map(|_| "<redacted>"),
            )
            .field("max_file_size", &self.max_file_size)
            .field("id_policy", &self.id_policy)
            .field("tls", &self.tls)
            .field("static_dir", &self.static_dir)
            .field("log_format", &self.log_format)
            .finish()
    }
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

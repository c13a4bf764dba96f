// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Response bodies of the file API. All types derive `Serialize` and
//! `ToSchema` for JSON handling and OpenAPI documentation.
//!
//! Upload dates are rendered as ISO-8601 with millisecond precision
//! (`2026-01-28T00:00:00.000Z`), the same form used in descriptor files.

use chrono::SecondsFormat;
use serde::Serialize;
use utoipa::ToSchema;

use crate::storage::ObjectDescriptor;

/// Public view of a stored object.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    /// Storage id (64 hex characters).
    #[schema(example = "3f0c9a7e5b1d2c4e6f8a0b1c3d5e7f9a2b4c6d8e0f1a3b5c7d9e1f2a4b6c8d0e")]
    pub id: String,
    /// Original file name.
    pub name: String,
    /// Plaintext size in bytes.
    pub size: u64,
    #[schema(example = "2026-01-28T00:00:00.000Z")]
    pub upload_date: String,
}

impl From<ObjectDescriptor> for FileSummary {
    fn from(descriptor: ObjectDescriptor) -> Self {
        Self {
            id: descriptor.id.to_string(),
            name: descriptor.original_name,
            size: descriptor.size,
            upload_date: descriptor
                .upload_date
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Multipart body of an upload. Documentation only; the handler reads the
/// form field by field.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    pub file: FileSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileListResponse {
    pub success: bool,
    pub files: Vec<FileSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::identifier;
    use chrono::{TimeZone, Utc};

    #[test]
    fn summary_uses_camel_case_and_millis() {
        let at = Utc.timestamp_millis_opt(1_706_400_000_000).unwrap();
        let descriptor = ObjectDescriptor {
            original_name: "a.txt".to_string(),
            id: identifier::generate("a.txt", at),
            size: 11,
            mimetype: "text/plain".to_string(),
            upload_date: at,
        };
        let id = descriptor.id.to_string();

        let json = serde_json::to_value(FileSummary::from(descriptor)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": id,
                "name": "a.txt",
                "size": 11,
                "uploadDate": "2024-01-28T00:00:00.000Z"
            })
        );
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::SecretHeader;
use crate::config::DEFAULT_MAX_FILE_SIZE;
use crate::storage::FileStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FileStore>,
    pub gate: Arc<SecretHeader>,
    /// Upload limit in bytes.
    pub max_file_size: usize,
    /// Browser assets served behind the gate.
    pub static_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(store: FileStore, gate: SecretHeader) -> Self {
        Self {
            store: Arc::new(store),
            gate: Arc::new(gate),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            static_dir: None,
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: usize) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn with_static_dir(mut self, static_dir: Option<PathBuf>) -> Self {
        self.static_dir = static_dir;
        self
    }
}

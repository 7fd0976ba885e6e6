// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use arex_core::{JobId, ParseError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from control-file operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no status file for job {0}")]
    NotFound(JobId),
    #[error("unrecognized status {content:?} for job {id}")]
    BadStatus { id: JobId, content: String },
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io { path: path.into(), source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

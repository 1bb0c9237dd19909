// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Ticketrail session tracker.

use thiserror::Error;

/// The primary error type returned by ingestion, assembly, and export operations.
///
/// Orphaned messages and status events are not errors: the registry drops
/// them and logs the drop. Date parse failures never surface here either,
/// they resolve through the canonical-date fallback.
#[derive(Debug, Error)]
pub enum TicketrailError {
    /// Configuration errors surfaced outside the config crate's diagnostics.
    #[error("configuration error: {0}")]
    Config(String),

    /// The record could not be classified or lacks a field its kind requires.
    /// Nothing was mutated and nothing was written.
    #[error("malformed record: {reason}")]
    MalformedRecord { reason: String },

    /// Reading or writing an export file failed.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// CSV encoding or decoding failed.
    #[error("export error: {message}")]
    Export {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A user-supplied argument could not be parsed, e.g. a malformed date.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A date range whose start lies after its end.
    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange { start: String, end: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TicketrailError {
    /// Shorthand for a malformed-record rejection.
    pub fn malformed(reason: impl Into<String>) -> Self {
        TicketrailError::MalformedRecord {
            reason: reason.into(),
        }
    }

    /// Wraps an I/O failure together with the path it happened on.
    pub fn storage(
        path: impl AsRef<std::path::Path>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        TicketrailError::Storage {
            path: path.as_ref().display().to_string(),
            source: Box::new(source),
        }
    }

    /// Returns true when the error is a malformed-input rejection.
    pub fn is_malformed(&self) -> bool {
        matches!(self, TicketrailError::MalformedRecord { .. })
    }
}

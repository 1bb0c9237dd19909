// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Export sinks for assembled attentions and raw per-kind records.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::attention::Attention;
use crate::error::TicketrailError;
use crate::types::RecordKind;

/// A flattened record ready to be written to a raw per-kind export.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub kind: RecordKind,
    pub canonical_date: String,
    /// Candidate key that produced the canonical date, or `fallback`.
    pub canonical_date_source: String,
    pub columns: BTreeMap<String, String>,
}

/// Durable destination for assembled attentions.
///
/// Each call must produce a new, never-overwritten artifact and return its
/// path. Failures are returned to the caller.
#[async_trait]
pub trait AttentionSink: Send + Sync + 'static {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Writes one attention and returns where it landed.
    async fn write_attention(&self, attention: &Attention) -> Result<PathBuf, TicketrailError>;
}

/// Durable destination for raw, per-record exports.
#[async_trait]
pub trait RecordSink: Send + Sync + 'static {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Writes one flattened record and returns where it landed.
    async fn write_record(&self, record: &RawRecord) -> Result<PathBuf, TicketrailError>;
}

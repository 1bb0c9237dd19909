// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-record processing results.

use std::path::PathBuf;

use serde::Serialize;
use strum::Display;
use ticketrail_core::{RecordKind, TicketrailError};

/// What the session registry did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// A session notice opened a new session.
    Opened,
    /// A session notice arrived while the contact had an OPEN session.
    IgnoredOpen,
    /// A session notice repeated a known sequence id.
    Duplicate,
    /// A message or status event was added to the OPEN session.
    Appended,
    /// A status event closed the OPEN session.
    Closed,
    /// A message or status event arrived with no OPEN session.
    Dropped,
    /// Kept for attribution or exported raw only.
    Recorded,
}

/// Result of processing one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessOutcome {
    pub kind: RecordKind,
    /// Raw per-record export file.
    pub output_path: PathBuf,
    /// Attention file written when this record closed the end of a chain.
    pub attention_path: Option<PathBuf>,
    pub disposition: Disposition,
}

/// Result of processing a payload of one or more records.
#[derive(Debug, Default)]
pub struct PayloadOutcome {
    pub processed: Vec<ProcessOutcome>,
    /// Malformed records, by position in the payload.
    pub rejected: Vec<(usize, TicketrailError)>,
}

impl PayloadOutcome {
    pub fn attentions(&self) -> impl Iterator<Item = &PathBuf> {
        self.processed.iter().filter_map(|o| o.attention_path.as_ref())
    }

    /// Adds another payload's results, shifting rejected positions by `offset`.
    pub fn merge(&mut self, other: PayloadOutcome, offset: usize) {
        self.processed.extend(other.processed);
        self.rejected
            .extend(other.rejected.into_iter().map(|(i, e)| (i + offset, e)));
    }
}

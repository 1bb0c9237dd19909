// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record ingestion for the Ticketrail session tracker.
//!
//! Turns one raw platform record into a flat column map, a canonical date,
//! a record kind, and (for tracked kinds) a typed payload.

pub mod classify;
pub mod dates;
pub mod extract;
pub mod flatten;
pub mod identity;

use chrono::{DateTime, Utc};
use serde_json::Value;
use ticketrail_config::{MissingDatePolicy, TicketrailConfig};
use ticketrail_core::{ContactId, RawRecord, RecordKind, TicketrailError};

pub use classify::RecordClassifier;
pub use dates::{CanonicalDate, FALLBACK_SOURCE};
pub use extract::{Extractor, TypedRecord};
pub use flatten::{FlatRecord, FlatValue};
pub use identity::{decode_agent_identity, local_part, resolve_contact};

/// One ingested record.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub kind: RecordKind,
    pub record: FlatRecord,
    pub date: CanonicalDate,
    pub typed: TypedRecord,
}

impl Ingested {
    /// The raw export row for this record.
    pub fn raw_record(&self) -> RawRecord {
        RawRecord {
            kind: self.kind,
            canonical_date: self.date.date.clone(),
            canonical_date_source: self.date.source.clone(),
            columns: self.record.columns(),
        }
    }
}

/// Flatten, date, classify, and extract in one step.
#[derive(Debug)]
pub struct Ingestor {
    classifier: RecordClassifier,
    extractor: Extractor,
    date_candidates: Vec<String>,
    missing_date_policy: MissingDatePolicy,
}

impl Ingestor {
    pub fn new(config: &TicketrailConfig) -> Self {
        Self {
            classifier: RecordClassifier::new(&config.classifier),
            extractor: Extractor::new(config),
            date_candidates: config.dates.candidate_fields.clone(),
            missing_date_policy: config.dates.missing_date_policy,
        }
    }

    /// Ingests a record. Non-object roots, unknown kinds, and classified
    /// records missing a required field are rejected as malformed.
    pub fn ingest(&self, value: &Value, now: DateTime<Utc>) -> Result<Ingested, TicketrailError> {
        self.ingest_for(value, now, None)
    }

    /// Like [`Self::ingest`], attributing the record to `contact` when it
    /// names no contact of its own.
    pub fn ingest_for(
        &self,
        value: &Value,
        now: DateTime<Utc>,
        contact: Option<&ContactId>,
    ) -> Result<Ingested, TicketrailError> {
        if !value.is_object() {
            return Err(TicketrailError::malformed("record is not a JSON object"));
        }
        let record = FlatRecord::flatten(value);
        let kind = self.classifier.classify(&record);
        if kind == RecordKind::Unknown {
            return Err(TicketrailError::malformed("record matches no known shape"));
        }
        let date = dates::canonical_date(
            &record,
            &self.date_candidates,
            self.missing_date_policy,
            now.date_naive(),
        );
        if date.is_fallback() {
            tracing::debug!(kind = %kind, date = %date.date, "no date candidate matched, using fallback");
        }
        let typed = self.extractor.extract_for(kind, &record, &date, now, contact)?;
        Ok(Ingested {
            kind,
            record,
            date,
            typed,
        })
    }

    pub fn date_candidates(&self) -> &[String] {
        &self.date_candidates
    }
}

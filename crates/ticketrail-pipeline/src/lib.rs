// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record processing pipeline for the Ticketrail session tracker.
//!
//! [`Pipeline::process_record`] takes one raw platform record through
//! ingestion, writes its raw export, and only then hands the typed payload
//! to the session registry. A malformed record is rejected before anything
//! is written or mutated.

pub mod outcome;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use ticketrail_config::TicketrailConfig;
use ticketrail_core::{AttentionSink, ContactId, RecordSink, TicketrailError};
use ticketrail_export::{CsvAttentionSink, CsvRecordSink};
use ticketrail_ingest::{Ingestor, TypedRecord};
use ticketrail_session::{
    EventOutcome, MessageOutcome, NoticeOutcome, OpenSessionInfo, SessionRegistry,
};
use tracing::{debug, info, warn};

pub use outcome::{Disposition, PayloadOutcome, ProcessOutcome};

/// Ingestion, raw export, and session tracking wired together.
pub struct Pipeline {
    ingestor: Ingestor,
    registry: SessionRegistry,
    records: Arc<dyn RecordSink>,
}

impl Pipeline {
    /// Builds a pipeline over explicit sinks.
    pub fn new(
        config: &TicketrailConfig,
        records: Arc<dyn RecordSink>,
        attentions: Arc<dyn AttentionSink>,
    ) -> Self {
        info!(
            records = records.name(),
            attentions = attentions.name(),
            "pipeline initialized"
        );
        Self {
            ingestor: Ingestor::new(config),
            registry: SessionRegistry::new(config, attentions),
            records,
        }
    }

    /// Builds a pipeline writing CSV files under the configured output directory.
    pub fn from_config(config: &TicketrailConfig) -> Self {
        let records = Arc::new(CsvRecordSink::new(config.storage.raw_dir()));
        let attentions = Arc::new(CsvAttentionSink::new(config.storage.attentions_dir()));
        Self::new(config, records, attentions)
    }

    pub async fn process_record(&self, value: &Value) -> Result<ProcessOutcome, TicketrailError> {
        self.process_record_at(value, Utc::now()).await
    }

    /// Like [`Self::process_record`] with an explicit processing time, used
    /// for date and timestamp fallbacks.
    pub async fn process_record_at(
        &self,
        value: &Value,
        now: DateTime<Utc>,
    ) -> Result<ProcessOutcome, TicketrailError> {
        self.process(value, now, None).await
    }

    /// Processes a record delivered on behalf of `contact`. The record's own
    /// contact fields still win when present.
    pub async fn process_record_for(
        &self,
        contact: &ContactId,
        value: &Value,
    ) -> Result<ProcessOutcome, TicketrailError> {
        self.process(value, Utc::now(), Some(contact)).await
    }

    pub async fn process_record_for_at(
        &self,
        contact: &ContactId,
        value: &Value,
        now: DateTime<Utc>,
    ) -> Result<ProcessOutcome, TicketrailError> {
        self.process(value, now, Some(contact)).await
    }

    async fn process(
        &self,
        value: &Value,
        now: DateTime<Utc>,
        contact: Option<&ContactId>,
    ) -> Result<ProcessOutcome, TicketrailError> {
        let ingested = self.ingestor.ingest_for(value, now, contact)?;
        let output_path = self.records.write_record(&ingested.raw_record()).await?;
        debug!(kind = %ingested.kind, path = %output_path.display(), "raw record written");

        let (disposition, attention_path) = match ingested.typed {
            TypedRecord::SessionNotice(notice) => {
                let disposition = match self.registry.on_session_notice(notice).await {
                    NoticeOutcome::Opened => Disposition::Opened,
                    NoticeOutcome::IgnoredOpen { .. } => Disposition::IgnoredOpen,
                    NoticeOutcome::Duplicate => Disposition::Duplicate,
                };
                (disposition, None)
            }
            TypedRecord::Message(message) => match self.registry.on_message(message).await {
                MessageOutcome::Appended(_) => (Disposition::Appended, None),
                MessageOutcome::Dropped => (Disposition::Dropped, None),
            },
            TypedRecord::StatusEvent(event) => match self.registry.on_status_event(event).await? {
                EventOutcome::Appended(_) => (Disposition::Appended, None),
                EventOutcome::Closed { attention, .. } => (Disposition::Closed, attention),
                EventOutcome::Dropped => (Disposition::Dropped, None),
            },
            TypedRecord::TemplateSend(send) => {
                self.registry.on_template_send(send).await;
                (Disposition::Recorded, None)
            }
            TypedRecord::ContactProfile => (Disposition::Recorded, None),
        };

        Ok(ProcessOutcome {
            kind: ingested.kind,
            output_path,
            attention_path,
            disposition,
        })
    }

    /// Processes a single record object or an array of them, in order.
    ///
    /// Malformed elements are collected and skipped; storage failures abort
    /// the payload.
    pub async fn process_payload(&self, value: &Value) -> Result<PayloadOutcome, TicketrailError> {
        self.process_payload_at(value, Utc::now()).await
    }

    pub async fn process_payload_at(
        &self,
        value: &Value,
        now: DateTime<Utc>,
    ) -> Result<PayloadOutcome, TicketrailError> {
        self.payload(value, now, None).await
    }

    /// Like [`Self::process_payload`], attributing contactless records to
    /// `contact`.
    pub async fn process_payload_for(
        &self,
        contact: &ContactId,
        value: &Value,
    ) -> Result<PayloadOutcome, TicketrailError> {
        self.payload(value, Utc::now(), Some(contact)).await
    }

    async fn payload(
        &self,
        value: &Value,
        now: DateTime<Utc>,
        contact: Option<&ContactId>,
    ) -> Result<PayloadOutcome, TicketrailError> {
        let records: &[Value] = match value {
            Value::Array(items) => items,
            Value::Object(_) => std::slice::from_ref(value),
            _ => {
                return Err(TicketrailError::malformed(
                    "payload is neither a record object nor an array of records",
                ));
            }
        };

        let mut outcome = PayloadOutcome::default();
        for (index, record) in records.iter().enumerate() {
            match self.process(record, now, contact).await {
                Ok(processed) => outcome.processed.push(processed),
                Err(e) if e.is_malformed() => {
                    warn!(index, error = %e, "rejected malformed record");
                    outcome.rejected.push((index, e));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(outcome)
    }

    /// Sessions still awaiting a closure signal, oldest first.
    pub async fn open_sessions(&self) -> Vec<OpenSessionInfo> {
        self.registry.open_sessions().await
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }
}

// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` wires a [`Pipeline`] with the real CSV sinks and a
//! [`Consolidator`] over a temp output directory, so tests can drive records
//! in and read the resulting files back.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use ticketrail_config::{MissingDatePolicy, TicketrailConfig};
use ticketrail_core::{DateRange, RecordKind, TicketrailError};
use ticketrail_export::{ConsolidationOutput, Consolidator, list_csv_files};
use ticketrail_pipeline::{Pipeline, ProcessOutcome};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: TicketrailConfig,
    now: DateTime<Utc>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: TicketrailConfig::default(),
            now: Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).single().unwrap_or_default(),
        }
    }

    /// Set what happens to records with no parseable date.
    pub fn with_missing_date_policy(mut self, policy: MissingDatePolicy) -> Self {
        self.config.dates.missing_date_policy = policy;
        self
    }

    /// Set the processing time used for date and timestamp fallbacks.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Adjust any other configuration value. The output directory is
    /// replaced by the temp directory on build.
    pub fn with_config(mut self, edit: impl FnOnce(&mut TicketrailConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    /// Build the harness, creating the temp output directory.
    pub fn build(self) -> Result<TestHarness, TicketrailError> {
        let temp_dir = tempfile::TempDir::new()
            .map_err(|e| TicketrailError::storage(std::env::temp_dir(), e))?;
        let mut config = self.config;
        config.storage.output_dir = temp_dir.path().to_string_lossy().to_string();

        Ok(TestHarness {
            pipeline: Pipeline::from_config(&config),
            consolidator: Consolidator::new(&config),
            config,
            now: self.now,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete pipeline writing into a temp directory, cleaned up on drop.
pub struct TestHarness {
    pub pipeline: Pipeline,
    pub consolidator: Consolidator,
    pub config: TicketrailConfig,
    now: DateTime<Utc>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default configuration.
    pub fn new() -> Result<Self, TicketrailError> {
        Self::builder().build()
    }

    /// Processes one record at the harness clock.
    pub async fn process(&self, record: &Value) -> Result<ProcessOutcome, TicketrailError> {
        self.pipeline.process_record_at(record, self.now).await
    }

    /// Processes records in order, stopping at the first error.
    pub async fn process_all(
        &self,
        records: &[Value],
    ) -> Result<Vec<ProcessOutcome>, TicketrailError> {
        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            outcomes.push(self.process(record).await?);
        }
        Ok(outcomes)
    }

    pub fn attentions_dir(&self) -> PathBuf {
        self.config.storage.attentions_dir()
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.config.storage.raw_dir()
    }

    pub fn merged_dir(&self) -> PathBuf {
        self.config.storage.merged_dir()
    }

    /// Per-interaction files written so far, sorted by name.
    pub async fn attention_files(&self) -> Result<Vec<PathBuf>, TicketrailError> {
        list_csv_files(&self.attentions_dir(), None).await
    }

    /// Raw export files of one kind, sorted by name.
    pub async fn raw_files(&self, kind: RecordKind) -> Result<Vec<PathBuf>, TicketrailError> {
        list_csv_files(&self.raw_dir().join(kind.to_string()), None).await
    }

    /// Consolidates the attentions directory into the merged directory.
    pub async fn consolidate(
        &self,
        range: Option<DateRange>,
    ) -> Result<ConsolidationOutput, TicketrailError> {
        self.consolidator
            .consolidate(&self.attentions_dir(), range)
            .await
    }

    /// Reads a written file as text.
    pub fn read(&self, path: &Path) -> Result<String, TicketrailError> {
        std::fs::read_to_string(path).map_err(|e| TicketrailError::storage(path, e))
    }
}

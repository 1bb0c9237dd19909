// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ticketrail ingest` command implementation.
//!
//! Feeds record files through one pipeline so sessions span files. Inputs
//! are read in argument order; within a file, records keep their order.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use ticketrail_config::TicketrailConfig;
use ticketrail_core::{ContactId, TicketrailError};
use ticketrail_pipeline::{PayloadOutcome, Pipeline};
use tracing::{info, warn};

use crate::output::Output;

/// Structured result for `--json` mode.
#[derive(Debug, Default, Serialize)]
pub struct IngestSummary {
    pub inputs: usize,
    pub processed: usize,
    pub rejected: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub attentions: Vec<PathBuf>,
    pub open_sessions: usize,
}

impl IngestSummary {
    fn add(&mut self, outcome: &PayloadOutcome) {
        self.processed += outcome.processed.len();
        self.rejected += outcome.rejected.len();
        for processed in &outcome.processed {
            *self.by_kind.entry(processed.kind.to_string()).or_default() += 1;
        }
        self.attentions.extend(outcome.attentions().cloned());
    }
}

/// Parses a whole JSON document, falling back to JSON lines.
pub fn parse_documents(text: &str) -> Result<Vec<Value>, TicketrailError> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(vec![value]);
    }
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| {
                TicketrailError::malformed(format!("line {}: invalid JSON: {e}", n + 1))
            })
        })
        .collect()
}

fn read_input(path: &Path) -> Result<String, TicketrailError> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| TicketrailError::storage("<stdin>", e))?;
        return Ok(text);
    }
    std::fs::read_to_string(path).map_err(|e| TicketrailError::storage(path, e))
}

/// Processes every input through `pipeline`.
/// Records naming no contact are attributed to `contact` when given.
pub async fn ingest_inputs(
    pipeline: &Pipeline,
    inputs: &[PathBuf],
    contact: Option<&ContactId>,
) -> Result<IngestSummary, TicketrailError> {
    let mut summary = IngestSummary::default();
    for input in inputs {
        let text = read_input(input)?;
        let documents = parse_documents(&text)?;
        let mut offset = 0;
        let mut file_outcome = PayloadOutcome::default();
        for document in &documents {
            let processed = match contact {
                Some(contact) => pipeline.process_payload_for(contact, document).await,
                None => pipeline.process_payload(document).await,
            };
            let outcome = match processed {
                Ok(outcome) => outcome,
                Err(e) if e.is_malformed() => PayloadOutcome {
                    processed: Vec::new(),
                    rejected: vec![(0, e)],
                },
                Err(e) => return Err(e),
            };
            let count = outcome.processed.len() + outcome.rejected.len();
            file_outcome.merge(outcome, offset);
            offset += count;
        }
        for (index, err) in &file_outcome.rejected {
            warn!(input = %input.display(), index, error = %err, "record rejected");
        }
        info!(
            input = %input.display(),
            processed = file_outcome.processed.len(),
            rejected = file_outcome.rejected.len(),
            "input processed"
        );
        summary.inputs += 1;
        summary.add(&file_outcome);
    }
    summary.open_sessions = pipeline.open_sessions().await.len();
    Ok(summary)
}

/// Run the `ticketrail ingest` command.
pub async fn run_ingest(
    config: &TicketrailConfig,
    inputs: &[PathBuf],
    contact: Option<&str>,
    out: &Output,
) -> Result<(), TicketrailError> {
    let pipeline = Pipeline::from_config(config);
    let contact = contact.map(ContactId::from);
    let summary = ingest_inputs(&pipeline, inputs, contact.as_ref()).await?;

    if out.is_json() {
        return out.json(&summary);
    }
    out.heading("ingest finished");
    out.field("inputs", summary.inputs);
    out.field("processed", summary.processed);
    out.field("rejected", summary.rejected);
    for (kind, count) in &summary.by_kind {
        out.field(kind, count);
    }
    out.field("attentions written", summary.attentions.len());
    out.field("sessions still open", summary.open_sessions);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_document() {
        let docs = parse_documents(r#"[{"a": 1}, {"b": 2}]"#).unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].is_array());
    }

    #[test]
    fn falls_back_to_json_lines() {
        let docs = parse_documents("{\"a\": 1}\n\n{\"b\": 2}\n").unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn reports_bad_line_number() {
        let err = parse_documents("{\"a\": 1}\n{oops\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}

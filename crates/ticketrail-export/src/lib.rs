// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CSV exports for the Ticketrail session tracker.
//!
//! Owns the per-interaction column schema, the filesystem sinks the
//! pipeline writes through, cross-file consolidation, and the campaign
//! response report.

pub mod campaign;
pub mod consolidate;
pub mod schema;
pub mod writer;

pub use campaign::{CampaignDetail, CampaignReport, CampaignSummary, join_campaigns, summarize};
pub use consolidate::{ConsolidationOutput, Consolidator, list_csv_files};
pub use schema::{BOT_COLUMNS, BotRow, LIST_SEPARATOR, SessionExport, TEMPLATE_COLUMNS, TemplateRow};
pub use writer::{CsvAttentionSink, CsvRecordSink, encode_csv, sanitize_component, write_atomic};

// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sink traits for durable exports.
//!
//! Sinks use `#[async_trait]` so the pipeline can hold them as trait objects
//! and tests can substitute in-memory or failing implementations.

pub mod sink;

pub use sink::{AttentionSink, RawRecord, RecordSink};

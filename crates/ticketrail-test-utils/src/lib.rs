// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Ticketrail integration tests.
//!
//! # Components
//!
//! - [`fixtures`] - platform record builders (tickets, messages, status events, template sends)
//! - [`MemoryAttentionSink`] / [`MemoryRecordSink`] - capturing sinks with optional failure injection
//! - [`TestHarness`] - a pipeline writing real CSV files into a temp directory

pub mod fixtures;
pub mod harness;
pub mod sinks;

pub use harness::TestHarness;
pub use sinks::{MemoryAttentionSink, MemoryRecordSink};

// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory sinks for deterministic testing.
//!
//! Both sinks capture what they are given and can be switched into a
//! failing mode to exercise storage-error propagation.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use ticketrail_core::{Attention, AttentionSink, RawRecord, RecordSink, TicketrailError};

fn injected_failure(path: &str) -> TicketrailError {
    TicketrailError::storage(
        path,
        std::io::Error::new(std::io::ErrorKind::PermissionDenied, "injected failure"),
    )
}

/// Captures attentions instead of writing files.
#[derive(Debug, Default)]
pub struct MemoryAttentionSink {
    written: Mutex<Vec<Attention>>,
    fail: AtomicBool,
}

impl MemoryAttentionSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following write fail with a storage error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn attentions(&self) -> Vec<Attention> {
        self.written.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.written.lock().await.len()
    }
}

#[async_trait]
impl AttentionSink for MemoryAttentionSink {
    fn name(&self) -> &str {
        "memory-attentions"
    }

    async fn write_attention(&self, attention: &Attention) -> Result<PathBuf, TicketrailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(injected_failure("memory://attentions"));
        }
        let mut written = self.written.lock().await;
        written.push(attention.clone());
        Ok(PathBuf::from(format!(
            "memory://attentions/{}_{}.csv",
            attention.id,
            written.len()
        )))
    }
}

/// Captures raw records instead of writing files.
#[derive(Debug, Default)]
pub struct MemoryRecordSink {
    written: Mutex<Vec<RawRecord>>,
    fail: AtomicBool,
}

impl MemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn records(&self) -> Vec<RawRecord> {
        self.written.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.written.lock().await.len()
    }
}

#[async_trait]
impl RecordSink for MemoryRecordSink {
    fn name(&self) -> &str {
        "memory-records"
    }

    async fn write_record(&self, record: &RawRecord) -> Result<PathBuf, TicketrailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(injected_failure("memory://raw"));
        }
        let mut written = self.written.lock().await;
        written.push(record.clone());
        Ok(PathBuf::from(format!(
            "memory://raw/{}_{}.csv",
            record.kind,
            written.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use ticketrail_core::RecordKind;

    #[tokio::test]
    async fn record_sink_captures_and_fails_on_demand() {
        let sink = MemoryRecordSink::new();
        let record = RawRecord {
            kind: RecordKind::Message,
            canonical_date: "2024-05-01".to_string(),
            canonical_date_source: "date".to_string(),
            columns: BTreeMap::new(),
        };
        let path = sink.write_record(&record).await.unwrap();
        assert_eq!(path, PathBuf::from("memory://raw/message_1.csv"));
        sink.fail_writes(true);
        assert!(sink.write_record(&record).await.is_err());
        assert_eq!(sink.count().await, 1);
    }
}

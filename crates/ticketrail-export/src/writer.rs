// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CSV file writers.
//!
//! Per-interaction and raw per-record files are created with create-new
//! semantics and a monotonic `_<n>` suffix, so they are never overwritten.
//! Consolidated outputs are written to a temp file and renamed into place.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use ticketrail_core::{Attention, AttentionSink, RawRecord, RecordSink, TicketrailError};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::schema::SessionExport;

/// Column names that lead every raw export.
pub const RAW_LEADING_COLUMNS: &[&str] = &["canonical_date", "canonical_date_source"];

/// File name stem used when a record has no canonical date.
const UNDATED: &str = "undated";

pub(crate) fn csv_error(message: impl Into<String>, err: csv::Error) -> TicketrailError {
    TicketrailError::Export {
        message: message.into(),
        source: Some(Box::new(err)),
    }
}

/// Makes a value safe to use as one file name component.
pub fn sanitize_component(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '@' | '+') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Encodes a header plus rows into CSV bytes.
pub fn encode_csv<'a, H, R>(headers: H, rows: R) -> Result<Vec<u8>, TicketrailError>
where
    H: IntoIterator<Item = &'a str>,
    R: IntoIterator<Item = Vec<&'a str>>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(headers)
        .map_err(|e| csv_error("failed to encode header", e))?;
    for row in rows {
        writer
            .write_record(&row)
            .map_err(|e| csv_error("failed to encode row", e))?;
    }
    writer.into_inner().map_err(|e| TicketrailError::Export {
        message: "failed to flush csv buffer".to_string(),
        source: Some(Box::new(e.into_error())),
    })
}

/// Writes `bytes` to `path` through a temp file in the same directory and
/// an atomic rename.
pub async fn write_atomic(path: &Path, bytes: Vec<u8>) -> Result<(), TicketrailError> {
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| TicketrailError::storage(&dir, e))?;
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        use std::io::Write;
        let mut tmp =
            tempfile::NamedTempFile::new_in(&dir).map_err(|e| TicketrailError::storage(&dir, e))?;
        tmp.write_all(&bytes)
            .map_err(|e| TicketrailError::storage(tmp.path(), e))?;
        tmp.persist(&target)
            .map_err(|e| TicketrailError::storage(&target, e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| TicketrailError::Internal(format!("atomic write task failed: {e}")))?
}

/// Creates `<dir>/<stem>_<n>.csv` for the first free `n` and writes `bytes`.
///
/// `hints` remembers the next candidate per stem so a long-running process
/// does not stat every existing file on each write.
async fn create_unique(
    dir: &Path,
    stem: &str,
    bytes: &[u8],
    hints: &DashMap<String, u64>,
) -> Result<PathBuf, TicketrailError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| TicketrailError::storage(dir, e))?;
    let mut n = hints.get(stem).map(|h| *h).unwrap_or(1);
    loop {
        let path = dir.join(format!("{stem}_{n}.csv"));
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                file.write_all(bytes)
                    .await
                    .map_err(|e| TicketrailError::storage(&path, e))?;
                file.flush()
                    .await
                    .map_err(|e| TicketrailError::storage(&path, e))?;
                hints.insert(stem.to_string(), n + 1);
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(TicketrailError::storage(&path, e)),
        }
    }
}

/// Writes one CSV file per attention under the attentions directory.
#[derive(Debug)]
pub struct CsvAttentionSink {
    dir: PathBuf,
    next_index: DashMap<String, u64>,
}

impl CsvAttentionSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next_index: DashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl AttentionSink for CsvAttentionSink {
    fn name(&self) -> &str {
        "csv-attentions"
    }

    async fn write_attention(&self, attention: &Attention) -> Result<PathBuf, TicketrailError> {
        let rows = SessionExport::from_attention(attention);
        let Some(first) = rows.first() else {
            return Err(TicketrailError::Internal(format!(
                "attention {} has no sessions",
                attention.id
            )));
        };
        let bytes = encode_csv(
            first.headers().iter().copied(),
            rows.iter().map(SessionExport::to_record),
        )?;
        let date = if attention.close_date.is_empty() {
            UNDATED
        } else {
            attention.close_date.as_str()
        };
        let stem = format!(
            "{}_{}_{}",
            sanitize_component(attention.contact.as_str()),
            sanitize_component(date),
            sanitize_component(attention.id.as_str()),
        );
        let path = create_unique(&self.dir, &stem, &bytes, &self.next_index).await?;
        debug!(path = %path.display(), rows = rows.len(), "attention file created");
        Ok(path)
    }
}

/// Writes one CSV file per processed record under `<raw>/<kind>/`.
#[derive(Debug)]
pub struct CsvRecordSink {
    dir: PathBuf,
    next_index: DashMap<String, u64>,
}

impl CsvRecordSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next_index: DashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl RecordSink for CsvRecordSink {
    fn name(&self) -> &str {
        "csv-records"
    }

    async fn write_record(&self, record: &RawRecord) -> Result<PathBuf, TicketrailError> {
        let columns: Vec<(&str, &str)> = record
            .columns
            .iter()
            .filter(|(k, _)| !RAW_LEADING_COLUMNS.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let headers = RAW_LEADING_COLUMNS
            .iter()
            .copied()
            .chain(columns.iter().map(|(k, _)| *k));
        let mut row = vec![
            record.canonical_date.as_str(),
            record.canonical_date_source.as_str(),
        ];
        row.extend(columns.iter().map(|(_, v)| *v));
        let bytes = encode_csv(headers, [row])?;

        let kind = record.kind.to_string();
        let date = if record.canonical_date.is_empty() {
            UNDATED
        } else {
            record.canonical_date.as_str()
        };
        let stem = format!("{kind}_{}", sanitize_component(date));
        create_unique(&self.dir.join(&kind), &stem, &bytes, &self.next_index).await
    }
}

// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cross-file consolidation of per-interaction and raw exports.
//!
//! Consolidation is read-only over its sources and idempotent: the same
//! inputs and filter always produce byte-identical outputs, written by
//! atomic rename into the merged directory.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use csv::StringRecord;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use ticketrail_config::TicketrailConfig;
use ticketrail_core::{DateRange, RecordKind, TicketrailError};
use ticketrail_ingest::dates::{date_from_text, row_date};
use ticketrail_ingest::{Extractor, decode_agent_identity};
use tracing::{debug, info, warn};

use crate::schema::{BOT_COLUMNS, SessionExport, TEMPLATE_COLUMNS};
use crate::writer::{csv_error, encode_csv, sanitize_component, write_atomic};

/// Paths and counts produced by one consolidation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationOutput {
    /// `None` when no bot-origin row survived the filter.
    pub bot_path: Option<PathBuf>,
    /// `None` when no template-origin row survived the filter.
    pub template_path: Option<PathBuf>,
    pub bot_rows: usize,
    pub template_rows: usize,
    pub files_read: usize,
    pub files_skipped: usize,
}

/// A parsed CSV file.
#[derive(Debug, Clone)]
pub(crate) struct CsvSource {
    pub index: usize,
    pub path: PathBuf,
    pub headers: StringRecord,
    pub records: Vec<StringRecord>,
}

impl CsvSource {
    /// Cell lookup by column name for one record.
    pub fn cell<'a>(&'a self, record: &'a StringRecord, name: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| record.get(idx))
    }
}

/// A session row tagged with the position of the file it came from.
#[derive(Debug, Clone)]
struct LoadedRow {
    file_index: usize,
    row: SessionExport,
}

/// Filters applied to the latest version of each row before partitioning.
#[derive(Debug, Clone, Default)]
struct RowFilter {
    range: Option<DateRange>,
    /// Raw and decoded forms of the requested agent.
    agent: Option<(String, String)>,
    template_name: Option<String>,
}

impl RowFilter {
    fn keep(&self, row: &SessionExport) -> bool {
        let bot = row.bot();
        if let Some(range) = &self.range {
            match date_from_text(&bot.attention_close_date) {
                Some(date) if range.contains(date) => {}
                _ => return false,
            }
        }
        if let Some((raw, decoded)) = &self.agent
            && bot.agent != *raw
            && bot.agent != *decoded
        {
            return false;
        }
        if let Some(name) = &self.template_name {
            match row.template() {
                Some(t) if t.template_name == *name => {}
                _ => return false,
            }
        }
        true
    }

    fn label(&self) -> String {
        let mut parts = Vec::new();
        if let Some((raw, _)) = &self.agent {
            parts.push(format!("agent_{}", sanitize_component(raw)));
        }
        if let Some(name) = &self.template_name {
            parts.push(sanitize_component(name));
        }
        parts.push(range_label(self.range.as_ref()));
        parts.join("_")
    }
}

pub(crate) fn range_label(range: Option<&DateRange>) -> String {
    range.map_or_else(|| "all".to_string(), DateRange::label)
}

/// Reads export directories and writes consolidated outputs.
#[derive(Debug)]
pub struct Consolidator {
    pub(crate) output_dir: PathBuf,
    pub(crate) read_concurrency: usize,
    pub(crate) max_files: Option<usize>,
    pub(crate) date_candidates: Vec<String>,
    pub(crate) extractor: Extractor,
}

impl Consolidator {
    pub fn new(config: &TicketrailConfig) -> Self {
        Self {
            output_dir: config.storage.merged_dir(),
            read_concurrency: config.consolidation.read_concurrency.max(1),
            max_files: config.consolidation.max_files,
            date_candidates: config.dates.candidate_fields.clone(),
            extractor: Extractor::new(config),
        }
    }

    /// Overrides where consolidated files are written.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Overrides the per-run source file limit (`None` reads everything).
    pub fn with_max_files(mut self, max_files: Option<usize>) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Merges every per-interaction file in `source_dir`, optionally keeping
    /// only attentions closed within `range`.
    pub async fn consolidate(
        &self,
        source_dir: &Path,
        range: Option<DateRange>,
    ) -> Result<ConsolidationOutput, TicketrailError> {
        let filter = RowFilter {
            range,
            ..RowFilter::default()
        };
        self.run(source_dir, &filter).await
    }

    /// Like [`Self::consolidate`], restricted to one agent (raw or decoded
    /// identity) and optionally one template name.
    pub async fn consolidate_by_agent(
        &self,
        source_dir: &Path,
        agent: &str,
        range: Option<DateRange>,
        template_name: Option<&str>,
    ) -> Result<ConsolidationOutput, TicketrailError> {
        let filter = RowFilter {
            range,
            agent: Some((agent.to_string(), decode_agent_identity(agent))),
            template_name: template_name.map(str::to_string),
        };
        self.run(source_dir, &filter).await
    }

    async fn run(
        &self,
        source_dir: &Path,
        filter: &RowFilter,
    ) -> Result<ConsolidationOutput, TicketrailError> {
        let (rows, files_read, files_skipped) = self.load_session_rows(source_dir).await?;
        let total = rows.len();
        let (template, bot): (Vec<SessionExport>, Vec<SessionExport>) = dedupe(rows)
            .into_iter()
            .filter(|row| filter.keep(row))
            .partition(|row| row.template().is_some());

        let label = filter.label();
        let bot_path = self.write_partition(&format!("bot_{label}.csv"), BOT_COLUMNS, &bot).await?;
        let template_path = self
            .write_partition(&format!("template_{label}.csv"), TEMPLATE_COLUMNS, &template)
            .await?;

        info!(
            source = %source_dir.display(),
            filter = %label,
            rows_read = total,
            bot_rows = bot.len(),
            template_rows = template.len(),
            files_read,
            files_skipped,
            "consolidation finished"
        );
        Ok(ConsolidationOutput {
            bot_path,
            template_path,
            bot_rows: bot.len(),
            template_rows: template.len(),
            files_read,
            files_skipped,
        })
    }

    async fn write_partition(
        &self,
        name: &str,
        columns: &[&str],
        rows: &[SessionExport],
    ) -> Result<Option<PathBuf>, TicketrailError> {
        if rows.is_empty() {
            debug!(output = name, "partition empty, nothing written");
            return Ok(None);
        }
        let bytes = encode_csv(columns.iter().copied(), rows.iter().map(SessionExport::to_record))?;
        let path = self.output_dir.join(name);
        write_atomic(&path, bytes).await?;
        Ok(Some(path))
    }

    /// Parses every per-interaction file. Returns rows, files read, and
    /// files skipped as corrupt.
    async fn load_session_rows(
        &self,
        dir: &Path,
    ) -> Result<(Vec<LoadedRow>, usize, usize), TicketrailError> {
        let sources = self.read_sources(dir).await?;
        let mut skipped = sources.skipped;
        let mut rows = Vec::new();
        for source in &sources.files {
            let parsed: Result<Vec<SessionExport>, TicketrailError> = source
                .records
                .iter()
                .map(|record| SessionExport::from_record(&source.headers, record))
                .collect();
            match parsed {
                Ok(parsed) => rows.extend(parsed.into_iter().map(|row| LoadedRow {
                    file_index: source.index,
                    row,
                })),
                Err(e) => {
                    warn!(path = %source.path.display(), error = %e, "skipping corrupt export file");
                    skipped += 1;
                }
            }
        }
        Ok((rows, sources.files.len(), skipped))
    }

    /// Lists and parses the CSV files of `dir` with bounded, order-preserving
    /// concurrency. Unreadable files are skipped with a warning.
    pub(crate) async fn read_sources(&self, dir: &Path) -> Result<SourceSet, TicketrailError> {
        let paths = list_csv_files(dir, self.max_files).await?;
        let results: Vec<(usize, PathBuf, Result<(StringRecord, Vec<StringRecord>), TicketrailError>)> =
            stream::iter(paths.into_iter().enumerate())
                .map(|(index, path)| async move {
                    let parsed = read_csv(&path).await;
                    (index, path, parsed)
                })
                .buffered(self.read_concurrency)
                .collect()
                .await;

        let mut set = SourceSet::default();
        for (index, path, parsed) in results {
            match parsed {
                Ok((headers, records)) => set.files.push(CsvSource {
                    index,
                    path,
                    headers,
                    records,
                }),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable export file");
                    set.skipped += 1;
                }
            }
        }
        Ok(set)
    }

    /// Concatenates the raw exports of one record kind, with the union of
    /// headers in first-seen order.
    pub async fn consolidate_by_type(
        &self,
        raw_dir: &Path,
        kind: RecordKind,
        range: Option<DateRange>,
    ) -> Result<Option<PathBuf>, TicketrailError> {
        let sources = self.read_sources(&raw_dir.join(kind.to_string())).await?;

        let mut headers: Vec<String> = Vec::new();
        for source in &sources.files {
            for h in source.headers.iter() {
                if !headers.iter().any(|known| known == h) {
                    headers.push(h.to_string());
                }
            }
        }

        let mut rows: Vec<Vec<&str>> = Vec::new();
        for source in &sources.files {
            for record in &source.records {
                if let Some(range) = &range {
                    match self.raw_row_date(source, record) {
                        Some(date) if range.contains(date) => {}
                        _ => continue,
                    }
                }
                rows.push(
                    headers
                        .iter()
                        .map(|h| source.cell(record, h).unwrap_or_default())
                        .collect(),
                );
            }
        }

        if rows.is_empty() {
            info!(kind = %kind, files = sources.files.len(), "no raw rows matched, nothing written");
            return Ok(None);
        }
        let bytes = encode_csv(headers.iter().map(String::as_str), rows.iter().cloned())?;
        let path = self
            .output_dir
            .join(format!("{kind}_{}.csv", range_label(range.as_ref())));
        write_atomic(&path, bytes).await?;
        info!(kind = %kind, rows = rows.len(), path = %path.display(), "raw export consolidated");
        Ok(Some(path))
    }

    /// `canonical_date` when present and non-empty, else date extraction over
    /// the row's cells. No processing-date fallback.
    pub(crate) fn raw_row_date(
        &self,
        source: &CsvSource,
        record: &StringRecord,
    ) -> Option<chrono::NaiveDate> {
        if let Some(cell) = source.cell(record, "canonical_date")
            && !cell.trim().is_empty()
        {
            return date_from_text(cell);
        }
        row_date(|key| source.cell(record, key), &self.date_candidates)
    }

    /// Sorted distinct non-empty agents across the latest session rows.
    pub async fn list_unique_agents(&self, dir: &Path) -> Result<Vec<String>, TicketrailError> {
        let (rows, _, _) = self.load_session_rows(dir).await?;
        let rows = dedupe(rows);
        Ok(distinct(rows.iter().map(|r| r.bot().agent.as_str())))
    }

    /// Sorted distinct non-empty template names across the latest session rows.
    pub async fn list_unique_templates(&self, dir: &Path) -> Result<Vec<String>, TicketrailError> {
        let (rows, _, _) = self.load_session_rows(dir).await?;
        let rows = dedupe(rows);
        Ok(distinct(
            rows.iter()
                .filter_map(|r| r.template().map(|t| t.template_name.as_str())),
        ))
    }

    /// Latest version of every session row in `dir` (template partition only).
    pub(crate) async fn template_rows(
        &self,
        dir: &Path,
    ) -> Result<Vec<SessionExport>, TicketrailError> {
        let (rows, _, _) = self.load_session_rows(dir).await?;
        Ok(dedupe(rows)
            .into_iter()
            .filter(|row| row.template().is_some())
            .collect())
    }
}

/// Parsed files of one directory plus the count of skipped ones.
#[derive(Debug, Default)]
pub(crate) struct SourceSet {
    pub files: Vec<CsvSource>,
    pub skipped: usize,
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = values
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    out.sort();
    out.dedup();
    out
}

/// Keeps the latest version of every ticket row, keyed by
/// `(contact_id, ticket_id)`.
///
/// Each attention file is one version of its chain. A ticket's row comes from
/// the version with the most members, then the longer history, then the
/// later close time, then the later file. Rows of a chain that a late parent
/// re-rooted are therefore replaced by the re-rooted version. Output is
/// ordered by attention open time, then ticket open time.
fn dedupe(rows: Vec<LoadedRow>) -> Vec<SessionExport> {
    let mut members: HashMap<(usize, String), usize> = HashMap::new();
    for row in &rows {
        *members
            .entry((row.file_index, row.row.attention_id().to_string()))
            .or_default() += 1;
    }
    let rank = |row: &LoadedRow| {
        let bot = row.row.bot();
        let size = members
            .get(&(row.file_index, bot.attention_id.clone()))
            .copied()
            .unwrap_or_default();
        (size, bot.history_len(), bot.attention_close.clone(), row.file_index)
    };

    let mut best: HashMap<(String, String), LoadedRow> = HashMap::new();
    for row in rows {
        let (contact_id, ticket_id) = row.row.key();
        let key = (contact_id.to_string(), ticket_id.to_string());
        match best.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(mut slot) => {
                if rank(&row) > rank(slot.get()) {
                    slot.insert(row);
                }
            }
        }
    }

    let mut out: Vec<SessionExport> = best.into_values().map(|r| r.row).collect();
    out.sort_by(|a, b| {
        let (a, b) = (a.bot(), b.bot());
        (&a.attention_open, &a.attention_id, &a.ticket_open, &a.ticket_id).cmp(&(
            &b.attention_open,
            &b.attention_id,
            &b.ticket_open,
            &b.ticket_id,
        ))
    });
    out
}

/// Lists `*.csv` files of `dir` sorted by name. A missing directory is empty.
///
/// With a limit, only the `max_files` most recently modified files are kept.
pub async fn list_csv_files(
    dir: &Path,
    max_files: Option<usize>,
) -> Result<Vec<PathBuf>, TicketrailError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "source directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(TicketrailError::storage(dir, e)),
    };

    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| TicketrailError::storage(dir, e))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if meta.is_file() {
            files.push((meta.modified().unwrap_or(SystemTime::UNIX_EPOCH), path));
        }
    }

    if let Some(limit) = max_files
        && files.len() > limit
    {
        files.sort();
        let dropped = files.len() - limit;
        files.drain(..dropped);
        info!(dir = %dir.display(), dropped, kept = limit, "file limit reached, oldest files left out");
    }

    let mut paths: Vec<PathBuf> = files.into_iter().map(|(_, p)| p).collect();
    paths.sort();
    Ok(paths)
}

/// Reads one CSV file into its header and records.
async fn read_csv(path: &Path) -> Result<(StringRecord, Vec<StringRecord>), TicketrailError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| TicketrailError::storage(path, e))?;
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let headers = reader
        .headers()
        .map_err(|e| csv_error(format!("bad header in {}", path.display()), e))?
        .clone();
    let records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| csv_error(format!("bad record in {}", path.display()), e))?;
    Ok((headers, records))
}

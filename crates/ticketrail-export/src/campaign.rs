// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign join: template sends matched against template-origin sessions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use ticketrail_core::{DateRange, RecordKind, TemplateSend, TicketrailError, format_timestamp};
use ticketrail_ingest::{CanonicalDate, FlatRecord, TypedRecord};
use tracing::{info, warn};

use crate::consolidate::{Consolidator, range_label};
use crate::schema::{SessionExport, TemplateRow};
use crate::writer::{RAW_LEADING_COLUMNS, encode_csv, write_atomic};

pub const DETAIL_COLUMNS: &[&str] = &[
    "contact_id",
    "template_id",
    "template_name",
    "template_body",
    "template_params",
    "campaign_id",
    "sent_at",
    "attention_id",
    "ticket_id",
    "attention_open",
    "attention_close",
    "agent",
    "closure_reason",
    "replied",
    "reply_type",
    "reply_content",
    "reply_at",
];

pub const SUMMARY_COLUMNS: &[&str] = &["template_name", "sent", "replied", "response_rate"];

/// One template send joined with one matching session row (or none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignDetail {
    /// Position of the send in the input slice.
    pub send_index: usize,
    pub contact_id: String,
    pub template_id: String,
    pub template_name: String,
    pub template_body: String,
    pub template_params: String,
    pub campaign_id: String,
    pub sent_at: String,
    pub attention_id: String,
    pub ticket_id: String,
    pub attention_open: String,
    pub attention_close: String,
    pub agent: String,
    pub closure_reason: String,
    pub replied: String,
    pub reply_type: String,
    pub reply_content: String,
    pub reply_at: String,
}

impl CampaignDetail {
    fn new(send_index: usize, send: &TemplateSend, row: Option<&TemplateRow>) -> Self {
        let blank = TemplateRow::default();
        let row = row.unwrap_or(&blank);
        Self {
            send_index,
            contact_id: send.contact.to_string(),
            template_id: send.template_id.clone(),
            template_name: send.template_name.clone(),
            template_body: send.template_body.clone(),
            template_params: send.template_params.clone(),
            campaign_id: send.campaign_id.clone(),
            sent_at: format_timestamp(&send.sent_at),
            attention_id: row.bot.attention_id.clone(),
            ticket_id: row.bot.ticket_id.clone(),
            attention_open: row.bot.attention_open.clone(),
            attention_close: row.bot.attention_close.clone(),
            agent: row.bot.agent.clone(),
            closure_reason: row.bot.closure_reason.clone(),
            replied: row.replied.clone(),
            reply_type: row.reply_type.clone(),
            reply_content: row.reply_content.clone(),
            reply_at: row.reply_at.clone(),
        }
    }

    pub fn is_reply(&self) -> bool {
        self.replied == "true"
    }

    fn to_record(&self) -> Vec<&str> {
        vec![
            self.contact_id.as_str(),
            self.template_id.as_str(),
            self.template_name.as_str(),
            self.template_body.as_str(),
            self.template_params.as_str(),
            self.campaign_id.as_str(),
            self.sent_at.as_str(),
            self.attention_id.as_str(),
            self.ticket_id.as_str(),
            self.attention_open.as_str(),
            self.attention_close.as_str(),
            self.agent.as_str(),
            self.closure_reason.as_str(),
            self.replied.as_str(),
            self.reply_type.as_str(),
            self.reply_content.as_str(),
            self.reply_at.as_str(),
        ]
    }
}

/// Per-template response summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignSummary {
    pub template_name: String,
    pub sent: usize,
    pub replied: usize,
    /// `replied / sent * 100`, rounded to two decimals.
    pub response_rate: f64,
}

/// Output of [`Consolidator::campaign_report`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CampaignReport {
    pub detail_path: Option<PathBuf>,
    pub summary_path: Option<PathBuf>,
    pub detail_rows: usize,
    pub summary: Vec<CampaignSummary>,
}

fn row_matches(send: &TemplateSend, row: &TemplateRow) -> bool {
    if row.bot.contact_id != send.contact.as_str() {
        return false;
    }
    let same_campaign = !send.campaign_id.is_empty() && send.campaign_id == row.campaign_id;
    let same_template = !send.template_name.is_empty() && send.template_name == row.template_name;
    same_campaign || same_template
}

/// Emits one detail per matching template-origin row, or a single detail
/// with blank response fields when nothing matches.
pub fn join_campaigns(sends: &[TemplateSend], rows: &[TemplateRow]) -> Vec<CampaignDetail> {
    let mut details = Vec::new();
    for (index, send) in sends.iter().enumerate() {
        let before = details.len();
        details.extend(
            rows.iter()
                .filter(|row| row_matches(send, row))
                .map(|row| CampaignDetail::new(index, send, Some(row))),
        );
        if details.len() == before {
            details.push(CampaignDetail::new(index, send, None));
        }
    }
    details
}

/// Groups sends by template name. A send counts as replied when any of its
/// matched sessions recorded a reply.
pub fn summarize(sends: &[TemplateSend], details: &[CampaignDetail]) -> Vec<CampaignSummary> {
    let mut groups: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for (index, send) in sends.iter().enumerate() {
        let replied = details
            .iter()
            .any(|d| d.send_index == index && d.is_reply());
        let entry = groups.entry(send.template_name.as_str()).or_default();
        entry.0 += 1;
        if replied {
            entry.1 += 1;
        }
    }
    groups
        .into_iter()
        .map(|(name, (sent, replied))| CampaignSummary {
            template_name: name.to_string(),
            sent,
            replied,
            response_rate: response_rate(sent, replied),
        })
        .collect()
}

/// Percentage rounded to two decimals; zero when nothing was sent.
pub fn response_rate(sent: usize, replied: usize) -> f64 {
    if sent == 0 {
        return 0.0;
    }
    let rate = replied as f64 / sent as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

impl Consolidator {
    /// Joins raw template-send exports with per-interaction template rows
    /// and writes detail and summary files.
    pub async fn campaign_report(
        &self,
        raw_dir: &Path,
        attentions_dir: &Path,
        range: Option<DateRange>,
    ) -> Result<CampaignReport, TicketrailError> {
        let sends = self.template_sends(raw_dir, range.as_ref()).await?;
        let rows: Vec<TemplateRow> = self
            .template_rows(attentions_dir)
            .await?
            .into_iter()
            .filter_map(|row| match row {
                SessionExport::Template(row) => Some(row),
                SessionExport::Bot(_) => None,
            })
            .collect();

        let details = join_campaigns(&sends, &rows);
        let summary = summarize(&sends, &details);
        if sends.is_empty() {
            info!("no template sends matched, campaign report not written");
            return Ok(CampaignReport::default());
        }

        let label = range_label(range.as_ref());
        let detail_path = self.output_dir.join(format!("campaign_detail_{label}.csv"));
        let bytes = encode_csv(
            DETAIL_COLUMNS.iter().copied(),
            details.iter().map(CampaignDetail::to_record),
        )?;
        write_atomic(&detail_path, bytes).await?;

        let summary_cells: Vec<[String; 4]> = summary
            .iter()
            .map(|s| {
                [
                    s.template_name.clone(),
                    s.sent.to_string(),
                    s.replied.to_string(),
                    format!("{:.2}", s.response_rate),
                ]
            })
            .collect();
        let summary_path = self.output_dir.join(format!("campaign_summary_{label}.csv"));
        let bytes = encode_csv(
            SUMMARY_COLUMNS.iter().copied(),
            summary_cells
                .iter()
                .map(|cells| cells.iter().map(String::as_str).collect()),
        )?;
        write_atomic(&summary_path, bytes).await?;

        info!(
            sends = sends.len(),
            details = details.len(),
            templates = summary.len(),
            "campaign report written"
        );
        Ok(CampaignReport {
            detail_path: Some(detail_path),
            summary_path: Some(summary_path),
            detail_rows: details.len(),
            summary,
        })
    }

    /// Re-extracts template sends from their raw exports.
    async fn template_sends(
        &self,
        raw_dir: &Path,
        range: Option<&DateRange>,
    ) -> Result<Vec<TemplateSend>, TicketrailError> {
        let sources = self
            .read_sources(&raw_dir.join(RecordKind::TemplateSend.to_string()))
            .await?;
        let mut sends = Vec::new();
        for source in &sources.files {
            for record in &source.records {
                let date = self.raw_row_date(source, record);
                if let Some(range) = range
                    && !date.is_some_and(|d| range.contains(d))
                {
                    continue;
                }
                let flat = FlatRecord::from_columns(
                    source
                        .headers
                        .iter()
                        .zip(record.iter())
                        .filter(|(h, _)| !RAW_LEADING_COLUMNS.contains(h)),
                );
                let canonical = CanonicalDate {
                    date: date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
                    source: source.cell(record, "canonical_date_source").unwrap_or_default().to_string(),
                };
                // Sends without a timestamp are stamped at the start of their date.
                let fallback: DateTime<Utc> = date
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|n| n.and_utc())
                    .unwrap_or(DateTime::UNIX_EPOCH);
                match self
                    .extractor
                    .extract(RecordKind::TemplateSend, &flat, &canonical, fallback)
                {
                    Ok(TypedRecord::TemplateSend(send)) => sends.push(send),
                    Ok(_) => {}
                    Err(e) => {
                        warn!(path = %source.path.display(), error = %e, "skipping template send row");
                    }
                }
            }
        }
        Ok(sends)
    }
}

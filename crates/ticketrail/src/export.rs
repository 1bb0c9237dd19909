// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Export subcommands: consolidation, listings, and the campaign report.

use std::path::{Path, PathBuf};

use ticketrail_config::TicketrailConfig;
use ticketrail_core::{DateRange, RecordKind, TicketrailError};
use ticketrail_export::{ConsolidationOutput, Consolidator};

use crate::output::Output;
use crate::{DirArgs, RangeArgs};

/// Both bounds or neither.
pub(crate) fn parse_range(args: &RangeArgs) -> Result<Option<DateRange>, TicketrailError> {
    match (&args.from, &args.to) {
        (Some(from), Some(to)) => DateRange::parse(from, to).map(Some),
        (None, None) => Ok(None),
        _ => Err(TicketrailError::InvalidInput(
            "--from and --to must be given together".to_string(),
        )),
    }
}

fn consolidator(config: &TicketrailConfig, dirs: &DirArgs) -> Consolidator {
    let consolidator = Consolidator::new(config);
    match &dirs.output {
        Some(dir) => consolidator.with_output_dir(dir),
        None => consolidator,
    }
}

fn source_dir(config: &TicketrailConfig, dirs: &DirArgs) -> PathBuf {
    dirs.source
        .clone()
        .unwrap_or_else(|| config.storage.attentions_dir())
}

fn report_consolidation(out: &Output, output: &ConsolidationOutput) -> Result<(), TicketrailError> {
    if out.is_json() {
        return out.json(output);
    }
    out.heading("consolidation finished");
    out.file("bot export", output.bot_path.as_deref());
    out.field("bot rows", output.bot_rows);
    out.file("template export", output.template_path.as_deref());
    out.field("template rows", output.template_rows);
    out.field("files read", output.files_read);
    out.field("files skipped", output.files_skipped);
    Ok(())
}

/// Run the `ticketrail consolidate` command.
pub async fn run_consolidate(
    config: &TicketrailConfig,
    range: &RangeArgs,
    dirs: &DirArgs,
    out: &Output,
) -> Result<(), TicketrailError> {
    let range = parse_range(range)?;
    let output = consolidator(config, dirs)
        .consolidate(&source_dir(config, dirs), range)
        .await?;
    report_consolidation(out, &output)
}

/// Run the `ticketrail agent-export` command.
pub async fn run_agent_export(
    config: &TicketrailConfig,
    agent: &str,
    template: Option<&str>,
    range: &RangeArgs,
    dirs: &DirArgs,
    out: &Output,
) -> Result<(), TicketrailError> {
    let range = parse_range(range)?;
    let output = consolidator(config, dirs)
        .consolidate_by_agent(&source_dir(config, dirs), agent, range, template)
        .await?;
    report_consolidation(out, &output)
}

/// Run the `ticketrail kind-export` command. The source defaults to the raw directory.
pub async fn run_kind_export(
    config: &TicketrailConfig,
    kind: RecordKind,
    range: &RangeArgs,
    dirs: &DirArgs,
    out: &Output,
) -> Result<(), TicketrailError> {
    let range = parse_range(range)?;
    let raw_dir = dirs.source.clone().unwrap_or_else(|| config.storage.raw_dir());
    let path = consolidator(config, dirs)
        .consolidate_by_type(&raw_dir, kind, range)
        .await?;
    if out.is_json() {
        return out.json(&serde_json::json!({ "kind": kind, "path": path }));
    }
    out.heading(&format!("{kind} export finished"));
    out.file("export", path.as_deref());
    Ok(())
}

/// Run the `ticketrail agents` command.
pub async fn run_agents(
    config: &TicketrailConfig,
    dirs: &DirArgs,
    out: &Output,
) -> Result<(), TicketrailError> {
    let agents = consolidator(config, dirs)
        .list_unique_agents(&source_dir(config, dirs))
        .await?;
    if out.is_json() {
        return out.json(&agents);
    }
    out.list(&agents);
    Ok(())
}

/// Run the `ticketrail templates` command.
pub async fn run_templates(
    config: &TicketrailConfig,
    dirs: &DirArgs,
    out: &Output,
) -> Result<(), TicketrailError> {
    let templates = consolidator(config, dirs)
        .list_unique_templates(&source_dir(config, dirs))
        .await?;
    if out.is_json() {
        return out.json(&templates);
    }
    out.list(&templates);
    Ok(())
}

/// Run the `ticketrail campaigns` command.
pub async fn run_campaigns(
    config: &TicketrailConfig,
    range: &RangeArgs,
    raw: Option<&Path>,
    dirs: &DirArgs,
    out: &Output,
) -> Result<(), TicketrailError> {
    let range = parse_range(range)?;
    let raw_dir = raw.map_or_else(|| config.storage.raw_dir(), Path::to_path_buf);
    let report = consolidator(config, dirs)
        .campaign_report(&raw_dir, &source_dir(config, dirs), range)
        .await?;
    if out.is_json() {
        return out.json(&report);
    }
    out.heading("campaign report finished");
    out.file("detail", report.detail_path.as_deref());
    out.file("summary", report.summary_path.as_deref());
    for summary in &report.summary {
        out.field(
            &summary.template_name,
            format!(
                "{} sent, {} replied ({:.2}%)",
                summary.sent, summary.replied, summary.response_rate
            ),
        );
    }
    Ok(())
}

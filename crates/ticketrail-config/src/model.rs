// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Ticketrail session tracker.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages. The
//! heuristic tables (closure triggers, classifier shapes, date candidates)
//! live here so they can be tuned without code changes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level Ticketrail configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TicketrailConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Output directory layout.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session registry retention limits.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Closure detector trigger tables.
    #[serde(default)]
    pub closure: ClosureConfig,

    /// Record classifier shapes.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Canonical date extraction.
    #[serde(default)]
    pub dates: DatesConfig,

    /// Transcript rendering and emitter heuristics.
    #[serde(default)]
    pub transcript: TranscriptConfig,

    /// Template campaign attribution.
    #[serde(default)]
    pub campaign: CampaignConfig,

    /// Consolidation limits.
    #[serde(default)]
    pub consolidation: ConsolidationConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in log lines.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "ticketrail".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Output directory layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Root directory for every export.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Subdirectory (under `output_dir`) holding one file per closed chain.
    #[serde(default = "default_attentions_subdir")]
    pub attentions_subdir: String,

    /// Subdirectory holding one file per processed record, grouped by kind.
    #[serde(default = "default_raw_subdir")]
    pub raw_subdir: String,

    /// Subdirectory for consolidated outputs.
    #[serde(default = "default_merged_subdir")]
    pub merged_subdir: String,
}

impl StorageConfig {
    pub fn attentions_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_dir).join(&self.attentions_subdir)
    }

    pub fn raw_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_dir).join(&self.raw_subdir)
    }

    pub fn merged_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_dir).join(&self.merged_subdir)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            attentions_subdir: default_attentions_subdir(),
            raw_subdir: default_raw_subdir(),
            merged_subdir: default_merged_subdir(),
        }
    }
}

fn default_output_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("ticketrail").join("exports"))
        .unwrap_or_else(|| PathBuf::from("./exports"))
        .to_string_lossy()
        .to_string()
}

fn default_attentions_subdir() -> String {
    "attentions".to_string()
}

fn default_raw_subdir() -> String {
    "raw".to_string()
}

fn default_merged_subdir() -> String {
    "merged".to_string()
}

/// Session registry retention limits (per contact).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Closed sessions kept per contact for chain reconstruction.
    #[serde(default = "default_max_closed_sessions")]
    pub max_closed_sessions: usize,

    /// Messages kept per contact for transcript backfill.
    #[serde(default = "default_max_retained_messages")]
    pub max_retained_messages: usize,

    /// Template sends kept per contact for campaign attribution.
    #[serde(default = "default_max_template_sends")]
    pub max_template_sends: usize,

    /// A contact with no OPEN session and no record newer than this many
    /// hours (behind the newest record seen) is forgotten.
    #[serde(default = "default_idle_contact_hours")]
    pub idle_contact_hours: u32,

    /// Idle contacts are swept after every this many session closures.
    #[serde(default = "default_idle_sweep_every")]
    pub idle_sweep_every: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_closed_sessions: default_max_closed_sessions(),
            max_retained_messages: default_max_retained_messages(),
            max_template_sends: default_max_template_sends(),
            idle_contact_hours: default_idle_contact_hours(),
            idle_sweep_every: default_idle_sweep_every(),
        }
    }
}

fn default_max_closed_sessions() -> usize {
    64
}

fn default_max_retained_messages() -> usize {
    1000
}

fn default_max_template_sends() -> usize {
    32
}

fn default_idle_contact_hours() -> u32 {
    72
}

fn default_idle_sweep_every() -> usize {
    256
}

/// Closure detector trigger tables. All matching is case-insensitive.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClosureConfig {
    /// Phrases searched for in the previous state name.
    #[serde(default = "default_previous_state_names")]
    pub previous_state_names: Vec<String>,

    /// Prefixes matched against the start of the previous state id.
    #[serde(default = "default_previous_state_id_prefixes")]
    pub previous_state_id_prefixes: Vec<String>,

    /// Phrases searched for in the event action.
    #[serde(default = "default_actions")]
    pub actions: Vec<String>,
}

impl Default for ClosureConfig {
    fn default() -> Self {
        Self {
            previous_state_names: default_previous_state_names(),
            previous_state_id_prefixes: default_previous_state_id_prefixes(),
            actions: default_actions(),
        }
    }
}

fn default_previous_state_names() -> Vec<String> {
    vec![
        "atendimento humano".to_string(),
        "atención humana".to_string(),
        "atencion humana".to_string(),
        "human attendance".to_string(),
    ]
}

fn default_previous_state_id_prefixes() -> Vec<String> {
    vec!["desk".to_string()]
}

fn default_actions() -> Vec<String> {
    vec!["survey".to_string()]
}

/// Record classifier shapes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Content type of session (ticket) notices.
    #[serde(default = "default_session_content_type")]
    pub session_content_type: String,

    /// Leaf field names that only appear on session notices.
    #[serde(default = "default_session_fields")]
    pub session_fields: Vec<String>,

    /// Values of `content.type` that mark an outbound template.
    #[serde(default = "default_template_content_types")]
    pub template_content_types: Vec<String>,

    /// Flat keys whose presence marks an outbound template.
    #[serde(default = "default_template_keys")]
    pub template_keys: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            session_content_type: default_session_content_type(),
            session_fields: default_session_fields(),
            template_content_types: default_template_content_types(),
            template_keys: default_template_keys(),
        }
    }
}

fn default_session_content_type() -> String {
    "application/vnd.iris.ticket+json".to_string()
}

fn default_session_fields() -> Vec<String> {
    vec!["sequentialId".to_string(), "parentSequentialId".to_string()]
}

fn default_template_content_types() -> Vec<String> {
    vec!["template".to_string()]
}

fn default_template_keys() -> Vec<String> {
    vec!["content.template.name".to_string(), "template.name".to_string()]
}

/// What to do when a record carries no parseable date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDatePolicy {
    /// Stamp the processing date. Such records land in "today" exports.
    Today,
    /// Leave the canonical date empty. Date-filtered exports drop such records.
    Empty,
}

/// Canonical date extraction.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatesConfig {
    /// Flat keys scanned in priority order; the first valid date wins.
    #[serde(default = "default_candidate_fields")]
    pub candidate_fields: Vec<String>,

    /// Fallback applied when no candidate yields a date.
    #[serde(default = "default_missing_date_policy")]
    pub missing_date_policy: MissingDatePolicy,
}

impl Default for DatesConfig {
    fn default() -> Self {
        Self {
            candidate_fields: default_candidate_fields(),
            missing_date_policy: default_missing_date_policy(),
        }
    }
}

fn default_candidate_fields() -> Vec<String> {
    [
        "metadata.envelope.storageDate",
        "metadata.#envelope.storageDate",
        "metadata.#wa.timestamp",
        "storageDate",
        "content.storageDate",
        "processedDate",
        "date",
        "lastMessageDate",
        "content.lastMessageDate",
        "timestamp",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_missing_date_policy() -> MissingDatePolicy {
    MissingDatePolicy::Today
}

/// Transcript rendering and emitter heuristics.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TranscriptConfig {
    /// Address suffixes that identify the business (bot) side.
    #[serde(default = "default_business_domains")]
    pub business_domains: Vec<String>,

    /// Metadata values that flag a message as written by a human attendant.
    #[serde(default = "default_human_markers")]
    pub human_markers: Vec<String>,

    /// Separator placed between transcript lines (written literally).
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            business_domains: default_business_domains(),
            human_markers: default_human_markers(),
            separator: default_separator(),
        }
    }
}

fn default_business_domains() -> Vec<String> {
    vec!["@msging.net".to_string(), "@desk.msging.net".to_string()]
}

fn default_human_markers() -> Vec<String> {
    vec!["human".to_string(), "agent".to_string()]
}

fn default_separator() -> String {
    "\\n".to_string()
}

/// Template campaign attribution.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignConfig {
    /// How long after a template send a new session is still attributed to it.
    #[serde(default = "default_attribution_window_hours")]
    pub attribution_window_hours: u32,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            attribution_window_hours: default_attribution_window_hours(),
        }
    }
}

fn default_attribution_window_hours() -> u32 {
    24
}

/// Consolidation limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConsolidationConfig {
    /// Maximum number of source files read per run. `None` reads everything.
    #[serde(default)]
    pub max_files: Option<usize>,

    /// Number of source files read concurrently.
    #[serde(default = "default_read_concurrency")]
    pub read_concurrency: usize,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            max_files: None,
            read_concurrency: default_read_concurrency(),
        }
    }
}

fn default_read_concurrency() -> usize {
    8
}

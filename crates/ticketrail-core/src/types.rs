// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by ingestion, the session registry, and exports.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::TicketrailError;

/// Identifier of the customer on the other side of a conversation
/// (the local part of the contact address, e.g. a phone number).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContactId(pub String);

impl ContactId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContactId {
    fn from(value: &str) -> Self {
        ContactId(value.to_string())
    }
}

/// Platform sequence id of a session (ticket). Globally unique within the
/// observation window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SequenceId(pub String);

impl SequenceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SequenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SequenceId {
    fn from(value: &str) -> Self {
        SequenceId(value.to_string())
    }
}

/// The fixed set of record kinds the classifier can assign.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum RecordKind {
    SessionNotice,
    TemplateSend,
    Message,
    StatusEvent,
    ContactProfile,
    Unknown,
}

/// Whether an attention was started by the bot flow or by an outbound template.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OriginType {
    Bot,
    Template,
}

/// Which closure rule fired for a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClosureReason {
    /// The flow left a human-attendance state.
    HumanAttendanceExit,
    /// The flow left a desk state (previous state id with the desk prefix).
    DeskStateExit,
    /// A satisfaction survey action was tracked.
    SurveyAction,
}

/// Who wrote a message, as rendered in transcripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Emitter {
    Agent,
    Bot,
    Customer,
}

/// Inclusive range of canonical dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range, rejecting a start that lies after the end.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TicketrailError> {
        if start > end {
            return Err(TicketrailError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parses two `YYYY-MM-DD` strings into a range.
    pub fn parse(start: &str, end: &str) -> Result<Self, TicketrailError> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| {
                TicketrailError::InvalidInput(format!("date `{s}` is not YYYY-MM-DD: {e}"))
            })
        };
        Self::new(parse(start)?, parse(end)?)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Label used in output file names, e.g. `2024-05-01_2024-05-03`.
    pub fn label(&self) -> String {
        format!("{}_{}", self.start.format("%Y-%m-%d"), self.end.format("%Y-%m-%d"))
    }
}

/// Session-open notice (a ticket record).
#[derive(Debug, Clone, PartialEq)]
pub struct SessionNotice {
    pub contact: ContactId,
    pub seq_id: SequenceId,
    pub parent_seq_id: Option<SequenceId>,
    pub team: Option<String>,
    /// Raw agent identity the ticket was opened for (direct-to-agent handoffs).
    pub agent_identity: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub canonical_date: String,
}

/// A conversational message between the contact and the business.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub contact: ContactId,
    /// Monotonic arrival order assigned at ingestion, used to break timestamp ties.
    pub arrival: u64,
    pub timestamp: DateTime<Utc>,
    pub message_type: String,
    pub content: String,
    pub from: String,
    pub to: String,
    /// Set when metadata flags the message as written by a human attendant.
    pub human: bool,
    pub agent_identity: Option<String>,
}

/// A tracked status event from the bot flow.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEvent {
    pub contact: ContactId,
    pub timestamp: DateTime<Utc>,
    pub canonical_date: String,
    pub category: String,
    pub action: String,
    pub previous_state_name: String,
    pub previous_state_id: String,
    pub agent_identity: Option<String>,
}

/// An outbound template (campaign) send.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSend {
    pub contact: ContactId,
    pub message_id: String,
    pub template_id: String,
    pub template_name: String,
    pub template_body: String,
    pub template_params: String,
    pub campaign_id: String,
    pub sent_at: DateTime<Utc>,
    pub canonical_date: String,
}

/// Renders a timestamp in the full form used by export columns.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn record_kind_uses_kebab_case() {
        assert_eq!(RecordKind::SessionNotice.to_string(), "session-notice");
        assert_eq!(RecordKind::StatusEvent.to_string(), "status-event");
        assert_eq!(
            RecordKind::from_str("template-send").unwrap(),
            RecordKind::TemplateSend
        );
    }

    #[test]
    fn origin_type_display() {
        assert_eq!(OriginType::Bot.to_string(), "BOT");
        assert_eq!(OriginType::Template.to_string(), "TEMPLATE");
        assert_eq!(OriginType::from_str("TEMPLATE").unwrap(), OriginType::Template);
    }

    #[test]
    fn date_range_is_inclusive() {
        let range = DateRange::parse("2024-05-01", "2024-05-03").unwrap();
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()));
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 5, 3).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 5, 4).unwrap()));
        assert_eq!(range.label(), "2024-05-01_2024-05-03");
    }

    #[test]
    fn date_range_rejects_reversed_bounds() {
        let err = DateRange::parse("2024-05-03", "2024-05-01").unwrap_err();
        assert!(matches!(err, TicketrailError::InvalidDateRange { .. }));
    }

    #[test]
    fn date_range_rejects_garbage() {
        let err = DateRange::parse("yesterday", "2024-05-01").unwrap_err();
        assert!(matches!(err, TicketrailError::InvalidInput(_)));
        assert!(err.to_string().contains("yesterday"));
    }
}

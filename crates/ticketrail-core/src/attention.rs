// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The assembled attention: one exportable unit per transfer chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::{ClosureReason, ContactId, OriginType, SequenceId};

/// Position of a session inside its transfer chain.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChainRole {
    /// No resolvable parent.
    Root,
    /// Opened as the continuation of a resolvable parent.
    TransferTarget,
}

/// How a session handed off to its first child.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransferType {
    /// The child ticket was opened for a specific attendant.
    Agent,
    /// The child ticket was opened on a queue/team.
    Queue,
}

/// The contact's first answer to a template send.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyInfo {
    pub message_type: String,
    pub content: String,
    pub replied_at: DateTime<Utc>,
}

/// Campaign attribution merged into template-origin attentions.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignAttribution {
    pub template_id: String,
    pub template_name: String,
    pub template_body: String,
    pub template_params: String,
    pub campaign_id: String,
    pub sent_at: DateTime<Utc>,
    pub reply: Option<ReplyInfo>,
}

/// One chain member with its transfer annotations and conversation summary.
#[derive(Debug, Clone, PartialEq)]
pub struct AttentionSession {
    pub ticket_id: SequenceId,
    pub parent_ticket: Option<SequenceId>,
    pub child_tickets: Vec<SequenceId>,
    /// Root-to-deepest first-child path of the chain.
    pub history: Vec<SequenceId>,
    pub chain_role: ChainRole,
    /// True when the parent id resolves to a known session.
    pub is_transfer: bool,
    /// True for every member except the terminal (latest-opened) one.
    pub transferred: bool,
    pub transfer_type: Option<TransferType>,
    pub transferred_to_agent: Option<String>,
    pub transfer_count: usize,
    pub team: Option<String>,
    pub agent: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closure_reason: Option<ClosureReason>,
    pub message_count: usize,
    pub transcript: String,
    pub first_human_contact: Option<String>,
}

/// A rolled-up customer interaction covering one full transfer chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Attention {
    /// Sequence id of the chain root.
    pub id: SequenceId,
    pub contact: ContactId,
    pub origin: OriginType,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    /// Canonical date of the closing status event.
    pub close_date: String,
    pub duration_secs: i64,
    /// Members ordered by open time.
    pub sessions: Vec<AttentionSession>,
    pub campaign: Option<CampaignAttribution>,
}

impl Attention {
    /// Returns the terminal (non-transferred) member, if any.
    pub fn terminal(&self) -> Option<&AttentionSession> {
        self.sessions.iter().find(|s| !s.transferred)
    }
}

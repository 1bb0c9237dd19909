// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-interaction CSV schema.
//!
//! Bot-origin rows use [`BOT_COLUMNS`]; template-origin rows use
//! [`TEMPLATE_COLUMNS`], a strict superset. A file's partition is decided by
//! whether its header carries the template columns.

use csv::StringRecord;
use ticketrail_core::{Attention, AttentionSession, OriginType, TicketrailError, format_timestamp};

/// Separator for list-valued cells (child tickets, history).
pub const LIST_SEPARATOR: &str = "|";

pub const BOT_COLUMNS: &[&str] = &[
    "attention_id",
    "contact_id",
    "origin",
    "attention_open",
    "attention_close",
    "attention_close_date",
    "attention_duration_secs",
    "ticket_id",
    "parent_ticket",
    "child_tickets",
    "history",
    "chain_role",
    "is_transfer",
    "transferred",
    "transfer_type",
    "transferred_to_agent",
    "transfer_count",
    "team",
    "agent",
    "ticket_open",
    "ticket_close",
    "closure_reason",
    "message_count",
    "first_human_contact",
    "transcript",
];

pub const TEMPLATE_EXTRA_COLUMNS: &[&str] = &[
    "template_id",
    "template_name",
    "template_body",
    "template_params",
    "campaign_id",
    "sent_at",
    "replied",
    "reply_type",
    "reply_content",
    "reply_at",
];

/// [`BOT_COLUMNS`] followed by [`TEMPLATE_EXTRA_COLUMNS`].
pub const TEMPLATE_COLUMNS: &[&str] = &[
    "attention_id",
    "contact_id",
    "origin",
    "attention_open",
    "attention_close",
    "attention_close_date",
    "attention_duration_secs",
    "ticket_id",
    "parent_ticket",
    "child_tickets",
    "history",
    "chain_role",
    "is_transfer",
    "transferred",
    "transfer_type",
    "transferred_to_agent",
    "transfer_count",
    "team",
    "agent",
    "ticket_open",
    "ticket_close",
    "closure_reason",
    "message_count",
    "first_human_contact",
    "transcript",
    "template_id",
    "template_name",
    "template_body",
    "template_params",
    "campaign_id",
    "sent_at",
    "replied",
    "reply_type",
    "reply_content",
    "reply_at",
];

/// One chain member of a bot-origin attention.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotRow {
    pub attention_id: String,
    pub contact_id: String,
    pub origin: String,
    pub attention_open: String,
    pub attention_close: String,
    pub attention_close_date: String,
    pub attention_duration_secs: String,
    pub ticket_id: String,
    pub parent_ticket: String,
    pub child_tickets: String,
    pub history: String,
    pub chain_role: String,
    pub is_transfer: String,
    pub transferred: String,
    pub transfer_type: String,
    pub transferred_to_agent: String,
    pub transfer_count: String,
    pub team: String,
    pub agent: String,
    pub ticket_open: String,
    pub ticket_close: String,
    pub closure_reason: String,
    pub message_count: String,
    pub first_human_contact: String,
    pub transcript: String,
}

impl BotRow {
    fn from_session(attention: &Attention, session: &AttentionSession) -> Self {
        let join = |ids: &[ticketrail_core::SequenceId]| {
            ids.iter()
                .map(|id| id.as_str())
                .collect::<Vec<_>>()
                .join(LIST_SEPARATOR)
        };
        Self {
            attention_id: attention.id.to_string(),
            contact_id: attention.contact.to_string(),
            origin: attention.origin.to_string(),
            attention_open: format_timestamp(&attention.opened_at),
            attention_close: format_timestamp(&attention.closed_at),
            attention_close_date: attention.close_date.clone(),
            attention_duration_secs: attention.duration_secs.to_string(),
            ticket_id: session.ticket_id.to_string(),
            parent_ticket: session
                .parent_ticket
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            child_tickets: join(&session.child_tickets),
            history: join(&session.history),
            chain_role: session.chain_role.to_string(),
            is_transfer: session.is_transfer.to_string(),
            transferred: session.transferred.to_string(),
            transfer_type: session
                .transfer_type
                .map(|t| t.to_string())
                .unwrap_or_default(),
            transferred_to_agent: session.transferred_to_agent.clone().unwrap_or_default(),
            transfer_count: session.transfer_count.to_string(),
            team: session.team.clone().unwrap_or_default(),
            agent: session.agent.clone().unwrap_or_default(),
            ticket_open: format_timestamp(&session.opened_at),
            ticket_close: session
                .closed_at
                .as_ref()
                .map(format_timestamp)
                .unwrap_or_default(),
            closure_reason: session
                .closure_reason
                .map(|r| r.to_string())
                .unwrap_or_default(),
            message_count: session.message_count.to_string(),
            first_human_contact: session.first_human_contact.clone().unwrap_or_default(),
            transcript: session.transcript.clone(),
        }
    }

    fn cells(&self) -> [&str; 25] {
        [
            self.attention_id.as_str(),
            self.contact_id.as_str(),
            self.origin.as_str(),
            self.attention_open.as_str(),
            self.attention_close.as_str(),
            self.attention_close_date.as_str(),
            self.attention_duration_secs.as_str(),
            self.ticket_id.as_str(),
            self.parent_ticket.as_str(),
            self.child_tickets.as_str(),
            self.history.as_str(),
            self.chain_role.as_str(),
            self.is_transfer.as_str(),
            self.transferred.as_str(),
            self.transfer_type.as_str(),
            self.transferred_to_agent.as_str(),
            self.transfer_count.as_str(),
            self.team.as_str(),
            self.agent.as_str(),
            self.ticket_open.as_str(),
            self.ticket_close.as_str(),
            self.closure_reason.as_str(),
            self.message_count.as_str(),
            self.first_human_contact.as_str(),
            self.transcript.as_str(),
        ]
    }

    fn from_cells(cell: &impl Fn(&str) -> String) -> Self {
        Self {
            attention_id: cell("attention_id"),
            contact_id: cell("contact_id"),
            origin: cell("origin"),
            attention_open: cell("attention_open"),
            attention_close: cell("attention_close"),
            attention_close_date: cell("attention_close_date"),
            attention_duration_secs: cell("attention_duration_secs"),
            ticket_id: cell("ticket_id"),
            parent_ticket: cell("parent_ticket"),
            child_tickets: cell("child_tickets"),
            history: cell("history"),
            chain_role: cell("chain_role"),
            is_transfer: cell("is_transfer"),
            transferred: cell("transferred"),
            transfer_type: cell("transfer_type"),
            transferred_to_agent: cell("transferred_to_agent"),
            transfer_count: cell("transfer_count"),
            team: cell("team"),
            agent: cell("agent"),
            ticket_open: cell("ticket_open"),
            ticket_close: cell("ticket_close"),
            closure_reason: cell("closure_reason"),
            message_count: cell("message_count"),
            first_human_contact: cell("first_human_contact"),
            transcript: cell("transcript"),
        }
    }

    /// Number of ids in the `history` cell.
    pub fn history_len(&self) -> usize {
        self.history
            .split(LIST_SEPARATOR)
            .filter(|s| !s.is_empty())
            .count()
    }
}

/// One chain member of a template-origin attention.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateRow {
    pub bot: BotRow,
    pub template_id: String,
    pub template_name: String,
    pub template_body: String,
    pub template_params: String,
    pub campaign_id: String,
    pub sent_at: String,
    pub replied: String,
    pub reply_type: String,
    pub reply_content: String,
    pub reply_at: String,
}

/// A session row of a per-interaction file, tagged by origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionExport {
    Bot(BotRow),
    Template(TemplateRow),
}

impl SessionExport {
    /// One row per chain member, in member order.
    pub fn from_attention(attention: &Attention) -> Vec<SessionExport> {
        attention
            .sessions
            .iter()
            .map(|session| {
                let bot = BotRow::from_session(attention, session);
                match (&attention.origin, &attention.campaign) {
                    (OriginType::Template, Some(campaign)) => {
                        let reply = campaign.reply.as_ref();
                        SessionExport::Template(TemplateRow {
                            bot,
                            template_id: campaign.template_id.clone(),
                            template_name: campaign.template_name.clone(),
                            template_body: campaign.template_body.clone(),
                            template_params: campaign.template_params.clone(),
                            campaign_id: campaign.campaign_id.clone(),
                            sent_at: format_timestamp(&campaign.sent_at),
                            replied: reply.is_some().to_string(),
                            reply_type: reply.map(|r| r.message_type.clone()).unwrap_or_default(),
                            reply_content: reply.map(|r| r.content.clone()).unwrap_or_default(),
                            reply_at: reply
                                .map(|r| format_timestamp(&r.replied_at))
                                .unwrap_or_default(),
                        })
                    }
                    _ => SessionExport::Bot(bot),
                }
            })
            .collect()
    }

    /// True when a header carries the template columns.
    pub fn is_template_header(headers: &StringRecord) -> bool {
        TEMPLATE_EXTRA_COLUMNS
            .iter()
            .all(|c| headers.iter().any(|h| h == *c))
    }

    /// Parses a row by column name. Missing columns read as empty; a row
    /// without an `attention_id` or `ticket_id` is rejected.
    pub fn from_record(
        headers: &StringRecord,
        record: &StringRecord,
    ) -> Result<SessionExport, TicketrailError> {
        let cell = |name: &str| -> String {
            headers
                .iter()
                .position(|h| h == name)
                .and_then(|idx| record.get(idx))
                .unwrap_or_default()
                .to_string()
        };
        let bot = BotRow::from_cells(&cell);
        if bot.attention_id.is_empty() || bot.ticket_id.is_empty() {
            return Err(TicketrailError::Export {
                message: "row has no attention_id or ticket_id".to_string(),
                source: None,
            });
        }
        if !Self::is_template_header(headers) {
            return Ok(SessionExport::Bot(bot));
        }
        Ok(SessionExport::Template(TemplateRow {
            bot,
            template_id: cell("template_id"),
            template_name: cell("template_name"),
            template_body: cell("template_body"),
            template_params: cell("template_params"),
            campaign_id: cell("campaign_id"),
            sent_at: cell("sent_at"),
            replied: cell("replied"),
            reply_type: cell("reply_type"),
            reply_content: cell("reply_content"),
            reply_at: cell("reply_at"),
        }))
    }

    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            SessionExport::Bot(_) => BOT_COLUMNS,
            SessionExport::Template(_) => TEMPLATE_COLUMNS,
        }
    }

    /// Cells in [`Self::headers`] order.
    pub fn to_record(&self) -> Vec<&str> {
        match self {
            SessionExport::Bot(row) => row.cells().to_vec(),
            SessionExport::Template(row) => {
                let mut cells = row.bot.cells().to_vec();
                cells.extend([
                    row.template_id.as_str(),
                    row.template_name.as_str(),
                    row.template_body.as_str(),
                    row.template_params.as_str(),
                    row.campaign_id.as_str(),
                    row.sent_at.as_str(),
                    row.replied.as_str(),
                    row.reply_type.as_str(),
                    row.reply_content.as_str(),
                    row.reply_at.as_str(),
                ]);
                cells
            }
        }
    }

    /// The shared bot-schema part of the row.
    pub fn bot(&self) -> &BotRow {
        match self {
            SessionExport::Bot(row) => row,
            SessionExport::Template(row) => &row.bot,
        }
    }

    pub fn template(&self) -> Option<&TemplateRow> {
        match self {
            SessionExport::Bot(_) => None,
            SessionExport::Template(row) => Some(row),
        }
    }

    /// De-duplication key: `(contact_id, ticket_id)`. A ticket keeps its key
    /// when a late parent re-roots its chain under another attention id.
    pub fn key(&self) -> (&str, &str) {
        let bot = self.bot();
        (&bot.contact_id, &bot.ticket_id)
    }

    /// Identifies the attention version (file) a row was written in.
    pub fn attention_id(&self) -> &str {
        &self.bot().attention_id
    }
}

// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attention assembly: one export unit per closed transfer chain.

use chrono::{DateTime, Duration, Utc};
use ticketrail_config::TicketrailConfig;
use ticketrail_core::{
    Attention, AttentionSession, CampaignAttribution, Emitter, MessageRecord, OriginType,
    ReplyInfo, SequenceId, TemplateSend, TicketrailError,
};
use tracing::debug;

use crate::chain::{TransferChain, TransferGraph, build_chain};
use crate::session::Session;
use crate::transcript::{TranscriptRenderer, sort_messages};

/// Builds [`Attention`]s from a contact's sessions.
#[derive(Debug, Clone)]
pub struct AttentionAssembler {
    renderer: TranscriptRenderer,
    attribution_window: Duration,
}

impl AttentionAssembler {
    pub fn new(config: &TicketrailConfig) -> Self {
        Self {
            renderer: TranscriptRenderer::new(
                config.transcript.business_domains.clone(),
                config.transcript.separator.clone(),
            ),
            attribution_window: Duration::hours(i64::from(config.campaign.attribution_window_hours)),
        }
    }

    /// Assembles the attention whose chain contains the just-closed session
    /// `closed`. The attention closes at the chain's latest closure.
    ///
    /// `retained` holds every message seen for the contact (for backfill and
    /// reply lookup) and `sends` the contact's template sends.
    pub fn assemble(
        &self,
        closed: &SequenceId,
        sessions: &[Session],
        retained: &[MessageRecord],
        sends: &[TemplateSend],
    ) -> Result<Attention, TicketrailError> {
        let chain = build_chain(sessions, closed).ok_or_else(|| {
            TicketrailError::Internal(format!("session {closed} is not registered"))
        })?;
        let graph = TransferGraph::build(sessions);
        let closing = graph
            .get(closed)
            .ok_or_else(|| TicketrailError::Internal(format!("session {closed} is not registered")))?;
        if closing.is_open() {
            return Err(TicketrailError::Internal(format!(
                "session {closed} is not closed"
            )));
        }
        // The chain closes with its latest-closed member, which differs from
        // `closed` when a parent arrived after its transfer targets.
        let last = chain
            .links
            .iter()
            .filter_map(|link| graph.get(&link.ticket_id))
            .filter(|s| s.closed_at.is_some())
            .max_by_key(|s| s.closed_at)
            .unwrap_or(closing);
        let (Some(closed_at), Some(close_date)) = (last.closed_at, last.close_date.clone()) else {
            return Err(TicketrailError::Internal(format!(
                "session {closed} is not closed"
            )));
        };

        let members = self.assemble_members(&chain, &graph, retained, closed_at);
        let opened_at = members
            .iter()
            .map(|m| m.opened_at)
            .min()
            .unwrap_or(closing.opened_at);
        let campaign = self.attribute(opened_at, retained, sends);
        let origin = if campaign.is_some() {
            OriginType::Template
        } else {
            OriginType::Bot
        };

        debug!(
            contact = %closing.contact,
            root = %chain.root,
            members = members.len(),
            origin = %origin,
            "attention assembled"
        );

        Ok(Attention {
            id: chain.root.clone(),
            contact: closing.contact.clone(),
            origin,
            opened_at,
            closed_at,
            close_date,
            duration_secs: (closed_at - opened_at).num_seconds().max(0),
            sessions: members,
            campaign,
        })
    }

    fn assemble_members(
        &self,
        chain: &TransferChain,
        graph: &TransferGraph<'_>,
        retained: &[MessageRecord],
        attention_closed_at: DateTime<Utc>,
    ) -> Vec<AttentionSession> {
        chain
            .links
            .iter()
            .filter_map(|link| {
                let session = graph.get(&link.ticket_id)?;
                let mut messages = session.messages.clone();
                if messages.is_empty() {
                    let cutoff = link
                        .child_tickets
                        .iter()
                        .filter_map(|c| graph.get(c).map(|s| s.opened_at))
                        .min()
                        .or(session.closed_at)
                        .unwrap_or(attention_closed_at);
                    messages = retained
                        .iter()
                        .filter(|m| m.timestamp >= session.opened_at && m.timestamp < cutoff)
                        .cloned()
                        .collect();
                    if !messages.is_empty() {
                        debug!(
                            seq_id = %session.seq_id,
                            count = messages.len(),
                            "backfilled session messages"
                        );
                    }
                }
                sort_messages(&mut messages);

                Some(AttentionSession {
                    ticket_id: link.ticket_id.clone(),
                    parent_ticket: link.parent_ticket.clone(),
                    child_tickets: link.child_tickets.clone(),
                    history: chain.history.clone(),
                    chain_role: link.chain_role,
                    is_transfer: link.is_transfer,
                    transferred: link.transferred,
                    transfer_type: link.transfer_type,
                    transferred_to_agent: link.transferred_to_agent.clone(),
                    transfer_count: chain.transfer_count(),
                    team: session.team.clone(),
                    agent: session.agent.clone().or_else(|| {
                        messages
                            .iter()
                            .find_map(|m| m.agent_identity.as_deref())
                            .map(ticketrail_ingest::decode_agent_identity)
                    }),
                    opened_at: session.opened_at,
                    closed_at: session.closed_at,
                    closure_reason: session.closure_reason,
                    message_count: messages.len(),
                    transcript: self.renderer.render(&messages),
                    first_human_contact: self.renderer.first_human_contact(&messages),
                })
            })
            .collect()
    }

    /// Latest template send at or before `opened_at` within the attribution
    /// window, with the contact's first reply after it.
    fn attribute(
        &self,
        opened_at: DateTime<Utc>,
        retained: &[MessageRecord],
        sends: &[TemplateSend],
    ) -> Option<CampaignAttribution> {
        let send = sends
            .iter()
            .filter(|s| s.sent_at <= opened_at && opened_at - s.sent_at <= self.attribution_window)
            .max_by_key(|s| s.sent_at)?;

        let reply = retained
            .iter()
            .filter(|m| m.timestamp >= send.sent_at && self.renderer.emitter(m) == Emitter::Customer)
            .min_by_key(|m| (m.timestamp, m.arrival))
            .map(|m| ReplyInfo {
                message_type: m.message_type.clone(),
                content: m.content.clone(),
                replied_at: m.timestamp,
            });

        Some(CampaignAttribution {
            template_id: send.template_id.clone(),
            template_name: send.template_name.clone(),
            template_body: send.template_body.clone(),
            template_params: send.template_params.clone(),
            campaign_id: send.campaign_id.clone(),
            sent_at: send.sent_at,
            reply,
        })
    }
}

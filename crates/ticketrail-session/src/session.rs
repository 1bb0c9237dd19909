// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A single tracked session (ticket) and its lifecycle.
//!
//! A session is created OPEN by a session notice and accumulates messages
//! and status events until a closure trigger moves it to CLOSED. Once closed
//! it is frozen: further appends are refused.

use chrono::{DateTime, Utc};
use strum::Display;
use ticketrail_core::{ClosureReason, ContactId, MessageRecord, SequenceId, SessionNotice, StatusEvent};
use ticketrail_ingest::decode_agent_identity;

/// States in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
    /// Accepting messages and status events.
    Open,
    /// Frozen and eligible for export.
    Closed,
}

/// One session of a contact.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub seq_id: SequenceId,
    pub contact: ContactId,
    /// Raw parent id from the notice. It may not resolve to a known session.
    pub parent_seq_id: Option<SequenceId>,
    pub state: SessionState,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Canonical date of the closing event.
    pub close_date: Option<String>,
    pub closure_reason: Option<ClosureReason>,
    pub messages: Vec<MessageRecord>,
    pub events: Vec<StatusEvent>,
    pub team: Option<String>,
    /// Decoded identity of the first human attendant seen in the session.
    pub agent: Option<String>,
    /// Raw agent identity the notice was opened for (direct handoffs).
    pub target_agent_identity: Option<String>,
}

impl Session {
    /// Creates an OPEN session from its notice.
    pub fn open(notice: &SessionNotice) -> Self {
        Self {
            seq_id: notice.seq_id.clone(),
            contact: notice.contact.clone(),
            parent_seq_id: notice.parent_seq_id.clone(),
            state: SessionState::Open,
            opened_at: notice.opened_at,
            closed_at: None,
            close_date: None,
            closure_reason: None,
            messages: Vec::new(),
            events: Vec::new(),
            team: notice.team.clone(),
            agent: notice.agent_identity.as_deref().map(decode_agent_identity),
            target_agent_identity: notice.agent_identity.clone(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// Appends a message. Returns false when the session is already closed.
    pub fn push_message(&mut self, message: MessageRecord) -> bool {
        if !self.is_open() {
            return false;
        }
        if self.agent.is_none() {
            self.agent = message.agent_identity.as_deref().map(decode_agent_identity);
        }
        self.messages.push(message);
        true
    }

    /// Appends a status event. Returns false when the session is already closed.
    pub fn push_event(&mut self, event: StatusEvent) -> bool {
        if !self.is_open() {
            return false;
        }
        if self.agent.is_none() {
            self.agent = event.agent_identity.as_deref().map(decode_agent_identity);
        }
        self.events.push(event);
        true
    }

    /// Moves the session to CLOSED. A second close is a no-op returning false.
    pub fn close(&mut self, at: DateTime<Utc>, date: String, reason: ClosureReason) -> bool {
        if !self.is_open() {
            return false;
        }
        self.state = SessionState::Closed;
        self.closed_at = Some(at);
        self.close_date = Some(date);
        self.closure_reason = Some(reason);
        true
    }
}

/// Summary of an OPEN session, used to surface heuristic misses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSessionInfo {
    pub contact: ContactId,
    pub seq_id: SequenceId,
    pub opened_at: DateTime<Utc>,
    pub message_count: usize,
    pub event_count: usize,
}

impl From<&Session> for OpenSessionInfo {
    fn from(session: &Session) -> Self {
        Self {
            contact: session.contact.clone(),
            seq_id: session.seq_id.clone(),
            opened_at: session.opened_at,
            message_count: session.messages.len(),
            event_count: session.events.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn notice(agent: Option<&str>) -> SessionNotice {
        SessionNotice {
            contact: ContactId::from("5491111111111"),
            seq_id: SequenceId::from("10"),
            parent_seq_id: None,
            team: Some("default".to_string()),
            agent_identity: agent.map(str::to_string),
            opened_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            canonical_date: "2024-05-01".to_string(),
        }
    }

    #[test]
    fn new_session_is_open_and_empty() {
        let session = Session::open(&notice(None));
        assert!(session.is_open());
        assert!(session.messages.is_empty());
        assert_eq!(session.state.to_string(), "open");
    }

    #[test]
    fn direct_agent_notice_sets_decoded_agent() {
        let session = Session::open(&notice(Some("ana%40corp.com@blip.ai")));
        assert_eq!(session.agent.as_deref(), Some("ana@corp.com@blip.ai"));
        assert_eq!(
            session.target_agent_identity.as_deref(),
            Some("ana%40corp.com@blip.ai")
        );
    }

    #[test]
    fn closing_twice_is_a_no_op() {
        let mut session = Session::open(&notice(None));
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
        assert!(session.close(at, "2024-05-01".into(), ClosureReason::SurveyAction));
        assert!(!session.close(at, "2024-05-02".into(), ClosureReason::DeskStateExit));
        assert_eq!(session.close_date.as_deref(), Some("2024-05-01"));
        assert_eq!(session.closure_reason, Some(ClosureReason::SurveyAction));
    }

    #[test]
    fn closed_session_refuses_appends() {
        let mut session = Session::open(&notice(None));
        session.close(
            Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap(),
            "2024-05-01".into(),
            ClosureReason::HumanAttendanceExit,
        );
        let message = MessageRecord {
            contact: session.contact.clone(),
            arrival: 0,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 11, 5, 0).unwrap(),
            message_type: "text/plain".into(),
            content: "late".into(),
            from: "5491111111111@wa.gw.msging.net".into(),
            to: "bot@msging.net".into(),
            human: false,
            agent_identity: None,
        };
        assert!(!session.push_message(message));
        assert!(session.messages.is_empty());
    }
}

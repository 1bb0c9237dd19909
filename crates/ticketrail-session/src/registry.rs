// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-contact session registry.
//!
//! The registry owns every contact's sessions behind a per-contact async
//! mutex, so different contacts proceed in parallel while one contact's
//! notices, messages, events, and closure-triggered writes are serialized.
//! At most one session per contact is OPEN at any time.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use ticketrail_config::TicketrailConfig;
use ticketrail_config::model::RegistryConfig;
use ticketrail_core::{
    AttentionSink, ClosureReason, ContactId, MessageRecord, SequenceId, SessionNotice,
    StatusEvent, TemplateSend, TicketrailError,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::assembler::AttentionAssembler;
use crate::closure::ClosureDetector;
use crate::session::{OpenSessionInfo, Session};

/// Result of handling a session notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeOutcome {
    /// A new OPEN session was created.
    Opened,
    /// The contact already had an OPEN session; the notice was ignored.
    IgnoredOpen { current: SequenceId },
    /// The sequence id was already registered; the notice was ignored.
    Duplicate,
}

/// Result of handling a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Appended(SequenceId),
    /// No OPEN session for the contact. The message is still retained for backfill.
    Dropped,
}

/// Result of handling a status event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Appended(SequenceId),
    /// The event closed the session. `attention` is the written file, when
    /// the closed session ended its chain.
    Closed {
        seq_id: SequenceId,
        reason: ClosureReason,
        attention: Option<PathBuf>,
    },
    /// No OPEN session for the contact.
    Dropped,
}

/// Everything tracked for one contact.
#[derive(Debug, Default)]
struct ContactState {
    /// Sessions in discovery order.
    sessions: Vec<Session>,
    /// Every message seen, oldest first.
    messages: VecDeque<MessageRecord>,
    /// Template sends, oldest first.
    sends: VecDeque<TemplateSend>,
    /// Newest record timestamp seen for the contact.
    last_seen: Option<DateTime<Utc>>,
}

impl ContactState {
    fn touch(&mut self, at: DateTime<Utc>) {
        if self.last_seen.is_none_or(|seen| seen < at) {
            self.last_seen = Some(at);
        }
    }

    fn open_index(&self) -> Option<usize> {
        self.sessions.iter().position(Session::is_open)
    }

    fn knows(&self, seq_id: &SequenceId) -> bool {
        self.sessions.iter().any(|s| &s.seq_id == seq_id)
    }

    /// True when a transitive child of `seq_id` is still OPEN.
    fn has_open_descendant(&self, seq_id: &SequenceId) -> bool {
        let mut seen: HashSet<&SequenceId> = HashSet::from([seq_id]);
        let mut pending = vec![seq_id];
        while let Some(id) = pending.pop() {
            for child in self
                .sessions
                .iter()
                .filter(|s| s.parent_seq_id.as_ref() == Some(id))
            {
                if !seen.insert(&child.seq_id) {
                    continue;
                }
                if child.is_open() {
                    return true;
                }
                pending.push(&child.seq_id);
            }
        }
        false
    }

    /// Drops the oldest closed sessions beyond `max_closed`.
    fn evict_closed(&mut self, max_closed: usize) {
        let closed = self.sessions.iter().filter(|s| !s.is_open()).count();
        let mut excess = closed.saturating_sub(max_closed);
        if excess == 0 {
            return;
        }
        self.sessions.retain(|s| {
            if excess > 0 && !s.is_open() {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }
}

fn push_bounded<T>(queue: &mut VecDeque<T>, item: T, max: usize) {
    queue.push_back(item);
    while queue.len() > max {
        queue.pop_front();
    }
}

/// Shared session registry.
pub struct SessionRegistry {
    contacts: DashMap<ContactId, Arc<Mutex<ContactState>>>,
    detector: ClosureDetector,
    assembler: AttentionAssembler,
    sink: Arc<dyn AttentionSink>,
    limits: RegistryConfig,
    /// Newest record timestamp across contacts, in epoch millis.
    watermark: AtomicI64,
    closures: AtomicUsize,
}

impl SessionRegistry {
    pub fn new(config: &TicketrailConfig, sink: Arc<dyn AttentionSink>) -> Self {
        Self {
            contacts: DashMap::new(),
            detector: ClosureDetector::new(&config.closure),
            assembler: AttentionAssembler::new(config),
            sink,
            limits: config.registry.clone(),
            watermark: AtomicI64::new(i64::MIN),
            closures: AtomicUsize::new(0),
        }
    }

    fn observe(&self, state: &mut ContactState, at: DateTime<Utc>) {
        state.touch(at);
        self.watermark.fetch_max(at.timestamp_millis(), Ordering::Relaxed);
    }

    fn contact_state(&self, contact: &ContactId) -> Arc<Mutex<ContactState>> {
        self.contacts.entry(contact.clone()).or_default().clone()
    }

    /// Opens a session unless the contact already has an OPEN one or the id
    /// is already known.
    pub async fn on_session_notice(&self, notice: SessionNotice) -> NoticeOutcome {
        let state = self.contact_state(&notice.contact);
        let mut state = state.lock().await;
        self.observe(&mut state, notice.opened_at);

        if state.knows(&notice.seq_id) {
            debug!(contact = %notice.contact, seq_id = %notice.seq_id, "duplicate session notice ignored");
            return NoticeOutcome::Duplicate;
        }
        if let Some(idx) = state.open_index() {
            let current = state.sessions[idx].seq_id.clone();
            info!(
                contact = %notice.contact,
                seq_id = %notice.seq_id,
                open = %current,
                "session notice ignored: contact already has an open session"
            );
            return NoticeOutcome::IgnoredOpen { current };
        }

        info!(
            contact = %notice.contact,
            seq_id = %notice.seq_id,
            parent = ?notice.parent_seq_id.as_ref().map(SequenceId::as_str),
            "session opened"
        );
        state.sessions.push(Session::open(&notice));
        NoticeOutcome::Opened
    }

    /// Retains the message and appends it to the contact's OPEN session.
    pub async fn on_message(&self, message: MessageRecord) -> MessageOutcome {
        let state = self.contact_state(&message.contact);
        let mut state = state.lock().await;
        self.observe(&mut state, message.timestamp);

        push_bounded(
            &mut state.messages,
            message.clone(),
            self.limits.max_retained_messages,
        );

        let Some(idx) = state.open_index() else {
            debug!(contact = %message.contact, "message dropped: no open session");
            return MessageOutcome::Dropped;
        };
        let session = &mut state.sessions[idx];
        session.push_message(message);
        MessageOutcome::Appended(session.seq_id.clone())
    }

    /// Appends the event to the contact's OPEN session and closes it when a
    /// closure rule fires. Closing assembles and writes a new version of the
    /// chain's attention before returning, unless a transfer target of the
    /// session is still OPEN. A parent that arrives after its children
    /// therefore rewrites the chain under the parent's id.
    pub async fn on_status_event(&self, event: StatusEvent) -> Result<EventOutcome, TicketrailError> {
        let contact = event.contact.clone();
        let state = self.contact_state(&contact);
        let mut state = state.lock().await;
        self.observe(&mut state, event.timestamp);

        let Some(idx) = state.open_index() else {
            info!(contact = %contact, action = %event.action, "status event dropped: no open session");
            return Ok(EventOutcome::Dropped);
        };

        let reason = self.detector.detect(&event);
        let (closed_at, close_date) = (event.timestamp, event.canonical_date.clone());
        let session = &mut state.sessions[idx];
        let seq_id = session.seq_id.clone();
        session.push_event(event);

        let Some(reason) = reason else {
            return Ok(EventOutcome::Appended(seq_id));
        };
        session.close(closed_at, close_date, reason);
        info!(contact = %contact, seq_id = %seq_id, reason = %reason, "session closed");

        let attention = if state.has_open_descendant(&seq_id) {
            debug!(seq_id = %seq_id, "closed session has an open transfer target, attention deferred");
            None
        } else {
            let messages: Vec<MessageRecord> = state.messages.iter().cloned().collect();
            let sends: Vec<TemplateSend> = state.sends.iter().cloned().collect();
            let attention = self
                .assembler
                .assemble(&seq_id, &state.sessions, &messages, &sends)?;
            match self.sink.write_attention(&attention).await {
                Ok(path) => {
                    info!(
                        contact = %contact,
                        attention_id = %attention.id,
                        path = %path.display(),
                        "attention written"
                    );
                    Some(path)
                }
                Err(e) => {
                    error!(contact = %contact, attention_id = %attention.id, error = %e, "attention write failed");
                    return Err(e);
                }
            }
        };

        state.evict_closed(self.limits.max_closed_sessions);
        drop(state);

        let closures = self.closures.fetch_add(1, Ordering::Relaxed) + 1;
        if closures % self.limits.idle_sweep_every.max(1) == 0 {
            self.evict_idle();
        }
        Ok(EventOutcome::Closed {
            seq_id,
            reason,
            attention,
        })
    }

    /// Retains a template send for campaign attribution.
    pub async fn on_template_send(&self, send: TemplateSend) {
        let state = self.contact_state(&send.contact);
        let mut state = state.lock().await;
        self.observe(&mut state, send.sent_at);
        debug!(contact = %send.contact, template = %send.template_name, "template send retained");
        push_bounded(&mut state.sends, send, self.limits.max_template_sends);
    }

    /// The contact's OPEN session id, if any.
    pub async fn get_open(&self, contact: &ContactId) -> Option<SequenceId> {
        let state = self.contacts.get(contact).map(|e| e.value().clone())?;
        let state = state.lock().await;
        state.open_index().map(|idx| state.sessions[idx].seq_id.clone())
    }

    /// Every OPEN session across contacts, oldest first.
    pub async fn open_sessions(&self) -> Vec<OpenSessionInfo> {
        let states: Vec<Arc<Mutex<ContactState>>> =
            self.contacts.iter().map(|e| e.value().clone()).collect();
        let mut open = Vec::new();
        for state in states {
            let state = state.lock().await;
            open.extend(
                state
                    .sessions
                    .iter()
                    .filter(|s| s.is_open())
                    .map(OpenSessionInfo::from),
            );
        }
        open.sort_by(|a, b| a.opened_at.cmp(&b.opened_at).then(a.contact.cmp(&b.contact)));
        open
    }

    /// Snapshot of the contact's known sessions in discovery order.
    pub async fn contact_sessions(&self, contact: &ContactId) -> Vec<Session> {
        let Some(state) = self.contacts.get(contact).map(|e| e.value().clone()) else {
            return Vec::new();
        };
        let state = state.lock().await;
        state.sessions.clone()
    }

    /// Forgets contacts idle for longer than `registry.idle_contact_hours`
    /// behind the newest record seen. Returns how many were dropped.
    pub fn evict_idle(&self) -> usize {
        let newest = self.watermark.load(Ordering::Relaxed);
        let Some(newest) = DateTime::<Utc>::from_timestamp_millis(newest) else {
            return 0;
        };
        let horizon = Duration::hours(i64::from(self.limits.idle_contact_hours));
        self.evict_idle_before(newest - horizon)
    }

    /// Forgets every contact with no OPEN session whose newest record is
    /// older than `cutoff`. Contacts currently being handled are kept.
    pub fn evict_idle_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        self.contacts.retain(|contact, state| {
            if Arc::strong_count(state) > 1 {
                return true;
            }
            let Ok(guard) = state.try_lock() else {
                return true;
            };
            let idle = guard.open_index().is_none() && guard.last_seen.is_none_or(|t| t < cutoff);
            if idle {
                debug!(contact = %contact, "idle contact evicted");
                evicted += 1;
            }
            !idle
        });
        if evicted > 0 {
            info!(evicted, remaining = self.contacts.len(), "idle contacts evicted");
        }
        evicted
    }

    /// Number of contacts with any tracked state.
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }
}

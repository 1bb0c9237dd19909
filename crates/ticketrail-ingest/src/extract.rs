// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed payload extraction for classified records.
//!
//! A classified record that lacks a field its kind requires (a session id,
//! a resolvable contact) is malformed input and is rejected here, before any
//! registry state is touched.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use ticketrail_config::TicketrailConfig;
use ticketrail_core::{
    ContactId, MessageRecord, RecordKind, SequenceId, SessionNotice, StatusEvent, TemplateSend,
    TicketrailError,
};

use crate::dates::{CanonicalDate, record_timestamp};
use crate::flatten::FlatRecord;
use crate::identity::resolve_contact;

const MESSAGE_CONTENT_PATHS: &[&str] = &[
    "content",
    "content.text",
    "content.title",
    "content.value",
    "content.uri",
];
const TEMPLATE_ID_PATHS: &[&str] = &["content.template.id", "template.id", "templateId"];
const TEMPLATE_BODY_PATHS: &[&str] = &[
    "content.template.body",
    "template.body",
    "content.template.text",
    "content.text",
];
const TEMPLATE_PARAM_PREFIXES: &[&str] = &[
    "content.template.parameters.",
    "template.parameters.",
    "content.template.components.",
];

/// Separator between template parameter values.
const PARAM_SEPARATOR: &str = "|";

/// Typed payload of a classified record.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedRecord {
    SessionNotice(SessionNotice),
    Message(MessageRecord),
    StatusEvent(StatusEvent),
    TemplateSend(TemplateSend),
    /// Profiles are exported raw only and carry no typed payload.
    ContactProfile,
}

impl TypedRecord {
    pub fn contact(&self) -> Option<&ContactId> {
        match self {
            TypedRecord::SessionNotice(n) => Some(&n.contact),
            TypedRecord::Message(m) => Some(&m.contact),
            TypedRecord::StatusEvent(e) => Some(&e.contact),
            TypedRecord::TemplateSend(t) => Some(&t.contact),
            TypedRecord::ContactProfile => None,
        }
    }
}

/// Converts flattened records into typed payloads.
#[derive(Debug)]
pub struct Extractor {
    timestamp_fields: Vec<String>,
    business_domains: Vec<String>,
    human_markers: Vec<String>,
    template_keys: Vec<String>,
    arrival: AtomicU64,
}

impl Extractor {
    pub fn new(config: &TicketrailConfig) -> Self {
        Self {
            timestamp_fields: config.dates.candidate_fields.clone(),
            business_domains: config.transcript.business_domains.clone(),
            human_markers: config
                .transcript
                .human_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            template_keys: config.classifier.template_keys.clone(),
            arrival: AtomicU64::new(0),
        }
    }

    /// Extracts the typed payload for `kind`. `now` stamps records that carry
    /// no parseable timestamp.
    pub fn extract(
        &self,
        kind: RecordKind,
        record: &FlatRecord,
        date: &CanonicalDate,
        now: DateTime<Utc>,
    ) -> Result<TypedRecord, TicketrailError> {
        self.extract_for(kind, record, date, now, None)
    }

    /// Like [`Self::extract`]. `contact` is used when the record names no
    /// contact of its own, e.g. records delivered on a per-contact channel.
    pub fn extract_for(
        &self,
        kind: RecordKind,
        record: &FlatRecord,
        date: &CanonicalDate,
        now: DateTime<Utc>,
        contact: Option<&ContactId>,
    ) -> Result<TypedRecord, TicketrailError> {
        match kind {
            RecordKind::SessionNotice => self.session_notice(record, date, now, contact),
            RecordKind::Message => self.message(record, now, contact),
            RecordKind::StatusEvent => self.status_event(record, date, now, contact),
            RecordKind::TemplateSend => self.template_send(record, date, now, contact),
            RecordKind::ContactProfile => Ok(TypedRecord::ContactProfile),
            RecordKind::Unknown => Err(TicketrailError::malformed("record kind is unknown")),
        }
    }

    fn contact(
        &self,
        record: &FlatRecord,
        kind: RecordKind,
        fallback: Option<&ContactId>,
    ) -> Result<ContactId, TicketrailError> {
        resolve_contact(record, &self.business_domains)
            .or_else(|| fallback.cloned())
            .ok_or_else(|| TicketrailError::malformed(format!("{kind} has no resolvable contact")))
    }

    fn timestamp(&self, record: &FlatRecord, now: DateTime<Utc>) -> DateTime<Utc> {
        record_timestamp(record, &self.timestamp_fields).unwrap_or(now)
    }

    fn session_notice(
        &self,
        record: &FlatRecord,
        date: &CanonicalDate,
        now: DateTime<Utc>,
        fallback: Option<&ContactId>,
    ) -> Result<TypedRecord, TicketrailError> {
        let seq_id = record
            .leaf_text("sequentialId")
            .ok_or_else(|| TicketrailError::malformed("session notice has no sequentialId"))?;
        let contact = self.contact(record, RecordKind::SessionNotice, fallback)?;
        Ok(TypedRecord::SessionNotice(SessionNotice {
            contact,
            seq_id: SequenceId(seq_id),
            parent_seq_id: record.leaf_text("parentSequentialId").map(SequenceId),
            team: record.leaf_text("team"),
            agent_identity: record.leaf_text("agentIdentity"),
            opened_at: self.timestamp(record, now),
            canonical_date: date.date.clone(),
        }))
    }

    fn message(
        &self,
        record: &FlatRecord,
        now: DateTime<Utc>,
        fallback: Option<&ContactId>,
    ) -> Result<TypedRecord, TicketrailError> {
        let contact = self.contact(record, RecordKind::Message, fallback)?;
        let human = record
            .leaf_text("messageEmitter")
            .is_some_and(|e| self.human_markers.contains(&e.to_lowercase()));
        Ok(TypedRecord::Message(MessageRecord {
            contact,
            arrival: self.arrival.fetch_add(1, Ordering::Relaxed),
            timestamp: self.timestamp(record, now),
            message_type: record.text("type").unwrap_or_default(),
            content: record.first_text(MESSAGE_CONTENT_PATHS).unwrap_or_default(),
            from: record.text("from").unwrap_or_default(),
            to: record.text("to").unwrap_or_default(),
            human,
            agent_identity: record.leaf_text("agentIdentity"),
        }))
    }

    fn status_event(
        &self,
        record: &FlatRecord,
        date: &CanonicalDate,
        now: DateTime<Utc>,
        fallback: Option<&ContactId>,
    ) -> Result<TypedRecord, TicketrailError> {
        let contact = self.contact(record, RecordKind::StatusEvent, fallback)?;
        Ok(TypedRecord::StatusEvent(StatusEvent {
            contact,
            timestamp: self.timestamp(record, now),
            canonical_date: date.date.clone(),
            category: record.leaf_text("category").unwrap_or_default(),
            action: record.leaf_text("action").unwrap_or_default(),
            previous_state_name: record.leaf_text("previousStateName").unwrap_or_default(),
            previous_state_id: record.leaf_text("previousStateId").unwrap_or_default(),
            agent_identity: record.leaf_text("agentIdentity"),
        }))
    }

    fn template_send(
        &self,
        record: &FlatRecord,
        date: &CanonicalDate,
        now: DateTime<Utc>,
        fallback: Option<&ContactId>,
    ) -> Result<TypedRecord, TicketrailError> {
        let contact = self.contact(record, RecordKind::TemplateSend, fallback)?;
        let name_paths: Vec<&str> = self.template_keys.iter().map(String::as_str).collect();
        let params: Vec<String> = record
            .iter()
            .filter(|(path, _)| TEMPLATE_PARAM_PREFIXES.iter().any(|p| path.starts_with(p)))
            .filter_map(|(_, value)| value.non_empty())
            .collect();
        Ok(TypedRecord::TemplateSend(TemplateSend {
            contact,
            message_id: record.text("id").unwrap_or_default(),
            template_id: record.first_text(TEMPLATE_ID_PATHS).unwrap_or_default(),
            template_name: record.first_text(&name_paths).unwrap_or_default(),
            template_body: record.first_text(TEMPLATE_BODY_PATHS).unwrap_or_default(),
            template_params: params.join(PARAM_SEPARATOR),
            campaign_id: record.leaf_text("campaignId").unwrap_or_default(),
            sent_at: self.timestamp(record, now),
            canonical_date: date.date.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn extractor() -> Extractor {
        Extractor::new(&TicketrailConfig::default())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
    }

    fn date() -> CanonicalDate {
        CanonicalDate {
            date: "2024-05-01".to_string(),
            source: "date".to_string(),
        }
    }

    #[test]
    fn ticket_becomes_session_notice() {
        let record = FlatRecord::flatten(&json!({
            "type": "application/vnd.iris.ticket+json",
            "content": {
                "sequentialId": 10,
                "parentSequentialId": null,
                "team": "default",
                "customerIdentity": "5491111111111@wa.gw.msging.net"
            },
            "metadata": {"envelope.storageDate": "2024-05-01T10:00:00Z"}
        }));
        let typed = extractor()
            .extract(RecordKind::SessionNotice, &record, &date(), now())
            .unwrap();
        let TypedRecord::SessionNotice(notice) = typed else {
            panic!("expected a session notice");
        };
        assert_eq!(notice.seq_id, SequenceId::from("10"));
        assert_eq!(notice.parent_seq_id, None);
        assert_eq!(notice.team.as_deref(), Some("default"));
        assert_eq!(notice.contact, ContactId::from("5491111111111"));
        assert_eq!(notice.opened_at, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn notice_without_sequential_id_is_malformed() {
        let record = FlatRecord::flatten(&json!({
            "type": "application/vnd.iris.ticket+json",
            "content": {"customerIdentity": "1@wa.gw.msging.net"}
        }));
        let err = extractor()
            .extract(RecordKind::SessionNotice, &record, &date(), now())
            .unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn message_without_contact_is_malformed() {
        let record = FlatRecord::flatten(&json!({"type": "text/plain", "content": "hi"}));
        let err = extractor()
            .extract(RecordKind::Message, &record, &date(), now())
            .unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn supplied_contact_fills_in_for_records_without_one() {
        let record = FlatRecord::flatten(&json!({
            "type": "application/vnd.iris.ticket+json",
            "content": {"sequentialId": "10", "parentSequentialId": null, "team": "default"},
            "metadata": {"envelope.storageDate": "2024-05-01T10:00:00Z"}
        }));
        let supplied = ContactId::from("5491111111111");
        let typed = extractor()
            .extract_for(RecordKind::SessionNotice, &record, &date(), now(), Some(&supplied))
            .unwrap();
        assert_eq!(typed.contact(), Some(&supplied));
        assert!(
            extractor()
                .extract(RecordKind::SessionNotice, &record, &date(), now())
                .unwrap_err()
                .is_malformed()
        );
    }

    #[test]
    fn message_flags_human_emitter_and_stamps_arrival() {
        let ex = extractor();
        let record = FlatRecord::flatten(&json!({
            "type": "text/plain",
            "content": "Hola, soy Ana",
            "from": "ana%40corp.com@desk.msging.net",
            "to": "5491111111111@wa.gw.msging.net",
            "metadata": {"#messageEmitter": "Human"}
        }));
        let first = ex.extract(RecordKind::Message, &record, &date(), now()).unwrap();
        let second = ex.extract(RecordKind::Message, &record, &date(), now()).unwrap();
        let (TypedRecord::Message(a), TypedRecord::Message(b)) = (first, second) else {
            panic!("expected messages");
        };
        assert!(a.human);
        assert_eq!(a.content, "Hola, soy Ana");
        assert_eq!(a.contact, ContactId::from("5491111111111"));
        assert!(b.arrival > a.arrival);
        // No timestamp in the record: processing time is used.
        assert_eq!(a.timestamp, now());
    }

    #[test]
    fn status_event_reads_state_fields_by_leaf() {
        let record = FlatRecord::flatten(&json!({
            "category": "flow",
            "action": "state-change",
            "extras": {
                "contactIdentity": "5491111111111@wa.gw.msging.net",
                "#previousStateName": "Atendimento Humano",
                "#previousStateId": "desk:abc"
            }
        }));
        let typed = extractor()
            .extract(RecordKind::StatusEvent, &record, &date(), now())
            .unwrap();
        let TypedRecord::StatusEvent(event) = typed else {
            panic!("expected a status event");
        };
        assert_eq!(event.previous_state_name, "Atendimento Humano");
        assert_eq!(event.previous_state_id, "desk:abc");
        assert_eq!(event.canonical_date, "2024-05-01");
    }

    #[test]
    fn template_send_collects_attribution() {
        let record = FlatRecord::flatten(&json!({
            "id": "msg-1",
            "to": "5491111111111@wa.gw.msging.net",
            "from": "mybot@msging.net",
            "content": {
                "type": "template",
                "template": {
                    "id": "tpl-9",
                    "name": "promo_may",
                    "parameters": ["Ana", "20%"]
                }
            },
            "metadata": {"campaignId": "camp-1"}
        }));
        let typed = extractor()
            .extract(RecordKind::TemplateSend, &record, &date(), now())
            .unwrap();
        let TypedRecord::TemplateSend(send) = typed else {
            panic!("expected a template send");
        };
        assert_eq!(send.template_name, "promo_may");
        assert_eq!(send.template_id, "tpl-9");
        assert_eq!(send.template_params, "Ana|20%");
        assert_eq!(send.campaign_id, "camp-1");
        assert_eq!(send.contact, ContactId::from("5491111111111"));
    }

    #[test]
    fn unknown_kind_is_malformed() {
        let record = FlatRecord::flatten(&json!({"foo": 1}));
        assert!(
            extractor()
                .extract(RecordKind::Unknown, &record, &date(), now())
                .unwrap_err()
                .is_malformed()
        );
    }
}

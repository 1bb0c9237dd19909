// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript rendering for assembled attentions.

use ticketrail_core::{Emitter, MessageRecord, format_timestamp};
use ticketrail_ingest::identity::is_business_address;

/// Renders messages as `[emitter]: content` lines.
#[derive(Debug, Clone)]
pub struct TranscriptRenderer {
    business_domains: Vec<String>,
    separator: String,
}

impl TranscriptRenderer {
    pub fn new(business_domains: Vec<String>, separator: String) -> Self {
        Self {
            business_domains,
            separator,
        }
    }

    /// Human flag or agent identity means an attendant wrote it; a business
    /// sender address means the bot did; anything else is the customer.
    pub fn emitter(&self, message: &MessageRecord) -> Emitter {
        if message.human || message.agent_identity.is_some() {
            Emitter::Agent
        } else if is_business_address(&message.from, &self.business_domains) {
            Emitter::Bot
        } else {
            Emitter::Customer
        }
    }

    /// Joins the rendered lines with the configured separator. Messages must
    /// already be in conversation order.
    pub fn render(&self, messages: &[MessageRecord]) -> String {
        messages
            .iter()
            .map(|m| format!("[{}]: {}", self.emitter(m), m.content))
            .collect::<Vec<_>>()
            .join(&self.separator)
    }

    /// `YYYY-MM-DD HH:MM:SS content` of the earliest attendant message.
    pub fn first_human_contact(&self, messages: &[MessageRecord]) -> Option<String> {
        messages
            .iter()
            .filter(|m| self.emitter(m) == Emitter::Agent)
            .min_by_key(|m| (m.timestamp, m.arrival))
            .map(|m| format!("{} {}", format_timestamp(&m.timestamp), m.content))
    }
}

/// Sorts by timestamp, breaking ties by arrival order.
pub fn sort_messages(messages: &mut [MessageRecord]) {
    messages.sort_by_key(|m| (m.timestamp, m.arrival));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use ticketrail_core::ContactId;

    fn renderer() -> TranscriptRenderer {
        TranscriptRenderer::new(
            vec!["@msging.net".to_string(), "@desk.msging.net".to_string()],
            "\\n".to_string(),
        )
    }

    fn message(arrival: u64, second: i64, from: &str, content: &str, human: bool) -> MessageRecord {
        MessageRecord {
            contact: ContactId::from("5491111111111"),
            arrival,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
                + Duration::seconds(second),
            message_type: "text/plain".to_string(),
            content: content.to_string(),
            from: from.to_string(),
            to: String::new(),
            human,
            agent_identity: None,
        }
    }

    #[test]
    fn renders_emitters_with_literal_separator() {
        let messages = vec![
            message(0, 0, "5491111111111@wa.gw.msging.net", "hola", false),
            message(1, 1, "mybot@msging.net", "Bienvenido", false),
            message(2, 2, "ana%40corp.com@desk.msging.net", "Soy Ana", true),
        ];
        assert_eq!(
            renderer().render(&messages),
            "[customer]: hola\\n[bot]: Bienvenido\\n[agent]: Soy Ana"
        );
    }

    #[test]
    fn first_human_contact_uses_earliest_agent_message() {
        let messages = vec![
            message(0, 0, "mybot@msging.net", "menu", false),
            message(1, 30, "desk@desk.msging.net", "Soy Ana", true),
            message(2, 45, "desk@desk.msging.net", "¿En qué ayudo?", true),
        ];
        assert_eq!(
            renderer().first_human_contact(&messages).as_deref(),
            Some("2024-05-01 10:00:30 Soy Ana")
        );
    }

    #[test]
    fn no_agent_message_means_no_first_contact() {
        let messages = vec![message(0, 0, "mybot@msging.net", "menu", false)];
        assert_eq!(renderer().first_human_contact(&messages), None);
    }

    #[test]
    fn ties_break_on_arrival() {
        let mut messages = vec![
            message(5, 0, "x@wa.gw.msging.net", "second", false),
            message(2, 0, "x@wa.gw.msging.net", "first", false),
        ];
        sort_messages(&mut messages);
        assert_eq!(messages[0].content, "first");
    }
}

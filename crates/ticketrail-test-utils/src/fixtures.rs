// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform record builders shaped like the upstream webhook payloads.
//!
//! Every builder takes the contact's local id (e.g. `5491111111111`) and an
//! RFC 3339 storage timestamp, which drives both the canonical date and the
//! record timestamp.

use serde_json::{Value, json};

pub const TICKET_TYPE: &str = "application/vnd.iris.ticket+json";
pub const BOT_ADDRESS: &str = "mybot@msging.net";

/// WhatsApp-gateway address of a contact.
pub fn address(contact: &str) -> String {
    format!("{contact}@wa.gw.msging.net")
}

/// A session (ticket) notice.
pub fn ticket(contact: &str, seq_id: &str, parent: Option<&str>, at: &str) -> Value {
    json!({
        "id": format!("ticket-{seq_id}"),
        "type": TICKET_TYPE,
        "from": BOT_ADDRESS,
        "to": address(contact),
        "content": {
            "sequentialId": seq_id,
            "parentSequentialId": parent,
            "team": "default",
            "customerIdentity": address(contact)
        },
        "metadata": {"envelope.storageDate": at}
    })
}

/// A ticket opened directly for one attendant.
pub fn ticket_for_agent(
    contact: &str,
    seq_id: &str,
    parent: Option<&str>,
    agent: &str,
    at: &str,
) -> Value {
    let mut value = ticket(contact, seq_id, parent, at);
    value["content"]["agentIdentity"] = json!(agent);
    value
}

pub fn customer_message(contact: &str, text: &str, at: &str) -> Value {
    json!({
        "id": format!("in-{at}"),
        "type": "text/plain",
        "from": address(contact),
        "to": BOT_ADDRESS,
        "content": text,
        "metadata": {"envelope.storageDate": at}
    })
}

pub fn bot_message(contact: &str, text: &str, at: &str) -> Value {
    json!({
        "id": format!("out-{at}"),
        "type": "text/plain",
        "from": BOT_ADDRESS,
        "to": address(contact),
        "content": text,
        "metadata": {"envelope.storageDate": at}
    })
}

/// A message written by a human attendant. `agent` is the raw
/// (percent-encoded) identity, e.g. `ana%40corp.com@blip.ai`.
pub fn agent_message(contact: &str, agent: &str, text: &str, at: &str) -> Value {
    json!({
        "id": format!("agent-{at}"),
        "type": "text/plain",
        "from": BOT_ADDRESS,
        "to": address(contact),
        "content": text,
        "metadata": {
            "envelope.storageDate": at,
            "messageEmitter": "Human",
            "agentIdentity": agent
        }
    })
}

/// A tracked flow event leaving the state named `previous_state_name`.
pub fn status_event(contact: &str, previous_state_name: &str, at: &str) -> Value {
    json!({
        "contact": {"identity": address(contact)},
        "category": "flow",
        "action": "state-change",
        "extras": {
            "previousStateName": previous_state_name,
            "previousStateId": "onboarding"
        },
        "storageDate": at
    })
}

/// A status event that closes the open session (human attendance exit).
pub fn closing_event(contact: &str, at: &str) -> Value {
    status_event(contact, "Atendimento Humano", at)
}

pub fn template_send(contact: &str, name: &str, campaign: Option<&str>, at: &str) -> Value {
    json!({
        "id": format!("tpl-{at}"),
        "type": "application/json",
        "from": BOT_ADDRESS,
        "to": address(contact),
        "content": {
            "type": "template",
            "template": {
                "id": format!("{name}-id"),
                "name": name,
                "parameters": ["Ana"]
            }
        },
        "metadata": {"envelope.storageDate": at, "campaignId": campaign}
    })
}

pub fn contact_profile(contact: &str, at: &str) -> Value {
    json!({
        "identity": address(contact),
        "name": "Ana",
        "lastMessageDate": at
    })
}

// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact and agent identity helpers.

use ticketrail_core::ContactId;

use crate::flatten::FlatRecord;

/// Paths checked, in order, for an explicit contact identity.
const CONTACT_PATHS: &[&str] = &[
    "contactId",
    "contact.identity",
    "content.customerIdentity",
    "customerIdentity",
    "extras.contactIdentity",
    "identity",
];

/// Strips an instance suffix (`/resource`) from a node address.
fn bare_address(address: &str) -> &str {
    address.split('/').next().unwrap_or(address).trim()
}

/// Local part of an address: everything before the first `@`.
pub fn local_part(address: &str) -> &str {
    let bare = bare_address(address);
    bare.split('@').next().unwrap_or(bare)
}

/// True when the address belongs to the business side (bot or desk).
pub fn is_business_address(address: &str, business_domains: &[String]) -> bool {
    let bare = bare_address(address).to_lowercase();
    business_domains
        .iter()
        .any(|domain| bare.ends_with(&domain.to_lowercase()))
}

/// Resolves the contact a record belongs to.
///
/// Explicit identity fields win. Otherwise the message direction decides:
/// when the sender is a business address the recipient is the contact.
pub fn resolve_contact(record: &FlatRecord, business_domains: &[String]) -> Option<ContactId> {
    let explicit = record.first_text(CONTACT_PATHS);
    let address = explicit.or_else(|| {
        let from = record.text("from");
        let to = record.text("to");
        match (from, to) {
            (Some(from), Some(to)) if is_business_address(&from, business_domains) => Some(to),
            (Some(from), _) => Some(from),
            (None, to) => to,
        }
    })?;
    let local = local_part(&address);
    if local.is_empty() {
        None
    } else {
        Some(ContactId(local.to_string()))
    }
}

/// Decodes a percent-encoded agent identity.
///
/// The token is split at the first `@`; the local part is percent-decoded and
/// rejoined with the rest unchanged, so `john.doe%40company.com@blip.ai`
/// becomes `john.doe@company.com@blip.ai`. Decoding failures return the raw
/// token.
pub fn decode_agent_identity(raw: &str) -> String {
    let (local, rest) = match raw.split_once('@') {
        Some((local, rest)) => (local, Some(rest)),
        None => (raw, None),
    };
    match urlencoding::decode(local) {
        Ok(decoded) => match rest {
            Some(rest) => format!("{decoded}@{rest}"),
            None => decoded.into_owned(),
        },
        Err(err) => {
            tracing::debug!(identity = raw, error = %err, "agent identity is not valid percent-encoding");
            raw.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn domains() -> Vec<String> {
        vec!["@msging.net".to_string(), "@desk.msging.net".to_string()]
    }

    #[test]
    fn decodes_percent_encoded_local_part() {
        assert_eq!(
            decode_agent_identity("john.doe%40company.com@blip.ai"),
            "john.doe@company.com@blip.ai"
        );
    }

    #[test]
    fn plain_identity_is_unchanged() {
        assert_eq!(decode_agent_identity("maria@blip.ai"), "maria@blip.ai");
        assert_eq!(decode_agent_identity("no-domain"), "no-domain");
    }

    #[test]
    fn invalid_utf8_returns_raw_token() {
        assert_eq!(decode_agent_identity("bad%FF@blip.ai"), "bad%FF@blip.ai");
    }

    #[test]
    fn explicit_contact_field_wins() {
        let record = FlatRecord::flatten(&json!({
            "from": "bot@msging.net",
            "to": "999@wa.gw.msging.net",
            "content": {"customerIdentity": "5491111111111@wa.gw.msging.net"}
        }));
        assert_eq!(
            resolve_contact(&record, &domains()),
            Some(ContactId::from("5491111111111"))
        );
    }

    #[test]
    fn outbound_message_resolves_to_recipient() {
        let record = FlatRecord::flatten(&json!({
            "from": "mybot@msging.net/instance-1",
            "to": "5491111111111@wa.gw.msging.net"
        }));
        assert_eq!(
            resolve_contact(&record, &domains()),
            Some(ContactId::from("5491111111111"))
        );
    }

    #[test]
    fn inbound_message_resolves_to_sender() {
        let record = FlatRecord::flatten(&json!({
            "from": "5491111111111@wa.gw.msging.net/abc",
            "to": "mybot@msging.net"
        }));
        assert_eq!(
            resolve_contact(&record, &domains()),
            Some(ContactId::from("5491111111111"))
        );
    }

    #[test]
    fn customer_gateway_is_not_business() {
        assert!(!is_business_address("5491@wa.gw.msging.net", &domains()));
        assert!(is_business_address("mybot@msging.net", &domains()));
        assert!(is_business_address("agent%40x.com@desk.msging.net", &domains()));
    }

    #[test]
    fn no_identity_resolves_to_none() {
        let record = FlatRecord::flatten(&json!({"category": "flow"}));
        assert_eq!(resolve_contact(&record, &domains()), None);
    }
}

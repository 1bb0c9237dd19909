// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for record ingestion.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use serde_json::json;
use ticketrail_config::TicketrailConfig;
use ticketrail_core::RecordKind;
use ticketrail_ingest::{FlatRecord, Ingestor, TypedRecord};

fn ingestor() -> Ingestor {
    Ingestor::new(&TicketrailConfig::default())
}

/// The canonical ticket example yields a session notice dated 2024-05-01.
#[test]
fn ticket_example_ingests_as_session_notice() {
    let record = json!({
        "type": "application/vnd.iris.ticket+json",
        "content": {
            "sequentialId": "10",
            "parentSequentialId": null,
            "team": "default",
            "customerIdentity": "5491111111111@wa.gw.msging.net"
        },
        "metadata": {"envelope.storageDate": "2024-05-01T10:00:00Z"}
    });
    let now = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();
    let ingested = ingestor().ingest(&record, now).unwrap();
    assert_eq!(ingested.kind, RecordKind::SessionNotice);
    assert_eq!(ingested.date.date, "2024-05-01");

    let raw = ingested.raw_record();
    assert_eq!(raw.canonical_date, "2024-05-01");
    assert_eq!(raw.canonical_date_source, "metadata.envelope.storageDate");
    assert_eq!(raw.columns["content.sequentialId"], "10");
    assert!(matches!(ingested.typed, TypedRecord::SessionNotice(_)));
}

/// A profile snapshot is accepted but carries no typed payload.
#[test]
fn contact_profile_has_no_payload() {
    let record = json!({"identity": "1@wa.gw.msging.net", "lastMessageDate": "2024-05-02T08:00:00Z"});
    let ingested = ingestor().ingest(&record, Utc::now()).unwrap();
    assert_eq!(ingested.kind, RecordKind::ContactProfile);
    assert_eq!(ingested.date.date, "2024-05-02");
    assert_eq!(ingested.typed, TypedRecord::ContactProfile);
}

/// Unknown shapes and non-object roots are malformed input.
#[test]
fn unknown_and_non_object_records_are_rejected() {
    let ing = ingestor();
    assert!(ing.ingest(&json!({"foo": "bar"}), Utc::now()).unwrap_err().is_malformed());
    assert!(ing.ingest(&json!([1, 2]), Utc::now()).unwrap_err().is_malformed());
    assert!(ing.ingest(&json!("text"), Utc::now()).unwrap_err().is_malformed());
}

proptest! {
    /// Every scalar of an arbitrary nested object survives flattening.
    #[test]
    fn flattening_keeps_every_leaf(
        entries in proptest::collection::btree_map("[a-z]{1,6}", "[a-zA-Z0-9 ]{0,12}", 1..8),
        nested in proptest::collection::btree_map("[a-z]{1,6}", 0i64..1_000_000, 0..5),
    ) {
        let mut root = serde_json::Map::new();
        for (k, v) in &entries {
            root.insert(format!("s_{k}"), json!(v));
        }
        let inner: serde_json::Map<String, serde_json::Value> =
            nested.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
        root.insert("inner".to_string(), serde_json::Value::Object(inner));

        let flat = FlatRecord::flatten(&serde_json::Value::Object(root));
        prop_assert_eq!(flat.len(), entries.len() + nested.len());
        let columns = flat.columns();
        for (k, v) in &entries {
            prop_assert_eq!(columns[&format!("s_{k}")].as_str(), v.as_str());
        }
        for (k, v) in &nested {
            prop_assert_eq!(flat.columns()[&format!("inner.{k}")].clone(), v.to_string());
        }
    }
}

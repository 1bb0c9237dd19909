// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: records in, raw and per-interaction files out.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use ticketrail_config::{MissingDatePolicy, TicketrailConfig};
use ticketrail_core::{ContactId, DateRange, OriginType, RecordKind};
use ticketrail_pipeline::{Disposition, Pipeline};
use ticketrail_test_utils::fixtures::{
    agent_message, bot_message, closing_event, customer_message, status_event, template_send,
    ticket,
};
use ticketrail_test_utils::{MemoryAttentionSink, MemoryRecordSink, TestHarness};
use tracing_test::traced_test;

const CONTACT: &str = "5491111111111";

fn memory_pipeline() -> (Pipeline, Arc<MemoryRecordSink>, Arc<MemoryAttentionSink>) {
    let records = Arc::new(MemoryRecordSink::new());
    let attentions = Arc::new(MemoryAttentionSink::new());
    let pipeline = Pipeline::new(
        &TicketrailConfig::default(),
        records.clone(),
        attentions.clone(),
    );
    (pipeline, records, attentions)
}

#[tokio::test]
async fn ticket_example_is_exported_and_filtered_by_close_date() {
    let harness = TestHarness::new().unwrap();
    let outcomes = harness
        .process_all(&[
            ticket(CONTACT, "10", None, "2024-05-01T10:00:00Z"),
            customer_message(CONTACT, "I need help", "2024-05-01T10:01:00Z"),
            agent_message(CONTACT, "ana%40corp.com@blip.ai", "Hi, Ana here", "2024-05-01T10:05:00Z"),
            closing_event(CONTACT, "2024-05-01T10:30:00Z"),
        ])
        .await
        .unwrap();

    let dispositions: Vec<Disposition> = outcomes.iter().map(|o| o.disposition).collect();
    assert_eq!(
        dispositions,
        vec![
            Disposition::Opened,
            Disposition::Appended,
            Disposition::Appended,
            Disposition::Closed,
        ]
    );
    assert_eq!(outcomes[0].kind, RecordKind::SessionNotice);
    let attention = outcomes[3].attention_path.as_ref().unwrap();
    let name = attention.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("5491111111111_2024-05-01_10_"), "{name}");

    let inside = harness
        .consolidate(Some(DateRange::parse("2024-05-01", "2024-05-01").unwrap()))
        .await
        .unwrap();
    assert_eq!(inside.bot_rows, 1);
    let body = harness.read(inside.bot_path.as_ref().unwrap()).unwrap();
    assert!(body.contains("ana@corp.com"));
    assert!(body.contains("human_attendance_exit"));

    let outside = harness
        .consolidate(Some(DateRange::parse("2024-05-02", "2024-05-03").unwrap()))
        .await
        .unwrap();
    assert_eq!(outside.bot_rows, 0);
    assert!(outside.bot_path.is_none());
}

#[tokio::test]
async fn every_processed_record_gets_a_raw_file() {
    let harness = TestHarness::new().unwrap();
    harness
        .process_all(&[
            ticket(CONTACT, "10", None, "2024-05-01T10:00:00Z"),
            bot_message(CONTACT, "Welcome", "2024-05-01T10:00:05Z"),
            status_event(CONTACT, "Menu", "2024-05-01T10:00:10Z"),
        ])
        .await
        .unwrap();

    assert_eq!(harness.raw_files(RecordKind::SessionNotice).await.unwrap().len(), 1);
    assert_eq!(harness.raw_files(RecordKind::Message).await.unwrap().len(), 1);
    let events = harness.raw_files(RecordKind::StatusEvent).await.unwrap();
    assert_eq!(events.len(), 1);
    let body = harness.read(&events[0]).unwrap();
    assert!(body.starts_with("canonical_date,canonical_date_source,"));
    assert!(body.contains("2024-05-01,storageDate,"));
    assert!(harness.attention_files().await.unwrap().is_empty());
}

#[tokio::test]
async fn contactless_ticket_is_attributed_to_the_supplied_contact() {
    let (pipeline, records, attentions) = memory_pipeline();
    let ticket = json!({
        "type": "application/vnd.iris.ticket+json",
        "content": {"sequentialId": "10", "parentSequentialId": null, "team": "default"},
        "metadata": {"envelope.storageDate": "2024-05-01T10:00:00Z"}
    });

    let err = pipeline.process_record(&ticket).await.unwrap_err();
    assert!(err.is_malformed());
    assert_eq!(records.count().await, 0);

    let contact = ContactId::from(CONTACT);
    let opened = pipeline.process_record_for(&contact, &ticket).await.unwrap();
    assert_eq!(opened.disposition, Disposition::Opened);
    let closed = pipeline
        .process_record(&closing_event(CONTACT, "2024-05-01T10:30:00Z"))
        .await
        .unwrap();
    assert_eq!(closed.disposition, Disposition::Closed);

    let written = attentions.attentions().await;
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].contact, contact);
    assert_eq!(written[0].close_date, "2024-05-01");
}

#[tokio::test]
async fn malformed_records_write_nothing() {
    let (pipeline, records, attentions) = memory_pipeline();
    let err = pipeline
        .process_record(&json!({"foo": "bar"}))
        .await
        .unwrap_err();
    assert!(err.is_malformed());

    // Classified as a notice but with no sequence id.
    let err = pipeline
        .process_record(&json!({
            "type": "application/vnd.iris.ticket+json",
            "content": {"customerIdentity": "1@wa.gw.msging.net"}
        }))
        .await
        .unwrap_err();
    assert!(err.is_malformed());

    assert_eq!(records.count().await, 0);
    assert_eq!(attentions.count().await, 0);
    assert!(pipeline.open_sessions().await.is_empty());
}

#[tokio::test]
#[traced_test]
async fn payload_arrays_skip_malformed_elements() {
    let (pipeline, records, _) = memory_pipeline();
    let payload = json!([
        ticket(CONTACT, "10", None, "2024-05-01T10:00:00Z"),
        {"foo": 1},
        customer_message(CONTACT, "hello", "2024-05-01T10:01:00Z"),
    ]);

    let outcome = pipeline.process_payload(&payload).await.unwrap();

    assert_eq!(outcome.processed.len(), 2);
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].0, 1);
    assert_eq!(records.count().await, 2);
    assert!(logs_contain("rejected malformed record"));
}

#[tokio::test]
async fn scalar_payload_is_rejected() {
    let (pipeline, _, _) = memory_pipeline();
    let err = pipeline.process_payload(&json!("nope")).await.unwrap_err();
    assert!(err.is_malformed());
}

#[tokio::test]
async fn orphan_records_are_exported_raw_but_dropped_by_the_registry() {
    let (pipeline, records, _) = memory_pipeline();
    let message = pipeline
        .process_record(&customer_message(CONTACT, "anyone?", "2024-05-01T09:00:00Z"))
        .await
        .unwrap();
    let event = pipeline
        .process_record(&closing_event(CONTACT, "2024-05-01T09:01:00Z"))
        .await
        .unwrap();

    assert_eq!(message.disposition, Disposition::Dropped);
    assert_eq!(event.disposition, Disposition::Dropped);
    assert!(event.attention_path.is_none());
    assert_eq!(records.count().await, 2);
}

#[tokio::test]
async fn notice_while_open_is_ignored() {
    let (pipeline, _, _) = memory_pipeline();
    pipeline
        .process_record(&ticket(CONTACT, "10", None, "2024-05-01T10:00:00Z"))
        .await
        .unwrap();
    let second = pipeline
        .process_record(&ticket(CONTACT, "11", None, "2024-05-01T10:05:00Z"))
        .await
        .unwrap();

    assert_eq!(second.disposition, Disposition::IgnoredOpen);
    let open = pipeline.open_sessions().await;
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].seq_id.as_str(), "10");
}

#[tokio::test]
async fn transfer_chain_consolidates_to_latest_version() {
    let harness = TestHarness::new().unwrap();
    harness
        .process_all(&[
            ticket(CONTACT, "10", None, "2024-05-01T10:00:00Z"),
            closing_event(CONTACT, "2024-05-01T10:10:00Z"),
            ticket(CONTACT, "11", Some("10"), "2024-05-01T10:11:00Z"),
            closing_event(CONTACT, "2024-05-01T10:40:00Z"),
        ])
        .await
        .unwrap();

    // One version per closure of a chain end, both keyed by the root.
    assert_eq!(harness.attention_files().await.unwrap().len(), 2);

    let out = harness.consolidate(None).await.unwrap();
    assert_eq!(out.bot_rows, 2);
    let body = harness.read(out.bot_path.as_ref().unwrap()).unwrap();
    let rows: Vec<&str> = body.lines().skip(1).collect();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.starts_with("10,") && row.contains("10|11")));
}

#[tokio::test]
async fn template_origin_attention_carries_the_reply() {
    let (pipeline, _, attentions) = memory_pipeline();
    for record in [
        template_send(CONTACT, "promo_may", Some("camp-1"), "2024-05-01T09:00:00Z"),
        ticket(CONTACT, "20", None, "2024-05-01T09:30:00Z"),
        customer_message(CONTACT, "yes please", "2024-05-01T09:31:00Z"),
        closing_event(CONTACT, "2024-05-01T10:00:00Z"),
    ] {
        pipeline.process_record(&record).await.unwrap();
    }

    let written = attentions.attentions().await;
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].origin, OriginType::Template);
    let campaign = written[0].campaign.as_ref().unwrap();
    assert_eq!(campaign.template_name, "promo_may");
    assert_eq!(campaign.campaign_id, "camp-1");
    assert_eq!(campaign.reply.as_ref().unwrap().content, "yes please");
}

#[tokio::test]
async fn attention_write_failure_is_returned() {
    let (pipeline, _, attentions) = memory_pipeline();
    pipeline
        .process_record(&ticket(CONTACT, "10", None, "2024-05-01T10:00:00Z"))
        .await
        .unwrap();
    attentions.fail_writes(true);

    let err = pipeline
        .process_record(&closing_event(CONTACT, "2024-05-01T10:30:00Z"))
        .await
        .unwrap_err();
    assert!(!err.is_malformed());
    assert!(err.to_string().contains("injected failure"));
}

#[tokio::test]
async fn raw_write_failure_leaves_the_registry_untouched() {
    let (pipeline, records, _) = memory_pipeline();
    records.fail_writes(true);
    assert!(
        pipeline
            .process_record(&ticket(CONTACT, "10", None, "2024-05-01T10:00:00Z"))
            .await
            .is_err()
    );
    assert!(pipeline.open_sessions().await.is_empty());
}

#[tokio::test]
async fn undated_records_follow_the_empty_policy() {
    let harness = TestHarness::builder()
        .with_missing_date_policy(MissingDatePolicy::Empty)
        .with_now(Utc::now())
        .build()
        .unwrap();
    let outcome = harness
        .process(&json!({
            "type": "text/plain",
            "from": "5491111111111@wa.gw.msging.net",
            "to": "mybot@msging.net",
            "content": "no date here"
        }))
        .await
        .unwrap();

    let name = outcome.output_path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("message_undated_"), "{name}");
    let body = harness.read(&outcome.output_path).unwrap();
    assert!(body.lines().nth(1).unwrap().starts_with(",fallback,"));
}

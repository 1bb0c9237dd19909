// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Ticketrail session tracker.
//!
//! This crate provides the error taxonomy, the typed records produced by
//! ingestion, the assembled [`Attention`] model, and the sink traits that
//! durable exporters implement.

pub mod attention;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use attention::{
    Attention, AttentionSession, CampaignAttribution, ChainRole, ReplyInfo, TransferType,
};
pub use error::TicketrailError;
pub use traits::{AttentionSink, RawRecord, RecordSink};
pub use types::{
    ClosureReason, ContactId, DateRange, Emitter, MessageRecord, OriginType, RecordKind,
    SequenceId, SessionNotice, StatusEvent, TemplateSend, format_timestamp,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticketrail_error_has_all_variants() {
        let _config = TicketrailError::Config("test".into());
        let _malformed = TicketrailError::malformed("no kind");
        let _storage = TicketrailError::storage("/tmp/x.csv", std::io::Error::other("test"));
        let _export = TicketrailError::Export {
            message: "test".into(),
            source: None,
        };
        let _input = TicketrailError::InvalidInput("test".into());
        let _range = TicketrailError::InvalidDateRange {
            start: "2024-05-02".into(),
            end: "2024-05-01".into(),
        };
        let _internal = TicketrailError::Internal("test".into());
    }

    #[test]
    fn storage_error_mentions_path() {
        let err = TicketrailError::storage("/tmp/out.csv", std::io::Error::other("disk full"));
        let msg = err.to_string();
        assert!(msg.contains("/tmp/out.csv"));
        assert!(msg.contains("disk full"));
        assert!(!err.is_malformed());
    }

    #[test]
    fn malformed_is_detectable() {
        assert!(TicketrailError::malformed("missing sequentialId").is_malformed());
    }

    #[test]
    fn ids_display_their_inner_value() {
        assert_eq!(ContactId::from("5491111111111").to_string(), "5491111111111");
        assert_eq!(SequenceId::from("10").to_string(), "10");
    }

    #[test]
    fn all_sink_traits_are_exported() {
        fn _assert_attention_sink<T: AttentionSink>() {}
        fn _assert_record_sink<T: RecordSink>() {}
    }
}

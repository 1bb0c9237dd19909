// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic record kind classification.
//!
//! Ordered predicates over the flattened record, first match wins. The
//! shapes come from configuration so platform changes need no code change.

use ticketrail_config::model::ClassifierConfig;
use ticketrail_core::RecordKind;

use crate::flatten::FlatRecord;

/// Leaf field that only contact profile snapshots carry.
const PROFILE_LEAF: &str = "lastMessageDate";

/// Leaf field that marks a tracked status event.
const STATUS_LEAF: &str = "category";

/// Assigns a [`RecordKind`] to flattened records.
#[derive(Debug, Clone)]
pub struct RecordClassifier {
    session_content_type: String,
    session_fields: Vec<String>,
    template_content_types: Vec<String>,
    template_keys: Vec<String>,
}

impl RecordClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            session_content_type: config.session_content_type.clone(),
            session_fields: config.session_fields.clone(),
            template_content_types: config
                .template_content_types
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
            template_keys: config.template_keys.clone(),
        }
    }

    /// Classifies a record. Session notices win over messages when a record
    /// carries both shapes.
    pub fn classify(&self, record: &FlatRecord) -> RecordKind {
        if self.is_session_notice(record) {
            RecordKind::SessionNotice
        } else if self.is_template_send(record) {
            RecordKind::TemplateSend
        } else if record.contains("type") {
            RecordKind::Message
        } else if record.has_leaf(STATUS_LEAF) {
            RecordKind::StatusEvent
        } else if record.has_leaf(PROFILE_LEAF) {
            RecordKind::ContactProfile
        } else {
            RecordKind::Unknown
        }
    }

    fn is_session_notice(&self, record: &FlatRecord) -> bool {
        let typed = record
            .get("type")
            .and_then(|v| v.as_str())
            .is_some_and(|t| t.eq_ignore_ascii_case(&self.session_content_type));
        typed || self.session_fields.iter().any(|f| record.has_leaf(f))
    }

    fn is_template_send(&self, record: &FlatRecord) -> bool {
        let typed = record
            .get("content.type")
            .and_then(|v| v.as_str())
            .is_some_and(|t| self.template_content_types.contains(&t.to_lowercase()));
        typed || self.template_keys.iter().any(|k| record.contains(k))
    }
}

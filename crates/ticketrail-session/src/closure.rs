// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic closure detection over status events.
//!
//! A session closes when the flow leaves a human-attendance state, leaves a
//! desk state, or tracks a survey action. Matching is case-insensitive and
//! driven by the configured trigger tables.

use ticketrail_config::model::ClosureConfig;
use ticketrail_core::{ClosureReason, StatusEvent};

/// Pure predicate deciding whether a status event closes its session.
#[derive(Debug, Clone)]
pub struct ClosureDetector {
    state_names: Vec<String>,
    state_id_prefixes: Vec<String>,
    actions: Vec<String>,
}

impl ClosureDetector {
    pub fn new(config: &ClosureConfig) -> Self {
        let lower = |values: &[String]| -> Vec<String> {
            values.iter().map(|v| v.to_lowercase()).collect()
        };
        Self {
            state_names: lower(&config.previous_state_names),
            state_id_prefixes: lower(&config.previous_state_id_prefixes),
            actions: lower(&config.actions),
        }
    }

    /// Returns the rule that fired, checked in name, id, action order.
    pub fn detect(&self, event: &StatusEvent) -> Option<ClosureReason> {
        let name = event.previous_state_name.to_lowercase();
        if self.state_names.iter().any(|n| name.contains(n.as_str())) {
            return Some(ClosureReason::HumanAttendanceExit);
        }
        let id = event.previous_state_id.to_lowercase();
        if self.state_id_prefixes.iter().any(|p| id.starts_with(p.as_str())) {
            return Some(ClosureReason::DeskStateExit);
        }
        let action = event.action.to_lowercase();
        if self.actions.iter().any(|a| action.contains(a.as_str())) {
            return Some(ClosureReason::SurveyAction);
        }
        None
    }
}

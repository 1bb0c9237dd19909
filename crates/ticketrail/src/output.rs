// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal output: JSON for scripting, colored lines for people.

use std::io::IsTerminal;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use ticketrail_core::TicketrailError;

pub struct Output {
    json: bool,
    color: bool,
}

impl Output {
    /// Colors are used only on a terminal and never with `--plain`.
    pub fn new(json: bool, plain: bool) -> Self {
        Self {
            json,
            color: !plain && std::io::stdout().is_terminal(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn json<T: Serialize>(&self, value: &T) -> Result<(), TicketrailError> {
        let rendered = serde_json::to_string_pretty(value)
            .map_err(|e| TicketrailError::Internal(format!("failed to render JSON: {e}")))?;
        println!("{rendered}");
        Ok(())
    }

    pub fn heading(&self, text: &str) {
        if self.color {
            println!("{}", text.bold().green());
        } else {
            println!("{text}");
        }
    }

    /// One `label: value` line.
    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        if self.color {
            println!("  {} {value}", format!("{label}:").dimmed());
        } else {
            println!("  {label}: {value}");
        }
    }

    /// A written file, or a note that nothing matched.
    pub fn file(&self, label: &str, path: Option<&Path>) {
        match path {
            Some(path) => self.field(label, path.display()),
            None if self.color => self.field(label, "nothing to write".yellow()),
            None => self.field(label, "nothing to write"),
        }
    }

    pub fn list(&self, items: &[String]) {
        for item in items {
            println!("{item}");
        }
    }
}

// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Black-box tests of the `ticketrail` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use ticketrail_test_utils::fixtures::{closing_event, customer_message, template_send, ticket};

const CONTACT: &str = "5491111111111";

struct Workspace {
    dir: tempfile::TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("ticketrail.toml");
        let exports = dir.path().join("exports");
        std::fs::write(
            &config,
            format!("[storage]\noutput_dir = {:?}\n", exports.to_string_lossy()),
        )
        .unwrap();
        Self { dir, config }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_ticketrail"))
            .arg("--config")
            .arg(&self.config)
            .args(args)
            .env("RUST_LOG", "off")
            .output()
            .unwrap()
    }

    fn run_json(&self, args: &[&str]) -> Value {
        let mut args = args.to_vec();
        args.push("--json");
        let output = self.run(&args);
        assert!(
            output.status.success(),
            "ticketrail {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

fn write_lines(path: &Path, records: &[Value]) {
    let body: Vec<String> = records.iter().map(Value::to_string).collect();
    std::fs::write(path, body.join("\n")).unwrap();
}

#[test]
fn ingest_then_consolidate() {
    let ws = Workspace::new();
    let input = ws.path("records.jsonl");
    write_lines(
        &input,
        &[
            ticket(CONTACT, "10", None, "2024-05-01T10:00:00Z"),
            customer_message(CONTACT, "hello", "2024-05-01T10:01:00Z"),
            closing_event(CONTACT, "2024-05-01T10:30:00Z"),
            serde_json::json!({"unrelated": true}),
        ],
    );

    let summary = ws.run_json(&["ingest", input.to_str().unwrap()]);
    assert_eq!(summary["processed"], 3);
    assert_eq!(summary["rejected"], 1);
    assert_eq!(summary["attentions"].as_array().unwrap().len(), 1);
    assert_eq!(summary["open_sessions"], 0);

    let merged = ws.run_json(&["consolidate", "--from", "2024-05-01", "--to", "2024-05-01"]);
    assert_eq!(merged["bot_rows"], 1);
    let bot_path = merged["bot_path"].as_str().unwrap();
    assert!(bot_path.ends_with("bot_2024-05-01_2024-05-01.csv"));

    let empty = ws.run_json(&["consolidate", "--from", "2024-05-02", "--to", "2024-05-03"]);
    assert_eq!(empty["bot_rows"], 0);
    assert!(empty["bot_path"].is_null());
}

#[test]
fn array_documents_and_listings() {
    let ws = Workspace::new();
    let input = ws.path("records.json");
    let records = Value::Array(vec![
        template_send(CONTACT, "promo_may", None, "2024-05-01T09:00:00Z"),
        ticket(CONTACT, "20", None, "2024-05-01T09:30:00Z"),
        customer_message(CONTACT, "yes", "2024-05-01T09:31:00Z"),
        closing_event(CONTACT, "2024-05-01T10:00:00Z"),
    ]);
    std::fs::write(&input, records.to_string()).unwrap();

    let summary = ws.run_json(&["ingest", input.to_str().unwrap()]);
    assert_eq!(summary["processed"], 4);
    assert_eq!(summary["by_kind"]["template-send"], 1);

    let templates = ws.run_json(&["templates"]);
    assert_eq!(templates, serde_json::json!(["promo_may"]));

    let report = ws.run_json(&["campaigns"]);
    assert_eq!(report["summary"][0]["sent"], 1);
    assert_eq!(report["summary"][0]["replied"], 1);

    let kind = ws.run_json(&["kind-export", "template-send"]);
    assert!(kind["path"].as_str().unwrap().ends_with("template-send_all.csv"));
}

#[test]
fn half_open_range_fails() {
    let ws = Workspace::new();
    let output = ws.run(&["consolidate", "--from", "2024-05-01"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--from and --to"));
}

#[test]
fn invalid_config_is_reported() {
    let ws = Workspace::new();
    std::fs::write(&ws.config, "[storage]\noutput_dirr = \"/tmp\"\n").unwrap();
    let output = ws.run(&["config"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("output_dir"));
}

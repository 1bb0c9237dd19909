// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticketrail - session lifecycle tracker and CSV consolidation.
//!
//! This is the binary entry point.

mod export;
mod ingest;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ticketrail_config::TicketrailConfig;
use ticketrail_core::{RecordKind, TicketrailError};

/// Ticketrail - turns conversational platform events into attention exports.
#[derive(Parser, Debug)]
#[command(name = "ticketrail", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON results.
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Inclusive closure-date filter.
#[derive(clap::Args, Debug, Clone, Default)]
struct RangeArgs {
    /// First date (YYYY-MM-DD), requires --to.
    #[arg(long)]
    from: Option<String>,
    /// Last date (YYYY-MM-DD), requires --from.
    #[arg(long)]
    to: Option<String>,
}

/// Directory overrides for export commands.
#[derive(clap::Args, Debug, Clone, Default)]
struct DirArgs {
    /// Source directory (defaults to the configured one).
    #[arg(long)]
    source: Option<PathBuf>,
    /// Output directory (defaults to the configured merged directory).
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Process records from files (or `-` for stdin): a JSON record, a JSON
    /// array of records, or JSON lines.
    Ingest {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Contact for records that name none (e.g. a per-contact ticket feed).
        #[arg(long)]
        contact: Option<String>,
    },
    /// Merge per-interaction files into bot and template exports.
    Consolidate {
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        dirs: DirArgs,
    },
    /// Merge per-interaction files for one agent.
    AgentExport {
        /// Raw or decoded agent identity.
        agent: String,
        /// Keep only template-origin rows of this template.
        #[arg(long)]
        template: Option<String>,
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        dirs: DirArgs,
    },
    /// Concatenate the raw exports of one record kind.
    KindExport {
        /// Record kind, e.g. `status-event`.
        kind: RecordKind,
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        dirs: DirArgs,
    },
    /// List distinct agents across per-interaction files.
    Agents {
        #[command(flatten)]
        dirs: DirArgs,
    },
    /// List distinct template names across per-interaction files.
    Templates {
        #[command(flatten)]
        dirs: DirArgs,
    },
    /// Join template sends with template-origin sessions.
    Campaigns {
        #[command(flatten)]
        range: RangeArgs,
        /// Raw exports directory (defaults to the configured one).
        #[arg(long)]
        raw: Option<PathBuf>,
        #[command(flatten)]
        dirs: DirArgs,
    },
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => ticketrail_config::load_and_validate_path(path),
        None => ticketrail_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            ticketrail_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.service.log_level);

    if let Err(e) = run(cli, &config).await {
        eprintln!("ticketrail: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &TicketrailConfig) -> Result<(), TicketrailError> {
    let out = output::Output::new(cli.json, cli.plain);
    match cli.command {
        Some(Commands::Ingest { inputs, contact }) => {
            ingest::run_ingest(config, &inputs, contact.as_deref(), &out).await
        }
        Some(Commands::Consolidate { range, dirs }) => {
            export::run_consolidate(config, &range, &dirs, &out).await
        }
        Some(Commands::AgentExport {
            agent,
            template,
            range,
            dirs,
        }) => {
            export::run_agent_export(config, &agent, template.as_deref(), &range, &dirs, &out).await
        }
        Some(Commands::KindExport { kind, range, dirs }) => {
            export::run_kind_export(config, kind, &range, &dirs, &out).await
        }
        Some(Commands::Agents { dirs }) => export::run_agents(config, &dirs, &out).await,
        Some(Commands::Templates { dirs }) => export::run_templates(config, &dirs, &out).await,
        Some(Commands::Campaigns { range, raw, dirs }) => {
            export::run_campaigns(config, &range, raw.as_deref(), &dirs, &out).await
        }
        Some(Commands::Config) => {
            let rendered = toml::to_string_pretty(config)
                .map_err(|e| TicketrailError::Internal(format!("failed to render config: {e}")))?;
            print!("{rendered}");
            Ok(())
        }
        None => {
            println!("ticketrail: use --help for available commands");
            Ok(())
        }
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ticketrail={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_loads_config_defaults() {
        let config = ticketrail_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.service.name, "ticketrail");
    }

    #[test]
    fn cli_parses_kind_export() {
        let cli = Cli::try_parse_from([
            "ticketrail",
            "kind-export",
            "status-event",
            "--from",
            "2024-05-01",
            "--to",
            "2024-05-03",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::KindExport { kind, range, .. }) => {
                assert_eq!(kind, RecordKind::StatusEvent);
                assert_eq!(range.from.as_deref(), Some("2024-05-01"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_ingest_contact() {
        let cli = Cli::try_parse_from([
            "ticketrail",
            "ingest",
            "tickets.json",
            "--contact",
            "5491111111111",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Ingest { inputs, contact }) => {
                assert_eq!(inputs, vec![PathBuf::from("tickets.json")]);
                assert_eq!(contact.as_deref(), Some("5491111111111"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["ticketrail", "kind-export", "bogus"]).is_err());
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from(["ticketrail", "agents", "--json", "--plain"]).unwrap();
        assert!(cli.json);
        assert!(cli.plain);
    }
}

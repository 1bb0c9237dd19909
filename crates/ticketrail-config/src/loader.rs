// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./ticketrail.toml` > `~/.config/ticketrail/ticketrail.toml`
//! > `/etc/ticketrail/ticketrail.toml` with environment variable overrides via the
//! `TICKETRAIL_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TicketrailConfig;

/// Config sections, used to map `TICKETRAIL_<SECTION>_<KEY>` to `section.key`.
const SECTIONS: &[&str] = &[
    "service",
    "storage",
    "registry",
    "closure",
    "classifier",
    "dates",
    "transcript",
    "campaign",
    "consolidation",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/ticketrail/ticketrail.toml` (system-wide)
/// 3. `~/.config/ticketrail/ticketrail.toml` (user XDG config)
/// 4. `./ticketrail.toml` (local directory)
/// 5. `TICKETRAIL_*` environment variables
pub fn load_config() -> Result<TicketrailConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<TicketrailConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TicketrailConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TicketrailConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TicketrailConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TicketrailConfig::default()))
        .merge(Toml::file("/etc/ticketrail/ticketrail.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("ticketrail/ticketrail.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("ticketrail.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider with explicit section mapping.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `TICKETRAIL_STORAGE_OUTPUT_DIR` maps to `storage.output_dir`, not
/// `storage.output.dir`.
fn env_provider() -> Env {
    Env::prefixed("TICKETRAIL_").map(|key| {
        let key_str = key.as_str();
        for section in SECTIONS {
            if let Some(rest) = key_str
                .strip_prefix(section)
                .and_then(|r| r.strip_prefix('_'))
            {
                return format!("{section}.{rest}").into();
            }
        }
        key_str.to_string().into()
    })
}

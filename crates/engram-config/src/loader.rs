// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-based configuration loading.
//!
//! TOML files are merged lowest-precedence first (system, then user XDG,
//! then the working directory), and `ENGRAM_*` environment variables win
//! over everything.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::EngramConfig;

/// Top-level sections of [`EngramConfig`], used to split env var names.
/// Must stay in sync with the struct's fields.
const SECTIONS: &[&str] = &["agent", "memory", "llm", "embedder", "storage"];

/// TOML files consulted by [`load_config`], lowest precedence first.
fn config_files() -> Vec<PathBuf> {
    let mut files = vec![PathBuf::from("/etc/engram/engram.toml")];
    if let Some(dir) = dirs::config_dir() {
        files.push(dir.join("engram/engram.toml"));
    }
    files.push(PathBuf::from("engram.toml"));
    files
}

fn defaults() -> Figment {
    Figment::from(Serialized::defaults(EngramConfig::default()))
}

/// Load configuration from the standard file hierarchy, then apply
/// `ENGRAM_*` environment overrides. Missing files are skipped.
pub fn load_config() -> Result<EngramConfig, figment::Error> {
    let mut figment = defaults();
    for file in config_files() {
        figment = figment.merge(Toml::file(file));
    }
    figment.merge(env_provider()).extract()
}

/// Load configuration from a TOML string over the compiled defaults.
/// No files or environment variables are consulted; used by tests.
pub fn load_config_from_str(toml_content: &str) -> Result<EngramConfig, figment::Error> {
    defaults().merge(Toml::string(toml_content)).extract()
}

/// Load configuration from one explicit file, then apply `ENGRAM_*`
/// environment overrides.
pub fn load_config_from_path(path: &Path) -> Result<EngramConfig, figment::Error> {
    defaults()
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment provider translating `ENGRAM_<SECTION>_<KEY>` into the
/// nested `<section>.<key>` form.
///
/// Only the underscore separating a known section name from the rest of
/// the variable becomes a dot; whatever follows is kept verbatim, so keys
/// that contain underscores themselves survive the split
/// (`ENGRAM_STORAGE_DATABASE_PATH` -> `storage.database_path`).
/// Variables whose first component is not a section are passed through
/// unchanged and rejected later by `deny_unknown_fields`.
fn env_provider() -> Env {
    Env::prefixed("ENGRAM_").map(|key| {
        let key = key.as_str();
        if let Some((section, rest)) = key.split_once('_') {
            if SECTIONS.contains(&section) && !rest.is_empty() {
                return format!("{section}.{rest}").into();
            }
        }
        key.to_string().into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_match_config_fields() {
        // SECTIONS drives the env split; a field added to EngramConfig
        // without a matching entry here would silently lose its overrides.
        let value = serde_json::to_value(EngramConfig::default()).unwrap();
        let fields: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(|k| k.as_str())
            .collect();
        for field in &fields {
            assert!(SECTIONS.contains(field), "section list is missing `{field}`");
        }
        assert_eq!(fields.len(), SECTIONS.len());
    }

    #[test]
    fn env_overrides_reach_nested_keys() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("ENGRAM_LLM_API_KEY", "from-env");
            jail.set_env("ENGRAM_STORAGE_DATABASE_PATH", "/tmp/env.db");
            jail.set_env("ENGRAM_MEMORY_FLUSH_THRESHOLD_MESSAGES", "3");

            let config: EngramConfig = defaults().merge(env_provider()).extract()?;
            assert_eq!(config.llm.api_key.as_deref(), Some("from-env"));
            assert_eq!(config.storage.database_path, "/tmp/env.db");
            assert_eq!(config.memory.flush_threshold_messages, 3);
            Ok(())
        });
    }

    #[test]
    fn unknown_section_env_var_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("ENGRAM_BOGUS_KEY", "x");
            let result: Result<EngramConfig, _> =
                defaults().merge(env_provider()).extract();
            assert!(result.is_err(), "unknown top-level key should fail");
            Ok(())
        });
    }
}

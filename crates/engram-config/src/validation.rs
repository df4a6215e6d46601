// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as positive thresholds and non-empty paths.

use thiserror::Error;

use crate::model::EngramConfig;

/// A semantic configuration error found after deserialization.
#[derive(Debug, Error)]
#[error("config validation: {message}")]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &EngramConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::new("storage.database_path must not be empty"));
    }

    if config.embedder.dimensions == 0 {
        errors.push(ConfigError::new("embedder.dimensions must be positive"));
    }

    if config.llm.max_tokens == 0 {
        errors.push(ConfigError::new("llm.max_tokens must be positive"));
    }

    if config.memory.flush_threshold_tokens == 0 {
        errors.push(ConfigError::new(
            "memory.flush_threshold_tokens must be positive",
        ));
    }

    if config.memory.flush_threshold_messages == 0 {
        errors.push(ConfigError::new(
            "memory.flush_threshold_messages must be positive",
        ));
    }

    if config.memory.time_step_ms <= 0 {
        errors.push(ConfigError::new(format!(
            "memory.time_step_ms must be positive, got {}",
            config.memory.time_step_ms
        )));
    }

    let level = config.agent.log_level.as_str();
    if !matches!(level, "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ConfigError::new(format!(
            "agent.log_level `{level}` is not one of trace/debug/info/warn/error"
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

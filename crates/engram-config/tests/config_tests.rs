// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for configuration loading and validation.

use engram_config::{
    load_config_from_str, validate_config, EngramConfig, MessagesUse, RetrieveStrategy,
    UpdateStrategy,
};

#[test]
fn defaults_are_sensible() {
    let config = EngramConfig::default();
    assert_eq!(config.agent.name, "engram");
    assert_eq!(config.agent.log_level, "info");
    assert_eq!(config.memory.messages_use, MessagesUse::UserOnly);
    assert_eq!(config.memory.retrieve_strategy, RetrieveStrategy::Embedding);
    assert_eq!(config.memory.update_strategy, UpdateStrategy::Offline);
    assert_eq!(config.memory.flush_threshold_messages, 10);
    assert_eq!(config.memory.time_step_ms, 500);
    assert!(!config.memory.recompute_embedding_on_update);
    assert_eq!(config.storage.database_path, "engram.db");
    assert!(config.storage.wal_mode);
    assert!(config.embedder.dimensions > 0);
}

#[test]
fn empty_toml_yields_defaults() {
    let config = load_config_from_str("").unwrap();
    assert_eq!(config.agent.name, "engram");
    assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
}

#[test]
fn toml_overrides_defaults() {
    let toml = r#"
        [agent]
        name = "test-engine"
        log_level = "debug"

        [memory]
        messages_use = "hybrid"
        flush_threshold_messages = 4

        [llm]
        model = "gpt-4o"
        max_tokens = 512

        [embedder]
        dimensions = 64

        [storage]
        database_path = "/tmp/test.db"
        wal_mode = false
    "#;
    let config = load_config_from_str(toml).unwrap();
    assert_eq!(config.agent.name, "test-engine");
    assert_eq!(config.agent.log_level, "debug");
    assert_eq!(config.memory.messages_use, MessagesUse::Hybrid);
    assert_eq!(config.memory.flush_threshold_messages, 4);
    assert_eq!(config.llm.model, "gpt-4o");
    assert_eq!(config.llm.max_tokens, 512);
    assert_eq!(config.embedder.dimensions, 64);
    assert_eq!(config.storage.database_path, "/tmp/test.db");
    assert!(!config.storage.wal_mode);
}

#[test]
fn unknown_keys_are_rejected() {
    let toml = r#"
        [memory]
        messages_use = "user_only"
        not_a_real_key = true
    "#;
    let result = load_config_from_str(toml);
    assert!(result.is_err(), "unknown keys should fail deserialization");
}

#[test]
fn invalid_enum_value_is_rejected() {
    let toml = r#"
        [memory]
        messages_use = "everyone"
    "#;
    assert!(load_config_from_str(toml).is_err());
}

#[test]
fn validation_passes_for_defaults() {
    let config = EngramConfig::default();
    assert!(validate_config(&config).is_ok());
}

#[test]
fn validation_collects_all_errors() {
    let mut config = EngramConfig::default();
    config.storage.database_path = "  ".to_string();
    config.embedder.dimensions = 0;
    config.memory.time_step_ms = -1;
    config.agent.log_level = "loud".to_string();

    let errors = validate_config(&config).unwrap_err();
    assert_eq!(errors.len(), 4, "should not fail fast: {errors:?}");
}

#[test]
fn messages_use_display_roundtrip() {
    use std::str::FromStr;

    for policy in [
        MessagesUse::UserOnly,
        MessagesUse::AssistantOnly,
        MessagesUse::Hybrid,
    ] {
        let s = policy.to_string();
        assert_eq!(MessagesUse::from_str(&s).unwrap(), policy);
    }
}

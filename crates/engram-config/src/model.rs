// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Engram memory engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Top-level Engram configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngramConfig {
    /// Process identity and logging settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Memory pipeline behavior.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Chat-completion provider settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding provider settings.
    #[serde(default)]
    pub embedder: EmbedderConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the engine instance.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "engram".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Which dialog roles participate in fact extraction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessagesUse {
    /// Only user turns are extracted.
    #[default]
    UserOnly,
    /// Only assistant turns are extracted.
    AssistantOnly,
    /// Both user and assistant turns are extracted.
    Hybrid,
}

/// Retrieval strategy. Only `embedding` is implemented; the other names are
/// validated and reserved for extension.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RetrieveStrategy {
    /// Dense-vector nearest-neighbor search.
    #[default]
    Embedding,
    /// Reserved: retrieval from recent context.
    Context,
    /// Reserved: fused strategy.
    Hybrid,
}

/// When consolidation decisions run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UpdateStrategy {
    /// Reserved: decide at ingestion time.
    Online,
    /// Deferred two-phase consolidation.
    #[default]
    Offline,
}

/// Memory pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Role-filter policy applied before extraction.
    #[serde(default)]
    pub messages_use: MessagesUse,

    /// When set, the extraction prompt additionally requests
    /// category/subcategory tags, which land on the created records.
    #[serde(default)]
    pub metadata_generate: bool,

    /// Whether compressed summaries are produced (reserved).
    #[serde(default)]
    pub text_summary: bool,

    /// Retrieval strategy.
    #[serde(default)]
    pub retrieve_strategy: RetrieveStrategy,

    /// Consolidation scheduling.
    #[serde(default)]
    pub update_strategy: UpdateStrategy,

    /// Token budget that marks the short-term buffer ready for extraction.
    #[serde(default = "default_flush_threshold_tokens")]
    pub flush_threshold_tokens: usize,

    /// Message-count trigger that also marks the buffer ready.
    #[serde(default = "default_flush_threshold_messages")]
    pub flush_threshold_messages: usize,

    /// Offset added to consecutive messages sharing one session marker.
    #[serde(default = "default_time_step_ms")]
    pub time_step_ms: i64,

    /// Recompute a record's embedding when consolidation rewrites its text.
    /// Off by default: the stale vector preserves retrieval locality with
    /// respect to the original evidence.
    #[serde(default)]
    pub recompute_embedding_on_update: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            messages_use: MessagesUse::default(),
            metadata_generate: false,
            text_summary: false,
            retrieve_strategy: RetrieveStrategy::default(),
            update_strategy: UpdateStrategy::default(),
            flush_threshold_tokens: default_flush_threshold_tokens(),
            flush_threshold_messages: default_flush_threshold_messages(),
            time_step_ms: default_time_step_ms(),
            recompute_embedding_on_update: false,
        }
    }
}

fn default_flush_threshold_tokens() -> usize {
    2048
}

fn default_flush_threshold_messages() -> usize {
    10
}

fn default_time_step_ms() -> i64 {
    500
}

/// Chat-completion provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// API key. `None` requires the `ENGRAM_LLM_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model used for extraction and consolidation decisions.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Maximum tokens per completion.
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            max_tokens: default_llm_max_tokens(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_max_tokens() -> u32 {
    2048
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbedderConfig {
    /// API key. `None` falls back to the LLM key.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Embedding model identifier.
    #[serde(default = "default_embedder_model")]
    pub model: String,

    /// Vector dimension. Must match the stored blob size.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_embedder_model(),
            dimensions: default_dimensions(),
        }
    }
}

fn default_embedder_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimensions() -> usize {
    1536
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "engram.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

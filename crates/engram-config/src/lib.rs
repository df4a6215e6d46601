// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Engram memory engine.
//!
//! Layered TOML loading via Figment with `ENGRAM_*` environment overrides,
//! strict serde models, and collect-all semantic validation.

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    AgentConfig, EmbedderConfig, EngramConfig, LlmConfig, MemoryConfig, MessagesUse,
    RetrieveStrategy, StorageConfig, UpdateStrategy,
};
pub use validation::{validate_config, ConfigError};

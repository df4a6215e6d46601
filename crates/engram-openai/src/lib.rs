// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible provider backends for the Engram memory engine.
//!
//! This crate implements [`engram_core::ProviderAdapter`] and
//! [`engram_core::EmbeddingAdapter`] against any endpoint speaking the
//! OpenAI chat-completions and embeddings wire formats.

pub mod client;
pub mod types;

use engram_config::{EmbedderConfig, LlmConfig};
use engram_core::EngramError;

pub use client::{OpenAiChatClient, OpenAiEmbeddingsClient};

/// Builds a chat client from configuration.
///
/// API key resolution: `config.api_key` if set, otherwise the
/// `OPENAI_API_KEY` environment variable.
pub fn chat_client_from_config(config: &LlmConfig) -> Result<OpenAiChatClient, EngramError> {
    let api_key = resolve_api_key(config.api_key.as_deref())?;
    OpenAiChatClient::new(api_key, config.base_url.clone())
}

/// Builds an embeddings client from configuration.
///
/// Falls back to `fallback_key` (typically the LLM key) and then to the
/// `OPENAI_API_KEY` environment variable.
pub fn embeddings_client_from_config(
    config: &EmbedderConfig,
    fallback_key: Option<&str>,
) -> Result<OpenAiEmbeddingsClient, EngramError> {
    let api_key = resolve_api_key(config.api_key.as_deref().or(fallback_key))?;
    OpenAiEmbeddingsClient::new(
        api_key,
        config.base_url.clone(),
        config.model.clone(),
        Some(config.dimensions),
    )
}

fn resolve_api_key(configured: Option<&str>) -> Result<String, EngramError> {
    if let Some(key) = configured {
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }
    std::env::var("OPENAI_API_KEY").map_err(|_| {
        EngramError::Config(
            "no API key configured and OPENAI_API_KEY is not set".to_string(),
        )
    })
}

// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible API request/response types.

use serde::{Deserialize, Serialize};

// --- Chat completions ---

/// A request to the `/chat/completions` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    /// Model identifier.
    pub model: String,

    /// Conversation messages.
    pub messages: Vec<ApiChatMessage>,

    /// Response format constraint, e.g. `{"type": "json_object"}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,

    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// A single message in the OpenAI conversation format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiChatMessage {
    /// Role: "system", "user", or "assistant".
    pub role: String,
    /// Plain-text content.
    pub content: String,
}

/// Response format constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFormat {
    /// Format type (e.g., "json_object").
    #[serde(rename = "type")]
    pub format_type: String,
}

impl ResponseFormat {
    /// The `json_object` response format.
    pub fn json_object() -> Self {
        Self {
            format_type: "json_object".to_string(),
        }
    }
}

/// A response from the `/chat/completions` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    /// Completion choices; the engine reads the first.
    pub choices: Vec<ChatChoice>,
    /// Token usage for the call.
    #[serde(default)]
    pub usage: Option<ApiUsage>,
}

/// One completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    /// The generated message.
    pub message: ChoiceMessage,
}

/// The message inside a completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    /// Generated text content. May be absent for refusals.
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage as reported by a chat completion.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ApiUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

// --- Embeddings ---

/// A request to the `/embeddings` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingsRequest {
    /// Model identifier.
    pub model: String,

    /// Texts to embed.
    pub input: Vec<String>,

    /// Requested output dimension, when the model supports truncation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
}

/// A response from the `/embeddings` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsResponse {
    /// One object per input text, in input order.
    pub data: Vec<EmbeddingObject>,
    /// Token usage for the call.
    #[serde(default)]
    pub usage: Option<EmbeddingsUsage>,
}

/// A single embedding vector.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingObject {
    pub embedding: Vec<f32>,
}

/// Token usage as reported by an embeddings call.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct EmbeddingsUsage {
    #[serde(default)]
    pub total_tokens: u64,
}

// --- Errors ---

/// Error envelope returned by OpenAI-compatible endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

/// The error payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    /// Human-readable error message.
    pub message: String,
    /// Error type (e.g., "invalid_request_error").
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
}

// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP clients for OpenAI-compatible chat-completion and embeddings endpoints.
//!
//! Provides [`OpenAiChatClient`] and [`OpenAiEmbeddingsClient`], which handle
//! request construction, bearer authentication, and transient error retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use engram_core::types::{
    EmbeddingInput, EmbeddingOutput, ProviderRequest, ProviderResponse, TokenUsage,
};
use engram_core::{EmbeddingAdapter, EngramError, ProviderAdapter};

use crate::types::{
    ApiChatMessage, ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse,
    EmbeddingsRequest, EmbeddingsResponse, ResponseFormat,
};

/// Request timeout for both endpoints.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Builds the shared HTTP client with bearer auth default headers.
fn build_http_client(api_key: &str) -> Result<reqwest::Client, EngramError> {
    let mut headers = HeaderMap::new();
    let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
        .map_err(|e| EngramError::Config(format!("invalid API key header value: {e}")))?;
    headers.insert("authorization", bearer);
    headers.insert("content-type", HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| EngramError::Provider {
            message: format!("failed to build HTTP client: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503 | 529)
}

/// Decodes an error body into a readable message.
fn decode_error_body(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(body) {
        format!(
            "API error ({}): {}",
            api_err.error.type_.as_deref().unwrap_or("unknown"),
            api_err.error.message
        )
    } else {
        format!("API returned {status}: {body}")
    }
}

/// Posts `request_body` to `url`, retrying once after a 1-second delay on
/// transient errors (429, 500, 503, 529). Returns the raw success body.
async fn post_with_retry<B: serde::Serialize>(
    client: &reqwest::Client,
    url: &str,
    request_body: &B,
    max_retries: u32,
) -> Result<String, EngramError> {
    let mut last_error = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            warn!(attempt, "retrying request after transient error");
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        let response = client
            .post(url)
            .json(request_body)
            .send()
            .await
            .map_err(|e| EngramError::Provider {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, attempt, "response received");

        if status.is_success() {
            return response.text().await.map_err(|e| EngramError::Provider {
                message: format!("failed to read response body: {e}"),
                source: Some(Box::new(e)),
            });
        }

        let body = response.text().await.unwrap_or_default();
        if is_transient_error(status) && attempt < max_retries {
            warn!(status = %status, body = %body, "transient error, will retry");
            last_error = Some(EngramError::Provider {
                message: format!("API returned {status}: {body}"),
                source: None,
            });
            continue;
        }

        return Err(EngramError::Provider {
            message: decode_error_body(status, &body),
            source: None,
        });
    }

    Err(last_error.unwrap_or_else(|| EngramError::Provider {
        message: "request failed after retries".into(),
        source: None,
    }))
}

/// Chat-completion client for any OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiChatClient {
    /// Creates a new chat client.
    ///
    /// `base_url` is the API root (e.g. `https://api.openai.com/v1`); the
    /// `/chat/completions` path is appended per request.
    pub fn new(api_key: String, base_url: String) -> Result<Self, EngramError> {
        Ok(Self {
            client: build_http_client(&api_key)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sends a chat-completion request and returns the parsed response.
    pub async fn complete_chat(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, EngramError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = post_with_retry(&self.client, &url, request, 1).await?;
        serde_json::from_str(&body).map_err(|e| EngramError::Provider {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiChatClient {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, EngramError> {
        let api_request = ChatCompletionRequest {
            model: request.model,
            messages: request
                .messages
                .into_iter()
                .map(|m| ApiChatMessage {
                    role: m.role,
                    content: m.content,
                })
                .collect(),
            response_format: request.json_response.then(ResponseFormat::json_object),
            max_tokens: Some(request.max_tokens),
        };

        let response = self.complete_chat(&api_request).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| EngramError::Provider {
                message: "completion returned no choices".into(),
                source: None,
            })?;
        let usage = response.usage.unwrap_or_default();

        Ok(ProviderResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            },
        })
    }
}

/// Embeddings client for any OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingsClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: Option<usize>,
}

impl OpenAiEmbeddingsClient {
    /// Creates a new embeddings client.
    ///
    /// `dimensions` is forwarded to models that support output truncation;
    /// `None` uses the model's native dimension.
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        dimensions: Option<usize>,
    ) -> Result<Self, EngramError> {
        Ok(Self {
            client: build_http_client(&api_key)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            dimensions,
        })
    }

    /// Sends an embeddings request and returns the parsed response.
    pub async fn create_embeddings(
        &self,
        input: Vec<String>,
    ) -> Result<EmbeddingsResponse, EngramError> {
        let url = format!("{}/embeddings", self.base_url);
        let request = EmbeddingsRequest {
            model: self.model.clone(),
            input,
            dimensions: self.dimensions,
        };
        let body = post_with_retry(&self.client, &url, &request, 1).await?;
        serde_json::from_str(&body).map_err(|e| EngramError::Embedding {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

#[async_trait]
impl EmbeddingAdapter for OpenAiEmbeddingsClient {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, EngramError> {
        let expected = input.texts.len();
        let response = self.create_embeddings(input.texts).await?;

        if response.data.len() != expected {
            return Err(EngramError::Embedding {
                message: format!(
                    "embeddings endpoint returned {} vectors for {expected} inputs",
                    response.data.len()
                ),
                source: None,
            });
        }

        let embeddings: Vec<Vec<f32>> =
            response.data.into_iter().map(|d| d.embedding).collect();
        let dimensions = embeddings.first().map(|v| v.len()).unwrap_or_default();

        Ok(EmbeddingOutput {
            embeddings,
            dimensions,
            total_tokens: response.usage.map(|u| u.total_tokens).unwrap_or_default(),
        })
    }
}

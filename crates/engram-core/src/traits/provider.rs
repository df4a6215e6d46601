// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat-completion provider trait.

use async_trait::async_trait;

use crate::error::EngramError;
use crate::types::{ProviderRequest, ProviderResponse};

/// Adapter for chat-completion providers.
///
/// The engine uses a provider for fact extraction and for offline
/// consolidation decisions. Any OpenAI-compatible endpoint satisfies
/// this interface.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Sends a completion request and returns the full response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, EngramError>;
}

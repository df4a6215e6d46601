// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding provider trait.

use async_trait::async_trait;

use crate::error::EngramError;
use crate::types::{EmbeddingInput, EmbeddingOutput};

/// Adapter for generating dense vector embeddings from text.
///
/// Embeddings power the fact store's similarity search and the
/// consolidation candidate queues.
#[async_trait]
pub trait EmbeddingAdapter: Send + Sync {
    /// Generates embeddings for the given input, one vector per text.
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, EngramError>;
}

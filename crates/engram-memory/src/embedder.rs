// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caching wrapper around an embedding backend.
//!
//! The cache is lossless: any hit skips the remote call entirely, and misses
//! within one batch are sent upstream as a single request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use engram_core::types::EmbeddingInput;
use engram_core::{EmbeddingAdapter, EngramError};

use crate::types::EmbeddingUsageStats;

/// Text-to-vector embedder with an in-memory cache and usage counters.
pub struct CachingEmbedder {
    backend: Arc<dyn EmbeddingAdapter>,
    dimensions: usize,
    cache: Mutex<HashMap<String, Vec<f32>>>,
    calls: AtomicU64,
    tokens: AtomicU64,
}

impl CachingEmbedder {
    /// Wraps `backend`, enforcing `dimensions` on every returned vector.
    pub fn new(backend: Arc<dyn EmbeddingAdapter>, dimensions: usize) -> Self {
        Self {
            backend,
            dimensions,
            cache: Mutex::new(HashMap::new()),
            calls: AtomicU64::new(0),
            tokens: AtomicU64::new(0),
        }
    }

    /// The configured vector dimension.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embeds one text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EngramError> {
        let input = [text.to_string()];
        let mut vectors = self.embed_batch(&input).await?;
        vectors.pop().ok_or_else(|| EngramError::Embedding {
            message: "embedding backend returned no vector".into(),
            source: None,
        })
    }

    fn lock_cache(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<f32>>>, EngramError> {
        self.cache
            .lock()
            .map_err(|e| EngramError::Internal(format!("embedder cache lock poisoned: {e}")))
    }

    /// Embeds a batch of texts, returning vectors in input order.
    ///
    /// Cache misses are deduplicated and sent upstream in one call.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EngramError> {
        let mut misses: Vec<String> = Vec::new();
        {
            let cache = self.lock_cache()?;
            for text in texts {
                if !cache.contains_key(text) && !misses.contains(text) {
                    misses.push(text.clone());
                }
            }
        }

        if !misses.is_empty() {
            debug!(misses = misses.len(), total = texts.len(), "embedding cache misses");
            let output = self
                .backend
                .embed(EmbeddingInput {
                    texts: misses.clone(),
                })
                .await?;

            if output.embeddings.len() != misses.len() {
                return Err(EngramError::Embedding {
                    message: format!(
                        "backend returned {} vectors for {} texts",
                        output.embeddings.len(),
                        misses.len()
                    ),
                    source: None,
                });
            }

            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tokens.fetch_add(output.total_tokens, Ordering::SeqCst);

            let mut cache = self.lock_cache()?;
            for (text, vector) in misses.into_iter().zip(output.embeddings) {
                if vector.len() != self.dimensions {
                    return Err(EngramError::Config(format!(
                        "embedding dimension mismatch: backend returned {}, store expects {}",
                        vector.len(),
                        self.dimensions
                    )));
                }
                cache.insert(text, vector);
            }
        }

        let cache = self.lock_cache()?;
        Ok(texts
            .iter()
            .map(|t| cache.get(t).cloned().unwrap_or_default())
            .collect())
    }

    /// Accumulated upstream usage.
    pub fn usage(&self) -> EmbeddingUsageStats {
        EmbeddingUsageStats {
            calls: self.calls.load(Ordering::SeqCst),
            tokens: self.tokens.load(Ordering::SeqCst),
        }
    }

    /// Drops every cached vector. Counters are unaffected.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_test_utils::MockEmbedder;

    fn embedder(dim: usize) -> (Arc<MockEmbedder>, CachingEmbedder) {
        let backend = Arc::new(MockEmbedder::new(dim));
        let caching = CachingEmbedder::new(backend.clone(), dim);
        (backend, caching)
    }

    #[tokio::test]
    async fn second_call_hits_cache() {
        let (backend, caching) = embedder(8);

        let first = caching.embed("x").await.unwrap();
        assert_eq!(backend.call_count(), 1);

        let second = caching.embed("x").await.unwrap();
        assert_eq!(backend.call_count(), 1, "cache hit must skip upstream");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn batch_misses_are_one_upstream_call() {
        let (backend, caching) = embedder(8);

        caching
            .embed_batch(&["a".to_string(), "b".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn batch_mixes_hits_and_misses() {
        let (backend, caching) = embedder(8);

        caching.embed("a").await.unwrap();
        let out = caching
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        assert_eq!(backend.call_count(), 2, "only `b` goes upstream");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], caching.embed("a").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_texts_in_one_batch_embed_once() {
        let (_, caching) = embedder(4);
        let out = caching
            .embed_batch(&["same".to_string(), "same".to_string()])
            .await
            .unwrap();
        assert_eq!(out[0], out[1]);
    }

    #[tokio::test]
    async fn usage_counts_calls_and_tokens() {
        let (_, caching) = embedder(4);
        assert_eq!(caching.usage(), EmbeddingUsageStats::default());

        caching.embed("abcdefgh").await.unwrap();
        let usage = caching.usage();
        assert_eq!(usage.calls, 1);
        assert!(usage.tokens > 0);

        // Hit: counters unchanged.
        caching.embed("abcdefgh").await.unwrap();
        assert_eq!(caching.usage(), usage);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_fatal_config_error() {
        let backend = Arc::new(MockEmbedder::new(8));
        let caching = CachingEmbedder::new(backend, 16);

        let err = caching.embed("x").await.unwrap_err();
        assert!(matches!(err, EngramError::Config(_)), "got: {err}");
    }

    #[tokio::test]
    async fn clear_cache_forces_refetch() {
        let (backend, caching) = embedder(8);
        caching.embed("x").await.unwrap();
        caching.clear_cache();
        caching.embed("x").await.unwrap();
        assert_eq!(backend.call_count(), 2);
    }
}

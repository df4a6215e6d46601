// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock embedding provider for deterministic testing.
//!
//! Produces stable per-text vectors without network access and counts
//! upstream invocations so cache behavior can be asserted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use engram_core::types::{EmbeddingInput, EmbeddingOutput};
use engram_core::{EmbeddingAdapter, EngramError};

/// A mock embedder returning deterministic vectors.
///
/// By default each text maps to a stable hash-derived vector; individual
/// texts can be pinned to explicit vectors, or the whole embedder can be
/// fixed to return one vector for every input.
pub struct MockEmbedder {
    dimensions: usize,
    fixed: Option<Vec<f32>>,
    overrides: Arc<Mutex<HashMap<String, Vec<f32>>>>,
    calls: AtomicU64,
}

impl MockEmbedder {
    /// Create an embedder producing hash-derived vectors of `dimensions`.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            fixed: None,
            overrides: Arc::new(Mutex::new(HashMap::new())),
            calls: AtomicU64::new(0),
        }
    }

    /// Create an embedder that returns `vector` for every input.
    pub fn fixed(vector: Vec<f32>) -> Self {
        Self {
            dimensions: vector.len(),
            fixed: Some(vector),
            overrides: Arc::new(Mutex::new(HashMap::new())),
            calls: AtomicU64::new(0),
        }
    }

    /// Pin a specific text to a specific vector.
    pub fn set_vector(&self, text: impl Into<String>, vector: Vec<f32>) {
        self.overrides.lock().unwrap().insert(text.into(), vector);
    }

    /// Number of upstream `embed` invocations so far.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(v) = self.overrides.lock().unwrap().get(text) {
            return v.clone();
        }
        if let Some(v) = &self.fixed {
            return v.clone();
        }
        // Stable FNV-style hash expanded into a unit-scale vector.
        let mut state: u64 = 0xcbf2_9ce4_8422_2325;
        for b in text.bytes() {
            state ^= u64::from(b);
            state = state.wrapping_mul(0x0000_0100_0000_01b3);
        }
        (0..self.dimensions)
            .map(|i| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(i as u64);
                ((state >> 33) as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, EngramError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let embeddings: Vec<Vec<f32>> =
            input.texts.iter().map(|t| self.vector_for(t)).collect();
        let tokens: u64 = input
            .texts
            .iter()
            .map(|t| (t.len() as u64).div_ceil(4))
            .sum();

        Ok(EmbeddingOutput {
            embeddings,
            dimensions: self.dimensions,
            total_tokens: tokens,
        })
    }
}

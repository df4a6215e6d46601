// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query-time retrieval: embed, search, format.

use std::sync::Arc;

use tracing::debug;

use engram_core::EngramError;

use crate::embedder::CachingEmbedder;
use crate::store::{FactPatch, FactStore};
use crate::types::SearchFilters;

/// Vector-only retriever over the fact store.
pub struct Retriever {
    store: Arc<FactStore>,
    embedder: Arc<CachingEmbedder>,
}

impl Retriever {
    pub fn new(store: Arc<FactStore>, embedder: Arc<CachingEmbedder>) -> Self {
        Self { store, embedder }
    }

    /// Retrieves the top-k facts for `query`, one per line formatted as
    /// `"<timeStamp> <weekday> <memory>"`. An empty result is an empty
    /// string.
    ///
    /// Each returned record's hit counter is bumped by one.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        filters: &SearchFilters,
    ) -> Result<String, EngramError> {
        let query_vector = self.embedder.embed(query).await?;
        let hits = self.store.search(&query_vector, k, filters).await?;
        debug!(hits = hits.len(), k, "retrieval complete");

        let mut lines = Vec::with_capacity(hits.len());
        for hit in &hits {
            self.store
                .update(
                    &hit.id,
                    FactPatch {
                        hit_time: Some(hit.record.hit_time + 1),
                        ..Default::default()
                    },
                )
                .await?;
            lines.push(format!(
                "{} {} {}",
                hit.record.time_stamp, hit.record.weekday, hit.record.memory
            ));
        }

        Ok(lines.join("\n"))
    }
}

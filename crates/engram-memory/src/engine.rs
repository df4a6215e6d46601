// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The engine facade binding normalizer, buffer, extractor, embedder,
//! store, retriever, and consolidator.
//!
//! An engine is an explicit object owned by the caller; the store is the
//! only durable state, so several engines can coexist against distinct
//! store paths. Public operations serialize on the caller's side; the
//! engine offers no internal parallelism.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use engram_config::EngramConfig;
use engram_core::{EmbeddingAdapter, EngramError, ProviderAdapter};

use crate::buffer::ShortTermBuffer;
use crate::consolidator::{ConsolidationReport, Consolidator};
use crate::embedder::CachingEmbedder;
use crate::extractor::{ExtractedFact, Extractor, Segment};
use crate::normalizer::{float_timestamp, format_timestamp, weekday_code, MessageNormalizer};
use crate::retriever::Retriever;
use crate::store::FactStore;
use crate::types::{
    FactRecord, LlmUsageStats, NormalizedMessage, RawMessage, SearchFilters, TokenStatistics,
};

/// One extraction call's prompt and raw reply, returned for audit.
#[derive(Debug, Clone)]
pub struct ExtractionAudit {
    pub prompt: String,
    pub response: Option<String>,
}

/// What one `add_memory` call did.
#[derive(Debug, Clone, Default)]
pub struct AddMemoryReport {
    /// Facts created and persisted by this call.
    pub facts_created: usize,
    /// Whether an extraction ran (trigger fired or forced).
    pub extracted: bool,
    /// Prompt/response pairs of the extraction calls made.
    pub audits: Vec<ExtractionAudit>,
}

/// The memory-state engine.
pub struct MemoryEngine {
    config: EngramConfig,
    store: Arc<FactStore>,
    embedder: Arc<CachingEmbedder>,
    extractor: Extractor,
    retriever: Retriever,
    consolidator: Consolidator,
    normalizer: Mutex<MessageNormalizer>,
    buffer: Mutex<ShortTermBuffer>,
    add_usage: Mutex<LlmUsageStats>,
    update_usage: Mutex<LlmUsageStats>,
}

impl MemoryEngine {
    /// Binds the engine's components over the given collaborators.
    pub fn new(
        config: EngramConfig,
        provider: Arc<dyn ProviderAdapter>,
        embedding_backend: Arc<dyn EmbeddingAdapter>,
        store: Arc<FactStore>,
    ) -> Self {
        let embedder = Arc::new(CachingEmbedder::new(
            embedding_backend,
            config.embedder.dimensions,
        ));
        let extractor = Extractor::new(
            provider.clone(),
            config.llm.model.clone(),
            config.llm.max_tokens,
            config.memory.metadata_generate,
        );
        let retriever = Retriever::new(store.clone(), embedder.clone());
        let consolidator = Consolidator::new(
            store.clone(),
            provider,
            embedder.clone(),
            config.llm.model.clone(),
            config.llm.max_tokens,
            config.memory.recompute_embedding_on_update,
        );
        let normalizer = Mutex::new(MessageNormalizer::new(config.memory.time_step_ms));
        let buffer = Mutex::new(ShortTermBuffer::new(
            config.memory.flush_threshold_tokens,
            config.memory.flush_threshold_messages,
        ));

        Self {
            config,
            store,
            embedder,
            extractor,
            retriever,
            consolidator,
            normalizer,
            buffer,
            add_usage: Mutex::new(LlmUsageStats::default()),
            update_usage: Mutex::new(LlmUsageStats::default()),
        }
    }

    /// The underlying fact store.
    pub fn store(&self) -> &Arc<FactStore> {
        &self.store
    }

    /// Normalizes and buffers messages; runs extraction when the buffer
    /// trigger fires or `force_extract` is set.
    ///
    /// An invalid message rejects the whole batch before any state changes.
    pub async fn add_memory(
        &self,
        messages: Vec<RawMessage>,
        force_extract: bool,
    ) -> Result<AddMemoryReport, EngramError> {
        let ready = {
            let normalized = lock(&self.normalizer)?.normalize(&messages)?;
            lock(&self.buffer)?.push(normalized)
        };

        if !(ready || force_extract) {
            return Ok(AddMemoryReport::default());
        }

        let batch = lock(&self.buffer)?.flush();
        if batch.is_empty() {
            return Ok(AddMemoryReport {
                extracted: false,
                ..Default::default()
            });
        }

        debug!(messages = batch.len(), forced = force_extract, "extraction triggered");

        // Topic segmentation is a stub: the whole flushed batch is one segment.
        let segments = vec![Segment {
            messages: batch.clone(),
        }];
        let extractions = self
            .extractor
            .extract(&segments, self.config.memory.messages_use)
            .await;

        let mut audits = Vec::new();
        let mut facts: Vec<ExtractedFact> = Vec::new();
        {
            let mut usage = lock(&self.add_usage)?;
            for extraction in extractions {
                if let Some(call_usage) = extraction.usage {
                    usage.record(call_usage);
                }
                if !extraction.prompt.is_empty() {
                    audits.push(ExtractionAudit {
                        prompt: extraction.prompt,
                        response: extraction.response,
                    });
                }
                facts.extend(extraction.facts);
            }
        }

        if facts.is_empty() {
            return Ok(AddMemoryReport {
                facts_created: 0,
                extracted: true,
                audits,
            });
        }

        let texts: Vec<String> = facts.iter().map(|f| f.fact.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        for (fact, embedding) in facts.iter().zip(vectors) {
            let record = synthesize_record(fact, &batch, embedding);
            self.store.insert(&record).await?;
        }

        info!(facts = facts.len(), "facts persisted");
        Ok(AddMemoryReport {
            facts_created: facts.len(),
            extracted: true,
            audits,
        })
    }

    /// Semantic retrieval; see [`Retriever::retrieve`].
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        filters: Option<SearchFilters>,
    ) -> Result<String, EngramError> {
        self.retriever
            .retrieve(query, k, &filters.unwrap_or_default())
            .await
    }

    /// Consolidation phase 1; see [`Consolidator::construct_update_queues`].
    pub async fn construct_update_queue_all_entries(
        &self,
        top_k: usize,
        keep_top_n: usize,
    ) -> Result<usize, EngramError> {
        self.consolidator
            .construct_update_queues(top_k, keep_top_n)
            .await
    }

    /// Consolidation phase 2; see [`Consolidator::offline_update`].
    pub async fn offline_update_all_entries(
        &self,
        score_threshold: f32,
    ) -> Result<ConsolidationReport, EngramError> {
        let report = self.consolidator.offline_update(score_threshold).await?;
        {
            let mut usage = lock(&self.update_usage)?;
            usage.calls += report.usage.calls;
            usage.prompt_tokens += report.usage.prompt_tokens;
            usage.completion_tokens += report.usage.completion_tokens;
            usage.total_tokens += report.usage.total_tokens;
        }
        Ok(report)
    }

    /// Accumulated token counters across the engine's lifetime.
    pub fn token_statistics(&self) -> TokenStatistics {
        TokenStatistics {
            add_memory: self.add_usage.lock().map(|g| *g).unwrap_or_default(),
            update: self.update_usage.lock().map(|g| *g).unwrap_or_default(),
            embedding: self.embedder.usage(),
        }
    }
}

/// Locks an engine-internal mutex, surfacing poisoning as an internal error.
fn lock<T>(mutex: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, EngramError> {
    mutex
        .lock()
        .map_err(|e| EngramError::Internal(format!("engine lock poisoned: {e}")))
}

/// Builds a fact record from one extracted fact and the segment it came from.
///
/// The cited message supplies timestamps and speaker fields; a fact citing
/// no buffered message falls back to "now" and empty speaker fields.
fn synthesize_record(
    fact: &ExtractedFact,
    segment: &[NormalizedMessage],
    embedding: Vec<f32>,
) -> FactRecord {
    let cited = segment.iter().find(|m| m.source_id() == fact.source_id);

    let (time_stamp, float_time_stamp, weekday, speaker_id, speaker_name) = match cited {
        Some(msg) => (
            msg.time_stamp.clone(),
            msg.float_time_stamp,
            msg.weekday.clone(),
            msg.speaker_id.clone(),
            msg.speaker_name.clone(),
        ),
        None => {
            let now = Utc::now();
            (
                format_timestamp(now),
                float_timestamp(now),
                weekday_code(now),
                String::new(),
                String::new(),
            )
        }
    };

    FactRecord {
        id: Uuid::new_v4().to_string(),
        time_stamp,
        float_time_stamp,
        weekday,
        memory: fact.fact.clone(),
        original_memory: fact.fact.clone(),
        compressed_memory: None,
        category: fact.category.clone(),
        subcategory: fact.subcategory.clone(),
        memory_class: None,
        topic_id: None,
        topic_summary: None,
        speaker_id,
        speaker_name,
        hit_time: 0,
        update_queue: Vec::new(),
        embedding,
    }
}

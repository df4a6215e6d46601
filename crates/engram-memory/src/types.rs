// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types for the memory-state engine.

use serde::{Deserialize, Serialize};

use engram_core::types::TokenUsage;

/// A raw dialog turn as delivered by the host.
///
/// `time_stamp` is the session marker, conventionally
/// `"YYYY/MM/DD (Ddd) HH:MM"`; other ISO-ish forms are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    /// Role: "user" or "assistant".
    pub role: String,
    /// Turn text.
    pub content: String,
    /// Session marker.
    #[serde(rename = "timeStamp", default)]
    pub time_stamp: Option<String>,
    /// Optional stable speaker identifier.
    #[serde(default)]
    pub speaker_id: Option<String>,
    /// Optional display name; defaults to the role when absent.
    #[serde(default)]
    pub speaker_name: Option<String>,
}

/// A dialog turn after normalization: parsed instant, bumped for strict
/// ordering, with weekday and sequence number attached.
#[derive(Debug, Clone)]
pub struct NormalizedMessage {
    pub role: String,
    pub content: String,
    /// The original session marker, kept for debugging.
    pub session_time: String,
    /// Bumped instant as an ISO-8601 string.
    pub time_stamp: String,
    /// Same instant as seconds since epoch.
    pub float_time_stamp: f64,
    /// Three-letter day code derived from the instant.
    pub weekday: String,
    pub speaker_id: String,
    pub speaker_name: String,
    /// Position in delivery order across the normalizer's lifetime.
    pub sequence_number: usize,
}

impl NormalizedMessage {
    /// The integer the extraction prompt uses to cite this message.
    pub fn source_id(&self) -> i64 {
        (self.sequence_number / 2) as i64
    }
}

/// One entry of a record's consolidation candidate queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Candidate record id.
    pub id: String,
    /// Cosine similarity at queue-construction time.
    pub score: f32,
}

/// The single persistent entity: one atomic assertion with its vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactRecord {
    /// Opaque unique identifier, assigned at creation.
    pub id: String,
    /// ISO-8601 instant derived from the source message.
    pub time_stamp: String,
    /// Same instant as seconds since epoch, used for range filters.
    pub float_time_stamp: f64,
    /// Three-letter day code.
    pub weekday: String,
    /// The current canonical fact text.
    pub memory: String,
    /// The extraction output; write-once.
    pub original_memory: String,
    /// Reserved summary slot, populated only when text summaries are enabled.
    pub compressed_memory: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub memory_class: Option<String>,
    /// Reserved for topic segmentation.
    pub topic_id: Option<i64>,
    pub topic_summary: Option<String>,
    pub speaker_id: String,
    pub speaker_name: String,
    /// Retrieval counter; monotonically non-decreasing.
    pub hit_time: i64,
    /// Consolidation candidates, populated by phase 1.
    pub update_queue: Vec<QueueEntry>,
    /// Dense vector; length equals the store's configured dimension.
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

/// Inclusive numeric range filter.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RangeFilter {
    pub gte: Option<f64>,
    pub lte: Option<f64>,
}

/// Metadata filters for similarity search. All predicates are AND-combined.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Inclusive range on the numeric timestamp.
    pub float_time_stamp: Option<RangeFilter>,
    /// Speaker equality.
    pub speaker_id: Option<String>,
    /// Category equality.
    pub category: Option<String>,
}

/// One similarity-search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    /// Cosine similarity to the query vector.
    pub score: f32,
    pub record: FactRecord,
}

/// Accumulated chat-completion usage for one engine operation family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmUsageStats {
    pub calls: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl LlmUsageStats {
    /// Fold one call's usage into the totals.
    pub fn record(&mut self, usage: TokenUsage) {
        self.calls += 1;
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
        self.total_tokens += usage.total_tokens;
    }
}

/// Accumulated embedding usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingUsageStats {
    pub calls: u64,
    pub tokens: u64,
}

/// The engine's token counters, one bucket per operation family.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenStatistics {
    pub add_memory: LlmUsageStats,
    pub update: LlmUsageStats,
    pub embedding: EmbeddingUsageStats,
}

/// Convert an f32 vector to little-endian bytes for BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert a stored BLOB back to an f32 vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap()))
        .collect()
}

/// Cosine similarity `(a·b)/(‖a‖·‖b‖)`.
///
/// Vectors are not assumed normalized; returns 0.0 when either norm is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|y| y * y).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline two-phase consolidation.
//!
//! Phase 1 builds per-record candidate queues against an unchanged snapshot
//! so scores stay comparable across records. Phase 2 walks the snapshot
//! again and lets the LLM decide, per target, whether accumulated older
//! evidence should update it, delete it, or leave it alone.
//!
//! Both phases are safely resumable: phase 1 overwrites queues wholesale,
//! phase 2 is idempotent modulo LLM non-determinism.

use std::sync::Arc;

use tracing::{debug, info, warn};

use engram_core::types::{ChatMessage, ProviderRequest};
use engram_core::{EngramError, ProviderAdapter};

use crate::embedder::CachingEmbedder;
use crate::prompts::UPDATE_SYSTEM_PROMPT;
use crate::store::{FactPatch, FactStore};
use crate::types::{FactRecord, LlmUsageStats, QueueEntry, RangeFilter, SearchFilters};

/// Default number of candidates fetched per record in phase 1.
pub const DEFAULT_TOP_K: usize = 20;
/// Default queue length kept per record after self-exclusion.
pub const DEFAULT_KEEP_TOP_N: usize = 10;
/// Default minimum similarity for a queue entry to trigger a phase-2 decision.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.9;

/// What the LLM decided for one target.
#[derive(Debug, Clone, PartialEq)]
enum Decision {
    Update(String),
    Delete,
    Ignore,
}

/// Aggregate result of one phase-2 run.
#[derive(Debug, Clone, Default)]
pub struct ConsolidationReport {
    pub targets_visited: usize,
    pub updated: usize,
    pub deleted: usize,
    pub ignored: usize,
    /// Targets whose provider call or reply parsing failed; they were
    /// skipped and the run continued.
    pub failures: usize,
    pub usage: LlmUsageStats,
}

/// The offline consolidation procedure over a fact store.
pub struct Consolidator {
    store: Arc<FactStore>,
    provider: Arc<dyn ProviderAdapter>,
    embedder: Arc<CachingEmbedder>,
    model: String,
    max_tokens: u32,
    recompute_embedding: bool,
}

impl Consolidator {
    pub fn new(
        store: Arc<FactStore>,
        provider: Arc<dyn ProviderAdapter>,
        embedder: Arc<CachingEmbedder>,
        model: String,
        max_tokens: u32,
        recompute_embedding: bool,
    ) -> Self {
        Self {
            store,
            provider,
            embedder,
            model,
            max_tokens,
            recompute_embedding,
        }
    }

    /// Phase 1: builds every record's `updateQueue`.
    ///
    /// Candidates are restricted to facts whose instant is not later than
    /// the holder's, so older evidence informs newer records. Self-matches
    /// are dropped; the first `keep_top_n` survivors are kept in descending
    /// score order. Returns the number of records processed.
    pub async fn construct_update_queues(
        &self,
        top_k: usize,
        keep_top_n: usize,
    ) -> Result<usize, EngramError> {
        let records = self.store.get_all(true).await?;
        info!(records = records.len(), top_k, keep_top_n, "consolidation phase 1 start");

        for record in &records {
            let filters = SearchFilters {
                float_time_stamp: Some(RangeFilter {
                    gte: None,
                    lte: Some(record.float_time_stamp),
                }),
                ..Default::default()
            };
            let hits = self.store.search(&record.embedding, top_k, &filters).await?;

            let queue: Vec<QueueEntry> = hits
                .into_iter()
                .filter(|hit| hit.id != record.id)
                .take(keep_top_n)
                .map(|hit| QueueEntry {
                    id: hit.id,
                    score: hit.score,
                })
                .collect();

            debug!(id = %record.id, candidates = queue.len(), "queue constructed");
            self.store
                .update(
                    &record.id,
                    FactPatch {
                        update_queue: Some(queue),
                        ..Default::default()
                    },
                )
                .await?;
        }

        Ok(records.len())
    }

    /// Phase 2: decides update/delete/ignore per target.
    ///
    /// Each record is visited once as the target; its evidence sources are
    /// its own queue entries at or above `score_threshold`, resolved against
    /// the phase-2 snapshot in queue order. Entries pointing at ids missing
    /// from the snapshot are tolerated as no-ops. Targets without sources
    /// are skipped. A per-target failure is logged and the next target
    /// proceeds.
    pub async fn offline_update(
        &self,
        score_threshold: f32,
    ) -> Result<ConsolidationReport, EngramError> {
        let records = self.store.get_all(false).await?;
        info!(
            records = records.len(),
            score_threshold = f64::from(score_threshold),
            "consolidation phase 2 start"
        );

        let by_id: std::collections::HashMap<&str, &FactRecord> =
            records.iter().map(|r| (r.id.as_str(), r)).collect();
        let mut report = ConsolidationReport::default();

        for target in &records {
            let sources: Vec<&FactRecord> = target
                .update_queue
                .iter()
                .filter(|entry| entry.score >= score_threshold)
                .filter_map(|entry| by_id.get(entry.id.as_str()).copied())
                .collect();

            if sources.is_empty() {
                continue;
            }
            report.targets_visited += 1;

            let prompt = render_decision_prompt(target, &sources);
            let request = ProviderRequest {
                model: self.model.clone(),
                messages: vec![
                    ChatMessage::system(UPDATE_SYSTEM_PROMPT),
                    ChatMessage::user(prompt),
                ],
                max_tokens: self.max_tokens,
                json_response: true,
            };

            let decision = match self.provider.complete(request).await {
                Ok(response) => {
                    report.usage.record(response.usage);
                    parse_decision(&response.content)
                }
                Err(e) => {
                    warn!(target = %target.id, error = %e, "decision call failed, skipping target");
                    report.failures += 1;
                    continue;
                }
            };

            match decision {
                Decision::Ignore => {
                    report.ignored += 1;
                }
                Decision::Delete => {
                    debug!(target = %target.id, "consolidation delete");
                    self.store.delete(&target.id).await?;
                    report.deleted += 1;
                }
                Decision::Update(new_memory) => {
                    debug!(target = %target.id, "consolidation update");
                    let embedding = if self.recompute_embedding {
                        Some(self.embedder.embed(&new_memory).await?)
                    } else {
                        None
                    };
                    self.store
                        .update(
                            &target.id,
                            FactPatch {
                                memory: Some(new_memory),
                                embedding,
                                ..Default::default()
                            },
                        )
                        .await?;
                    report.updated += 1;
                }
            }
        }

        info!(
            visited = report.targets_visited,
            updated = report.updated,
            deleted = report.deleted,
            ignored = report.ignored,
            failures = report.failures,
            "consolidation phase 2 complete"
        );
        Ok(report)
    }
}

/// Renders the phase-2 user message: the target plus a bulleted source list.
fn render_decision_prompt(target: &FactRecord, sources: &[&FactRecord]) -> String {
    let mut out = format!("Target memory:\n{}\n\nOlder related memories:\n", target.memory);
    for source in sources {
        out.push_str(&format!("- {}\n", source.memory));
    }
    out
}

/// Parses the decision reply. Unknown or missing action, or an `update`
/// without usable text, degrades to ignore; state is never mutated on a
/// malformed reply.
fn parse_decision(reply: &str) -> Decision {
    let trimmed = reply.trim();
    let payload = if trimmed.starts_with("```") {
        let start = trimmed.find('{').unwrap_or(0);
        let end = trimmed.rfind('}').map(|i| i + 1).unwrap_or(trimmed.len());
        &trimmed[start..end.max(start)]
    } else {
        trimmed
    };

    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "unparseable decision reply, treating as ignore");
            return Decision::Ignore;
        }
    };

    match value.get("action").and_then(|a| a.as_str()) {
        Some("delete") => Decision::Delete,
        Some("update") => match value.get("new_memory").and_then(|m| m.as_str()) {
            Some(text) if !text.trim().is_empty() => Decision::Update(text.to_string()),
            _ => {
                warn!("update decision without new_memory, treating as ignore");
                Decision::Ignore
            }
        },
        Some("ignore") => Decision::Ignore,
        other => {
            if other.is_some() {
                warn!(action = ?other, "unknown decision action, treating as ignore");
            }
            Decision::Ignore
        }
    }
}

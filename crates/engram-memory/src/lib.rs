// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory-state engine for conversational agents.
//!
//! Ingests streams of dialog turns, distills them into discrete factual
//! assertions via an LLM, stores facts with dense vector embeddings and
//! timestamp metadata in SQLite, answers semantic queries by cosine
//! nearest-neighbor search, and consolidates the store offline in a
//! deferred two-phase procedure.
//!
//! ## Architecture
//!
//! - **MessageNormalizer**: session-marker parsing and strict total ordering
//! - **ShortTermBuffer**: token-budgeted FIFO gating extraction
//! - **Extractor**: LLM fact extraction with tolerant JSON parsing
//! - **CachingEmbedder**: lossless text-to-vector cache over any backend
//! - **FactStore**: SQLite persistence with BLOB vectors and filtered search
//! - **Retriever**: embed, search, format
//! - **Consolidator**: two-phase offline queue construction and decisions
//! - **MemoryEngine**: the facade binding all of the above

pub mod buffer;
pub mod consolidator;
pub mod embedder;
pub mod engine;
pub mod extractor;
pub mod normalizer;
pub mod prompts;
pub mod retriever;
pub mod store;
pub mod types;

pub use consolidator::{ConsolidationReport, Consolidator};
pub use embedder::CachingEmbedder;
pub use engine::{AddMemoryReport, ExtractionAudit, MemoryEngine};
pub use extractor::{ExtractedFact, Extractor, Segment};
pub use normalizer::MessageNormalizer;
pub use retriever::Retriever;
pub use store::{FactPatch, FactStore};
pub use types::*;

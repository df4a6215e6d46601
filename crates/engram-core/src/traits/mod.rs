// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability trait definitions for the engine's external collaborators.
//!
//! One trait per collaborator, with `#[async_trait]` for dynamic dispatch.

pub mod embedding;
pub mod provider;

pub use embedding::EmbeddingAdapter;
pub use provider::ProviderAdapter;

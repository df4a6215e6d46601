// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-based fact extraction from buffered dialog segments.
//!
//! Renders each segment as a cited transcript, asks the provider for a JSON
//! reply, and parses it tolerantly. A failing segment yields zero facts and
//! does not disturb the others.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use engram_config::MessagesUse;
use engram_core::types::{ChatMessage, ProviderRequest, TokenUsage};
use engram_core::ProviderAdapter;

use crate::prompts::{EXTRACTION_METADATA_SUPPLEMENT, EXTRACTION_SYSTEM_PROMPT};
use crate::types::NormalizedMessage;

/// An ordered list of normalized messages handed to the extractor as one
/// unit. Topic segmentation is a stub: one flush produces one segment.
#[derive(Debug, Clone)]
pub struct Segment {
    pub messages: Vec<NormalizedMessage>,
}

/// One assertion extracted by the LLM, citing its source line.
///
/// The tag fields are only requested when metadata generation is enabled,
/// and replies may omit them either way.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractedFact {
    pub source_id: i64,
    pub fact: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
}

/// The outcome of extracting one segment.
#[derive(Debug, Clone)]
pub struct SegmentExtraction {
    pub facts: Vec<ExtractedFact>,
    /// Usage of the extraction call, absent when no call was made.
    pub usage: Option<TokenUsage>,
    /// The rendered user prompt, kept for audit.
    pub prompt: String,
    /// The raw provider reply, kept for audit.
    pub response: Option<String>,
    /// True when the provider call or reply parsing failed.
    pub failed: bool,
}

/// Extracts facts from segments via a chat-completion provider.
pub struct Extractor {
    provider: Arc<dyn ProviderAdapter>,
    model: String,
    max_tokens: u32,
    metadata_generate: bool,
}

impl Extractor {
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        model: String,
        max_tokens: u32,
        metadata_generate: bool,
    ) -> Self {
        Self {
            provider,
            model,
            max_tokens,
            metadata_generate,
        }
    }

    fn system_prompt(&self) -> String {
        if self.metadata_generate {
            format!("{EXTRACTION_SYSTEM_PROMPT}\n\n{EXTRACTION_METADATA_SUPPLEMENT}")
        } else {
            EXTRACTION_SYSTEM_PROMPT.to_string()
        }
    }

    /// Extracts facts from each segment independently.
    ///
    /// Messages whose role is outside `policy` are dropped before rendering.
    /// Network, parse, and schema errors mark the segment failed with zero
    /// facts; remaining segments proceed.
    pub async fn extract(
        &self,
        segments: &[Segment],
        policy: MessagesUse,
    ) -> Vec<SegmentExtraction> {
        let mut results = Vec::with_capacity(segments.len());

        for (k, segment) in segments.iter().enumerate() {
            let kept: Vec<&NormalizedMessage> = segment
                .messages
                .iter()
                .filter(|m| role_matches(policy, &m.role))
                .collect();

            if kept.is_empty() {
                results.push(SegmentExtraction {
                    facts: Vec::new(),
                    usage: None,
                    prompt: String::new(),
                    response: None,
                    failed: false,
                });
                continue;
            }

            let prompt = format!("--- Topic {k} ---\n{}", render_transcript(&kept));
            let request = ProviderRequest {
                model: self.model.clone(),
                messages: vec![
                    ChatMessage::system(self.system_prompt()),
                    ChatMessage::user(prompt.clone()),
                ],
                max_tokens: self.max_tokens,
                json_response: true,
            };

            match self.provider.complete(request).await {
                Ok(response) => match parse_extraction_reply(&response.content) {
                    Ok(facts) => {
                        debug!(segment = k, facts = facts.len(), "segment extracted");
                        results.push(SegmentExtraction {
                            facts,
                            usage: Some(response.usage),
                            prompt,
                            response: Some(response.content),
                            failed: false,
                        });
                    }
                    Err(e) => {
                        warn!(segment = k, error = %e, "failed to parse extraction reply");
                        results.push(SegmentExtraction {
                            facts: Vec::new(),
                            usage: Some(response.usage),
                            prompt,
                            response: Some(response.content),
                            failed: true,
                        });
                    }
                },
                Err(e) => {
                    warn!(segment = k, error = %e, "extraction call failed");
                    results.push(SegmentExtraction {
                        facts: Vec::new(),
                        usage: None,
                        prompt,
                        response: None,
                        failed: true,
                    });
                }
            }
        }

        results
    }
}

/// Whether a role participates in extraction under the given policy.
pub fn role_matches(policy: MessagesUse, role: &str) -> bool {
    match policy {
        MessagesUse::UserOnly => role == "user",
        MessagesUse::AssistantOnly => role == "assistant",
        MessagesUse::Hybrid => role == "user" || role == "assistant",
    }
}

/// Renders kept messages one line each:
/// `[<timeStamp>, <weekday>] <source_id>.<speaker>: <content>`.
fn render_transcript(messages: &[&NormalizedMessage]) -> String {
    let mut out = String::new();
    for msg in messages {
        out.push_str(&format!(
            "[{}, {}] {}.{}: {}\n",
            msg.time_stamp,
            msg.weekday,
            msg.source_id(),
            msg.speaker_name,
            msg.content
        ));
    }
    out
}

/// Parses the LLM extraction reply into structured facts.
///
/// Accepts the object form `{"data": [...]}` or a bare array, strips a
/// surrounding markdown code fence, and ignores extra keys on items.
/// Required-field type mismatches fail the whole reply.
pub fn parse_extraction_reply(reply: &str) -> Result<Vec<ExtractedFact>, serde_json::Error> {
    let payload = strip_code_fence(reply);
    let value: serde_json::Value = serde_json::from_str(payload)?;

    let items = match value {
        serde_json::Value::Object(mut obj) => obj
            .remove("data")
            .unwrap_or(serde_json::Value::Array(Vec::new())),
        other => other,
    };

    serde_json::from_value(items)
}

/// Strips a surrounding markdown code fence, returning the JSON payload.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let start = trimmed
        .find(['{', '['])
        .unwrap_or(0);
    let end = trimmed
        .rfind(['}', ']'])
        .map(|i| i + 1)
        .unwrap_or(trimmed.len());
    &trimmed[start..end.max(start)]
}

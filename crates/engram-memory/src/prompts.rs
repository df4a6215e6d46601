// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed prompts for fact extraction and consolidation decisions.

/// System prompt for fact extraction.
///
/// Contract: the reply is a JSON object of the form
/// `{"data":[{"source_id":<int>,"fact":<string>}, ...]}`, one entry per
/// atomic fact, citing the integer prefix of the transcript line the fact
/// came from.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You extract long-term memory from dialog transcripts.

Each transcript line is formatted as:
[<timestamp>, <weekday>] <source_id>.<speaker>: <text>

Produce a JSON object of this exact shape:
{"data": [{"source_id": <int>, "fact": "<string>"}, ...]}

Rules:
- One entry per atomic fact. Split compound statements.
- "source_id" is the integer prefix of the line the fact came from.
- State each fact as a standalone assertion about the speaker (light rephrasing only; never infer beyond what is said).
- Skip greetings, chit-chat, and anything with no lasting value.
- If nothing is worth remembering, return {"data": []}.

Respond with JSON only."#;

/// Appended to the extraction prompt when metadata generation is enabled.
///
/// Extends each entry with classification tags; both stay optional so a
/// reply that omits them still parses.
pub const EXTRACTION_METADATA_SUPPLEMENT: &str = r#"Additionally tag each entry:
- "category": one of personal, preference, project, decision, instruction, outcome.
- "subcategory": a short free-form refinement of the category, or omit it."#;

/// System prompt for the offline update decision.
///
/// Contract: the reply is a JSON object `{"action": "update"|"delete"|"ignore",
/// "new_memory": "<string>"}` where `new_memory` is required for `update`.
pub const UPDATE_SYSTEM_PROMPT: &str = r#"You maintain a long-term memory store. You are given a target memory and a list of older memories that are semantically close to it.

Decide what should happen to the target:
- "update" when the older memories show the target should be corrected or merged into a more complete statement. Provide the rewritten text in "new_memory".
- "delete" when the target is fully redundant with the older memories and adds nothing.
- "ignore" when the target should stay as it is.

Produce a JSON object of this exact shape:
{"action": "update" | "delete" | "ignore", "new_memory": "<string, only for update>"}

Respond with JSON only."#;

// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-term buffer holding normalized messages until extraction triggers.

use crate::types::NormalizedMessage;

/// Rough token count for budgeting: one token per four characters.
pub fn approx_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Bounded FIFO of normalized messages with a token budget.
///
/// Single-producer, single-consumer; the engine serializes access.
pub struct ShortTermBuffer {
    messages: Vec<NormalizedMessage>,
    tokens: usize,
    token_threshold: usize,
    message_threshold: usize,
}

impl ShortTermBuffer {
    /// Creates a buffer that reports ready at `token_threshold` cumulative
    /// tokens or `message_threshold` buffered messages, whichever first.
    pub fn new(token_threshold: usize, message_threshold: usize) -> Self {
        Self {
            messages: Vec::new(),
            tokens: 0,
            token_threshold,
            message_threshold,
        }
    }

    /// Appends messages and returns whether an extraction trigger fired.
    pub fn push(&mut self, messages: Vec<NormalizedMessage>) -> bool {
        for msg in messages {
            self.tokens += approx_tokens(&msg.content);
            self.messages.push(msg);
        }
        self.is_ready()
    }

    /// Whether the buffer has reached either trigger.
    pub fn is_ready(&self) -> bool {
        self.tokens >= self.token_threshold || self.messages.len() >= self.message_threshold
    }

    /// Empties the buffer and returns its contents in arrival order.
    pub fn flush(&mut self) -> Vec<NormalizedMessage> {
        self.tokens = 0;
        std::mem::take(&mut self.messages)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(content: &str, seq: usize) -> NormalizedMessage {
        NormalizedMessage {
            role: "user".into(),
            content: content.into(),
            session_time: "2024/01/15 (Mon) 10:00".into(),
            time_stamp: "2024-01-15T10:00:00.000Z".into(),
            float_time_stamp: 1705312800.0,
            weekday: "Mon".into(),
            speaker_id: String::new(),
            speaker_name: "user".into(),
            sequence_number: seq,
        }
    }

    #[test]
    fn approx_tokens_rounds_up() {
        assert_eq!(approx_tokens(""), 0);
        assert_eq!(approx_tokens("abc"), 1);
        assert_eq!(approx_tokens("abcd"), 1);
        assert_eq!(approx_tokens("abcde"), 2);
    }

    #[test]
    fn not_ready_below_both_thresholds() {
        let mut buffer = ShortTermBuffer::new(100, 10);
        assert!(!buffer.push(vec![msg("short", 0)]));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn ready_at_token_threshold() {
        let mut buffer = ShortTermBuffer::new(10, 100);
        let long = "x".repeat(40);
        assert!(buffer.push(vec![msg(&long, 0)]));
    }

    #[test]
    fn ready_at_message_threshold() {
        let mut buffer = ShortTermBuffer::new(1_000_000, 3);
        assert!(!buffer.push(vec![msg("a", 0), msg("b", 1)]));
        assert!(buffer.push(vec![msg("c", 2)]));
    }

    #[test]
    fn flush_drains_in_arrival_order() {
        let mut buffer = ShortTermBuffer::new(100, 10);
        buffer.push(vec![msg("first", 0), msg("second", 1)]);
        let drained = buffer.flush();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].content, "first");
        assert_eq!(drained[1].content, "second");
        assert!(buffer.is_empty());
        assert!(!buffer.is_ready());
    }

    #[test]
    fn flush_resets_token_budget() {
        let mut buffer = ShortTermBuffer::new(10, 100);
        buffer.push(vec![msg(&"x".repeat(40), 0)]);
        buffer.flush();
        assert!(!buffer.push(vec![msg("tiny", 1)]));
    }
}

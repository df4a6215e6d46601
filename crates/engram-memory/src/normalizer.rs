// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message normalization: session-marker parsing and strict total ordering.
//!
//! Upstream messages of one session share a textual marker such as
//! `"2024/01/15 (Mon) 10:00"`. The normalizer parses the marker, then bumps
//! each subsequent message sharing it by a fixed offset so every message
//! carries a distinct, strictly increasing instant.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use engram_core::EngramError;

use crate::types::{NormalizedMessage, RawMessage};

/// Formats an instant the way the store persists it.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Seconds-since-epoch form of an instant.
pub fn float_timestamp(instant: DateTime<Utc>) -> f64 {
    instant.timestamp_millis() as f64 / 1000.0
}

/// Three-letter day code for an instant.
pub fn weekday_code(instant: DateTime<Utc>) -> String {
    instant.format("%a").to_string()
}

/// Stateful normalizer. One instance serves one engine; sequence numbers
/// and per-marker cursors persist across `normalize` calls.
pub struct MessageNormalizer {
    cursors: HashMap<String, DateTime<Utc>>,
    time_step: Duration,
    next_sequence: usize,
}

impl MessageNormalizer {
    /// Creates a normalizer with the given same-marker bump offset.
    pub fn new(time_step_ms: i64) -> Self {
        Self {
            cursors: HashMap::new(),
            time_step: Duration::milliseconds(time_step_ms),
            next_sequence: 0,
        }
    }

    /// Normalizes a batch of messages in delivery order.
    ///
    /// The whole batch is validated before any cursor or sequence state
    /// mutates: a missing or unparseable marker rejects every message.
    pub fn normalize(
        &mut self,
        messages: &[RawMessage],
    ) -> Result<Vec<NormalizedMessage>, EngramError> {
        // Validation pass: parse every marker before touching state.
        let mut parsed = Vec::with_capacity(messages.len());
        for (i, msg) in messages.iter().enumerate() {
            let marker = msg.time_stamp.as_deref().ok_or_else(|| {
                EngramError::InvalidMessage(format!("message {i} is missing timeStamp"))
            })?;
            let instant = parse_session_marker(marker).ok_or_else(|| {
                EngramError::InvalidMessage(format!(
                    "message {i} has unparseable timeStamp `{marker}`"
                ))
            })?;
            parsed.push((marker.to_string(), instant));
        }

        // Assignment pass: bump cursors and attach sequence numbers.
        let mut normalized = Vec::with_capacity(messages.len());
        for (msg, (marker, instant)) in messages.iter().zip(parsed) {
            let assigned = match self.cursors.get(&marker) {
                Some(prev) => *prev + self.time_step,
                None => instant,
            };
            self.cursors.insert(marker.clone(), assigned);

            let sequence_number = self.next_sequence;
            self.next_sequence += 1;

            normalized.push(NormalizedMessage {
                role: msg.role.clone(),
                content: msg.content.clone(),
                session_time: marker,
                time_stamp: format_timestamp(assigned),
                float_time_stamp: float_timestamp(assigned),
                weekday: weekday_code(assigned),
                speaker_id: msg.speaker_id.clone().unwrap_or_default(),
                speaker_name: msg
                    .speaker_name
                    .clone()
                    .unwrap_or_else(|| msg.role.clone()),
                sequence_number,
            });
        }

        Ok(normalized)
    }
}

/// Parses a session marker into an instant.
///
/// Accepted grammar: `YYYY[/-]MM[/-]DD` whitespace `(<weekday token>)`
/// whitespace `HH:MM[:SS]`. Markers that do not match fall through to a
/// permissive ISO parse. Naive datetimes are interpreted as UTC.
pub fn parse_session_marker(marker: &str) -> Option<DateTime<Utc>> {
    let marker = marker.trim();
    if marker.is_empty() {
        return None;
    }

    if let Some(naive) = parse_structured_marker(marker) {
        return Some(naive.and_utc());
    }
    parse_permissive_iso(marker)
}

fn parse_structured_marker(marker: &str) -> Option<NaiveDateTime> {
    let open = marker.find('(')?;
    let close = marker[open..].find(')')? + open;

    let date_part = marker[..open].trim();
    let time_part = marker[close + 1..].trim();
    if date_part.is_empty() || time_part.is_empty() {
        return None;
    }

    let date = parse_date(date_part)?;
    let time = parse_time(time_part)?;
    Some(date.and_time(time))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y/%m/%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

fn parse_permissive_iso(marker: &str) -> Option<DateTime<Utc>> {
    if let Ok(fixed) = DateTime::parse_from_rfc3339(marker) {
        return Some(fixed.with_timezone(&Utc));
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(marker, fmt) {
            return Some(naive.and_utc());
        }
    }

    // Date-only markers resolve to midnight.
    parse_date(marker).map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

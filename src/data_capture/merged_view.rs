//! Read-only, string-like view over one or more recorded channels.
//!
//! Nothing is cached: every query merges the channels' records again, so a
//! view can be consulted any number of times once its session has stopped.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use uuid::Uuid;

use crate::error_handling::types::CaptureError;

use super::recorded_sink::RecordedSink;
use super::types::{Channel, Record, Transcript, TranscriptEntry};

#[derive(Clone)]
pub struct MergedView {
    session_id: Uuid,
    /// Sorted by channel priority.
    sinks: Vec<Arc<RecordedSink>>,
}

impl MergedView {
    pub fn new(session_id: Uuid, mut sinks: Vec<Arc<RecordedSink>>) -> Self {
        sinks.sort_by_key(|s| s.channel());
        Self { session_id, sinks }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.sinks.iter().map(|s| s.channel()).collect()
    }

    /// A view restricted to one channel (empty if it was not captured).
    pub fn channel(&self, channel: Channel) -> MergedView {
        Self {
            session_id: self.session_id,
            sinks: self
                .sinks
                .iter()
                .filter(|s| s.channel() == channel)
                .cloned()
                .collect(),
        }
    }

    /// Every record across the channels, oldest first.
    ///
    /// Pointer merge over the per-channel sorted records; on equal
    /// timestamps the higher-priority channel wins.
    pub fn entries(&self) -> Vec<TranscriptEntry> {
        let lists: Vec<(Channel, Vec<Record>)> = self
            .sinks
            .iter()
            .map(|s| (s.channel(), s.records()))
            .collect();
        let mut cursors = vec![0usize; lists.len()];
        let total = lists.iter().map(|(_, r)| r.len()).sum();
        let mut merged = Vec::with_capacity(total);

        loop {
            let mut next: Option<(usize, u64)> = None;
            for (i, (_, records)) in lists.iter().enumerate() {
                if let Some(record) = records.get(cursors[i]) {
                    if next.map_or(true, |(_, ts)| record.timestamp < ts) {
                        next = Some((i, record.timestamp));
                    }
                }
            }
            let Some((i, _)) = next else { break };
            let (channel, records) = &lists[i];
            let record = &records[cursors[i]];
            merged.push(TranscriptEntry {
                timestamp: record.timestamp,
                channel: *channel,
                text: record.text.clone(),
            });
            cursors[i] += 1;
        }
        merged
    }

    pub fn fragments(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.text).collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.to_string().contains(needle)
    }

    pub fn equals(&self, other: &str) -> bool {
        self.to_string() == other
    }

    /// Length in bytes of the merged text.
    pub fn len(&self) -> usize {
        self.sinks
            .iter()
            .map(|s| s.total_bytes() as usize)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Splits the merged text into lines.
    ///
    /// `\n`, `\r\n` and a lone `\r` end a line, as do the vertical tab,
    /// form feed, the file/group/record separators, NEL and the Unicode line
    /// and paragraph separators. With `keep_ends` each line keeps its
    /// terminator. A trailing terminator does not start an empty last line.
    pub fn split_lines(&self, keep_ends: bool) -> Vec<String> {
        let text = self.to_string();
        let mut lines = Vec::new();
        let mut start = 0;
        let mut chars = text.char_indices().peekable();
        while let Some((at, c)) = chars.next() {
            if !is_line_boundary(c) {
                continue;
            }
            let mut end = at + c.len_utf8();
            if c == '\r' {
                if let Some(&(_, '\n')) = chars.peek() {
                    chars.next();
                    end += 1;
                }
            }
            let line = if keep_ends { &text[start..end] } else { &text[start..at] };
            lines.push(line.to_string());
            start = end;
        }
        if start < text.len() {
            lines.push(text[start..].to_string());
        }
        lines
    }

    pub fn lines(&self) -> Vec<String> {
        self.split_lines(false)
    }

    pub fn is_match(&self, pattern: &Regex) -> bool {
        pattern.is_match(&self.to_string())
    }

    pub fn to_transcript(&self) -> Transcript {
        Transcript {
            session_id: self.session_id,
            entries: self.entries(),
        }
    }

    pub fn to_json(&self) -> Result<String, CaptureError> {
        serde_json::to_string_pretty(&self.to_transcript())
            .map_err(|e| CaptureError::SerializationError(e.to_string()))
    }
}

fn is_line_boundary(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

impl fmt::Display for MergedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in self.entries() {
            f.write_str(&entry.text)?;
        }
        Ok(())
    }
}

impl fmt::Debug for MergedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergedView")
            .field("session_id", &self.session_id)
            .field("channels", &self.channels())
            .field("text", &self.to_string())
            .finish()
    }
}

impl PartialEq<str> for MergedView {
    fn eq(&self, other: &str) -> bool {
        self.equals(other)
    }
}

impl PartialEq<&str> for MergedView {
    fn eq(&self, other: &&str) -> bool {
        self.equals(other)
    }
}

impl PartialEq<String> for MergedView {
    fn eq(&self, other: &String) -> bool {
        self.equals(other)
    }
}

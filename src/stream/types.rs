// Copyright 2026 The Chatstream Project
// SPDX-License-Identifier: Apache-2.0

// Stream types
//
// Frames handed from the framer to the accumulator, per-line outcomes,
// stream termination states, and per-stream counters.

/// Prefix carried by every SSE data field line.
pub const DATA_PREFIX: &str = "data: ";

/// Payload sentinel that ends the stream successfully.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Default cap on a held (re-buffered) fragment in bytes.
pub const DEFAULT_MAX_PENDING_BYTES: usize = 1_048_576; // 1 MB

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// One logical protocol line produced by the framer.
///
/// A frame is normally a single `data: ` line. When a previous frame failed
/// to parse and was held, the next frame is the held text joined with `"\n"`
/// to the following raw line; `continuation_at` then marks where that raw
/// line begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    text: String,
    continuation_at: Option<usize>,
}

impl Frame {
    /// A frame made of exactly one line.
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            continuation_at: None,
        }
    }

    /// A held fragment joined with the raw line that followed it.
    pub fn joined(held: &str, next: &str) -> Self {
        let mut text = String::with_capacity(held.len() + 1 + next.len());
        text.push_str(held);
        text.push('\n');
        text.push_str(next);
        Self {
            text,
            continuation_at: Some(held.len() + 1),
        }
    }

    pub(crate) fn from_parts(text: String, continuation_at: Option<usize>) -> Self {
        Self {
            text,
            continuation_at,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Whether this frame carries a previously held fragment.
    pub fn is_joined(&self) -> bool {
        self.continuation_at.is_some()
    }

    /// The raw line appended to a held fragment, if any.
    pub fn continuation(&self) -> Option<&str> {
        self.continuation_at.map(|at| &self.text[at..])
    }

    /// The payload: text after `data: `, trimmed. `None` if the frame does
    /// not start with the data prefix.
    pub fn payload(&self) -> Option<&str> {
        self.text.strip_prefix(DATA_PREFIX).map(str::trim)
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

// ---------------------------------------------------------------------------
// Accumulator outcomes
// ---------------------------------------------------------------------------

/// What the accumulator did with one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// A non-empty content fragment was appended to the pending content.
    Merged(String),
    /// Well-formed payload carrying no fragment.
    Skipped,
    /// The `[DONE]` sentinel was seen.
    Done,
    /// The payload failed to parse and more bytes may complete it.
    /// The caller must hold the returned frame.
    Incomplete(Frame),
    /// The frame was dropped: unparseable during finalize, or received
    /// after the stream already completed.
    Discarded,
}

/// Whether the accumulator is consuming live input or the terminal flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Live,
    Finalize,
}

// ---------------------------------------------------------------------------
// Stream termination
// ---------------------------------------------------------------------------

/// Control signal after one feed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Done,
}

/// Successful terminal state of one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The `[DONE]` sentinel was observed.
    Done,
    /// The source ended without a sentinel.
    Closed,
}

/// Counters collected while consuming one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub chunks: usize,
    pub bytes: usize,
    pub merges: usize,
    /// Frames held for completion by later input.
    pub held: usize,
    /// Fragments dropped as unrecoverable.
    pub discarded: usize,
}

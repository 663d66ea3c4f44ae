// Copyright 2026 The Chatstream Project
// SPDX-License-Identifier: Apache-2.0

// Stream framer
//
// Turns arbitrarily sized byte chunks into complete `data: ` lines.
// Bytes are decoded as UTF-8 incrementally, lines are cut at "\n" with
// one trailing "\r" stripped, and anything unresolved stays buffered for
// the next feed. Frames that fail to parse downstream can be held: they
// go back in front of the buffer and are joined to the next raw line.

use std::borrow::Cow;

use super::types::{Frame, DATA_PREFIX, DEFAULT_MAX_PENDING_BYTES};

/// Line reassembly state for one stream.
#[derive(Debug)]
pub struct StreamFramer {
    /// Decoded text not yet resolved into lines.
    buffer: String,
    /// Length of the held fragment at the front of `buffer`. The newline
    /// right after it does not terminate a line.
    held: Option<usize>,
    /// Trailing bytes of an incomplete UTF-8 sequence.
    partial_utf8: Vec<u8>,
    max_pending_bytes: usize,
}

impl Default for StreamFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamFramer {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_PENDING_BYTES)
    }

    /// Create a framer that discards held fragments larger than
    /// `max_pending_bytes`.
    pub fn with_limit(max_pending_bytes: usize) -> Self {
        Self {
            buffer: String::new(),
            held: None,
            partial_utf8: Vec::new(),
            max_pending_bytes,
        }
    }

    /// Append a chunk and return the complete lines it resolves.
    ///
    /// The iterator is lazy: lines are cut out of the buffer one at a time
    /// as it is advanced. Whatever is not consumed stays buffered.
    pub fn feed(&mut self, chunk: &[u8]) -> Frames<'_> {
        self.decode(chunk);
        Frames {
            framer: self,
            terminal: false,
        }
    }

    /// Drain the remainder after the source has ended.
    ///
    /// The final segment is yielded even without a trailing newline.
    pub fn finalize(&mut self) -> Frames<'_> {
        if !self.partial_utf8.is_empty() {
            let rest = std::mem::take(&mut self.partial_utf8);
            self.buffer.push_str(&String::from_utf8_lossy(&rest));
        }
        Frames {
            framer: self,
            terminal: true,
        }
    }

    /// Text received but not yet resolved into lines.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Whether a fragment is waiting for its continuation.
    pub fn is_holding(&self) -> bool {
        self.held.is_some()
    }

    fn decode(&mut self, chunk: &[u8]) {
        let bytes: Cow<'_, [u8]> = if self.partial_utf8.is_empty() {
            Cow::Borrowed(chunk)
        } else {
            let mut joined = std::mem::take(&mut self.partial_utf8);
            joined.extend_from_slice(chunk);
            Cow::Owned(joined)
        };

        let mut rest: &[u8] = &bytes;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    self.buffer.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // Incomplete sequence at the end: wait for more bytes.
                            self.partial_utf8 = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Cut the next raw line out of the buffer.
    ///
    /// While a fragment is held, comment and blank lines between it and
    /// its continuation are dropped and the fragment stays held.
    fn next_raw(&mut self, terminal: bool) -> Option<Frame> {
        loop {
            let start = self.held.map_or(0, |n| n + 1);
            let (end, consumed) = match self.buffer.get(start..).and_then(|s| s.find('\n')) {
                Some(idx) => (start + idx, start + idx + 1),
                None if terminal && !self.buffer.is_empty() => (self.buffer.len(), self.buffer.len()),
                None => return None,
            };

            let rest = &self.buffer[start..end];
            if self.held.is_some()
                && consumed > start
                && (rest.starts_with(':') || rest.trim().is_empty())
            {
                self.buffer.drain(start..consumed);
                continue;
            }

            let mut line = self.buffer[..end].to_string();
            self.buffer.drain(..consumed);

            if line.len() > start && line.ends_with('\r') {
                line.pop();
            }

            return Some(match self.held.take() {
                Some(n) => Frame::from_parts(line, Some(n + 1)),
                None => Frame::line(line),
            });
        }
    }

    fn hold(&mut self, frame: Frame, terminal: bool) -> bool {
        if terminal {
            return false;
        }
        if frame.len() > self.max_pending_bytes {
            tracing::warn!(
                bytes = frame.len(),
                limit = self.max_pending_bytes,
                "discarding unparseable fragment over pending limit"
            );
            return false;
        }

        let text = frame.into_string();
        let mut buffer = String::with_capacity(text.len() + 1 + self.buffer.len());
        buffer.push_str(&text);
        buffer.push('\n');
        buffer.push_str(&self.buffer);
        self.held = Some(text.len());
        self.buffer = buffer;
        true
    }
}

/// Whether a single line carries a payload worth handing downstream.
fn is_data_line(line: &str) -> bool {
    if line.trim().is_empty() || line.starts_with(':') {
        return false;
    }
    line.starts_with(DATA_PREFIX)
}

// ---------------------------------------------------------------------------
// Frames iterator
// ---------------------------------------------------------------------------

/// Lazy sequence of frames produced by one `feed` or `finalize` call.
pub struct Frames<'a> {
    framer: &'a mut StreamFramer,
    terminal: bool,
}

impl Frames<'_> {
    /// Put a frame that failed to parse back in front of the buffer. The
    /// caller should stop pulling frames from this batch once it is held.
    ///
    /// Returns `false` if the frame was discarded instead: during finalize
    /// nothing can complete it, and oversized fragments are dropped.
    pub fn hold(&mut self, frame: Frame) -> bool {
        self.framer.hold(frame, self.terminal)
    }
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        loop {
            let frame = self.framer.next_raw(self.terminal)?;
            if frame.is_joined() || is_data_line(frame.as_str()) {
                return Some(frame);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(frames: Frames<'_>) -> Vec<String> {
        frames.map(Frame::into_string).collect()
    }

    #[test]
    fn complete_lines_are_cut_and_remainder_buffered() {
        let mut framer = StreamFramer::new();
        let out = lines(framer.feed(b"data: a\ndata: b\ndata: c"));
        assert_eq!(out, vec!["data: a", "data: b"]);
        assert_eq!(framer.buffered(), "data: c");
    }

    #[test]
    fn carriage_return_is_stripped() {
        let mut framer = StreamFramer::new();
        let out = lines(framer.feed(b"data: a\r\ndata: b\r\n"));
        assert_eq!(out, vec!["data: a", "data: b"]);
    }

    #[test]
    fn only_one_carriage_return_is_stripped() {
        let mut framer = StreamFramer::new();
        let out = lines(framer.feed(b"data: a\r\r\n"));
        assert_eq!(out, vec!["data: a\r"]);
    }

    #[test]
    fn comments_blank_and_non_data_lines_are_filtered() {
        let mut framer = StreamFramer::new();
        let out = lines(framer.feed(
            b": keepalive\n\n   \nevent: ping\nid: 7\ndata:no-space\ndata: kept\n",
        ));
        assert_eq!(out, vec!["data: kept"]);
    }

    #[test]
    fn empty_chunk_yields_nothing() {
        let mut framer = StreamFramer::new();
        assert!(lines(framer.feed(b"")).is_empty());
        assert_eq!(framer.buffered(), "");
    }

    #[test]
    fn line_split_across_chunks_is_reassembled() {
        let mut framer = StreamFramer::new();
        assert!(lines(framer.feed(b"da")).is_empty());
        assert!(lines(framer.feed(b"ta: hel")).is_empty());
        let out = lines(framer.feed(b"lo\n"));
        assert_eq!(out, vec!["data: hello"]);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let mut framer = StreamFramer::new();
        let text = "data: h\u{e9}llo \u{1f600}\n".as_bytes();
        // Split inside both the two-byte and four-byte sequences.
        let e_acute = text.iter().position(|b| *b == 0xC3).unwrap();
        let emoji = text.iter().position(|b| *b == 0xF0).unwrap();
        assert!(lines(framer.feed(&text[..e_acute + 1])).is_empty());
        assert!(lines(framer.feed(&text[e_acute + 1..emoji + 2])).is_empty());
        let out = lines(framer.feed(&text[emoji + 2..]));
        assert_eq!(out, vec!["data: h\u{e9}llo \u{1f600}"]);
    }

    #[test]
    fn invalid_utf8_becomes_replacement_character() {
        let mut framer = StreamFramer::new();
        let out = lines(framer.feed(b"data: a\xFFb\n"));
        assert_eq!(out, vec!["data: a\u{fffd}b"]);
    }

    #[test]
    fn iterator_is_lazy() {
        let mut framer = StreamFramer::new();
        let mut frames = framer.feed(b"data: 1\ndata: 2\ndata: 3\n");
        assert_eq!(frames.next().map(Frame::into_string).as_deref(), Some("data: 1"));
        drop(frames);
        assert_eq!(framer.buffered(), "data: 2\ndata: 3\n");
    }

    #[test]
    fn held_frame_is_joined_with_next_raw_line() {
        let mut framer = StreamFramer::new();
        let mut frames = framer.feed(b"data: {\"a\":\n");
        let first = frames.next().unwrap();
        assert!(frames.hold(first));
        assert!(framer.is_holding());
        assert_eq!(framer.buffered(), "data: {\"a\":\n");

        let mut frames = framer.feed(b"1}\ndata: next\n");
        let joined = frames.next().unwrap();
        assert!(joined.is_joined());
        assert_eq!(joined.as_str(), "data: {\"a\":\n1}");
        assert_eq!(joined.continuation(), Some("1}"));
        assert_eq!(frames.next().unwrap().as_str(), "data: next");
        assert!(!framer.is_holding());
    }

    #[test]
    fn comment_between_held_fragment_and_continuation_is_skipped() {
        let mut framer = StreamFramer::new();
        let mut frames = framer.feed(b"data: {\"a\":\n");
        let first = frames.next().unwrap();
        assert!(frames.hold(first));

        assert!(lines(framer.feed(b": ping\r\n")).is_empty());
        assert!(framer.is_holding());
        assert_eq!(framer.buffered(), "data: {\"a\":\n");

        let joined = framer.feed(b"1}\n").next().unwrap();
        assert_eq!(joined.as_str(), "data: {\"a\":\n1}");
    }

    #[test]
    fn blank_lines_between_held_fragment_and_continuation_are_skipped() {
        let mut framer = StreamFramer::new();
        let mut frames = framer.feed(b"data: {\"a\":\n\r\n\n1}\n");
        let first = frames.next().unwrap();
        assert!(frames.hold(first));
        let joined = framer.finalize().next().unwrap();
        assert_eq!(joined.as_str(), "data: {\"a\":\n1}");
    }

    #[test]
    fn comment_after_held_fragment_at_finalize_is_skipped() {
        let mut framer = StreamFramer::new();
        let mut frames = framer.feed(b"data: {\"a\":\n: ping");
        let first = frames.next().unwrap();
        assert!(frames.hold(first));
        let out = lines(framer.finalize());
        assert_eq!(out, vec!["data: {\"a\":\n"]);
    }

    #[test]
    fn hold_keeps_unconsumed_lines_behind_fragment() {
        let mut framer = StreamFramer::new();
        let mut frames = framer.feed(b"data: {\ndata: later\n");
        let first = frames.next().unwrap();
        assert!(frames.hold(first));
        assert_eq!(framer.buffered(), "data: {\ndata: later\n");
    }

    #[test]
    fn hold_over_limit_discards() {
        let mut framer = StreamFramer::with_limit(8);
        let mut frames = framer.feed(b"data: {\"much too long\n");
        let first = frames.next().unwrap();
        assert!(!frames.hold(first));
        assert!(!framer.is_holding());
        assert_eq!(framer.buffered(), "");
    }

    #[test]
    fn finalize_yields_unterminated_line() {
        let mut framer = StreamFramer::new();
        assert!(lines(framer.feed(b"data: tail")).is_empty());
        let out = lines(framer.finalize());
        assert_eq!(out, vec!["data: tail"]);
        assert_eq!(framer.buffered(), "");
    }

    #[test]
    fn finalize_filters_garbage() {
        let mut framer = StreamFramer::new();
        assert!(lines(framer.feed(b"data: a\n: comment\r\nnoise")).len() == 1);
        assert!(lines(framer.finalize()).is_empty());
    }

    #[test]
    fn finalize_never_holds() {
        let mut framer = StreamFramer::new();
        let _ = lines(framer.feed(b"data: {\"broken"));
        let mut frames = framer.finalize();
        let frame = frames.next().unwrap();
        assert!(!frames.hold(frame));
        assert!(!framer.is_holding());
    }

    #[test]
    fn finalize_flushes_incomplete_utf8_lossily() {
        let mut framer = StreamFramer::new();
        let _ = lines(framer.feed(b"data: x\xE2\x82"));
        let out = lines(framer.finalize());
        assert_eq!(out, vec!["data: x\u{fffd}"]);
    }
}

// Copyright 2026 The Chatstream Project
// SPDX-License-Identifier: Apache-2.0

// Delta accumulator
//
// Classifies each framed data line, extracts the content fragment at
// choices[0].delta.content, and appends it to the pending assistant
// content. Parse failures are handed back to the caller for holding
// while the stream is live, and dropped during the terminal flush.

use serde_json::Value;

use super::types::{Frame, LineOutcome, Phase, DATA_PREFIX, DONE_SENTINEL};

/// Pending assistant content for one turn.
#[derive(Debug, Default)]
pub struct DeltaAccumulator {
    content: String,
    done: bool,
    merges: usize,
    superseded: usize,
}

impl DeltaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content merged so far.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }

    /// Whether the `[DONE]` sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of fragments merged.
    pub fn merges(&self) -> usize {
        self.merges
    }

    /// Held fragments dropped because a new data line arrived instead of
    /// their continuation.
    pub fn superseded(&self) -> usize {
        self.superseded
    }

    /// Process one frame.
    pub fn accept(&mut self, frame: Frame, phase: Phase) -> LineOutcome {
        if self.done {
            return LineOutcome::Discarded;
        }

        let Some(payload) = frame.payload() else {
            return LineOutcome::Skipped;
        };

        if payload == DONE_SENTINEL {
            self.done = true;
            return LineOutcome::Done;
        }

        let event = match parse_event(payload, frame.is_joined()) {
            Some(v) => v,
            None => return self.reject(frame, phase),
        };

        match extract_fragment(&event) {
            Some(fragment) if !fragment.is_empty() => {
                self.content.push_str(fragment);
                self.merges += 1;
                LineOutcome::Merged(fragment.to_string())
            }
            _ => LineOutcome::Skipped,
        }
    }

    fn reject(&mut self, frame: Frame, phase: Phase) -> LineOutcome {
        // A held fragment followed by a fresh data line will never complete:
        // drop the fragment and start over from the new line.
        if let Some(next) = frame.continuation() {
            if next.starts_with(DATA_PREFIX) {
                tracing::warn!(
                    bytes = frame.len() - next.len() - 1,
                    "discarding unparseable fragment superseded by a new data line"
                );
                self.superseded += 1;
                let next = Frame::line(next);
                return self.accept(next, phase);
            }
        }

        match phase {
            Phase::Live => LineOutcome::Incomplete(frame),
            Phase::Finalize => LineOutcome::Discarded,
        }
    }
}

/// Parse a payload. For a joined frame the newlines at the join points
/// are not part of the event; raw JSON never contains a literal newline
/// inside a string, so stripping them all is safe.
fn parse_event(payload: &str, joined: bool) -> Option<Value> {
    match serde_json::from_str(payload) {
        Ok(v) => Some(v),
        Err(_) if joined => serde_json::from_str(&payload.replace('\n', "")).ok(),
        Err(_) => None,
    }
}

/// Look up `choices[0].delta.content`.
fn extract_fragment(event: &Value) -> Option<&str> {
    event
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(|c| c.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(json: &str) -> Frame {
        Frame::line(format!("data: {json}"))
    }

    fn delta(content: &str) -> Frame {
        data(&serde_json::json!({"choices":[{"delta":{"content":content}}]}).to_string())
    }

    #[test]
    fn fragment_is_merged() {
        let mut acc = DeltaAccumulator::new();
        assert_eq!(
            acc.accept(delta("Hel"), Phase::Live),
            LineOutcome::Merged("Hel".to_string())
        );
        assert_eq!(
            acc.accept(delta("lo"), Phase::Live),
            LineOutcome::Merged("lo".to_string())
        );
        assert_eq!(acc.content(), "Hello");
        assert_eq!(acc.merges(), 2);
    }

    #[test]
    fn payload_is_trimmed() {
        let mut acc = DeltaAccumulator::new();
        let frame = Frame::line(r#"data:    {"choices":[{"delta":{"content":"x"}}]}   "#);
        assert_eq!(acc.accept(frame, Phase::Live), LineOutcome::Merged("x".into()));
    }

    #[test]
    fn done_sentinel_ends_stream() {
        let mut acc = DeltaAccumulator::new();
        assert_eq!(acc.accept(data("[DONE]"), Phase::Live), LineOutcome::Done);
        assert!(acc.is_done());
        assert_eq!(acc.accept(delta("late"), Phase::Live), LineOutcome::Discarded);
        assert_eq!(acc.accept(data("[DONE]"), Phase::Live), LineOutcome::Discarded);
        assert_eq!(acc.content(), "");
    }

    #[test]
    fn missing_path_is_skipped() {
        let mut acc = DeltaAccumulator::new();
        for json in [
            r#"{"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"delta":{"content":null}}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
            r#"{"choices":[]}"#,
            r#"{"choices":5}"#,
            r#"{"usage":{"total_tokens":3}}"#,
            r#"[1,2,3]"#,
            r#""just a string""#,
            r#"{"choices":[{"delta":{"content":42}}]}"#,
        ] {
            assert_eq!(acc.accept(data(json), Phase::Live), LineOutcome::Skipped, "{json}");
        }
        assert_eq!(acc.content(), "");
    }

    #[test]
    fn empty_fragment_is_skipped() {
        let mut acc = DeltaAccumulator::new();
        assert_eq!(acc.accept(delta(""), Phase::Live), LineOutcome::Skipped);
        assert_eq!(acc.merges(), 0);
    }

    #[test]
    fn only_first_choice_is_read() {
        let mut acc = DeltaAccumulator::new();
        let frame = data(
            r#"{"choices":[{"delta":{"content":"a"}},{"delta":{"content":"b"}}]}"#,
        );
        assert_eq!(acc.accept(frame, Phase::Live), LineOutcome::Merged("a".into()));
    }

    #[test]
    fn malformed_live_payload_is_returned_for_holding() {
        let mut acc = DeltaAccumulator::new();
        let frame = data(r#"{"choices":[{"delta":"#);
        assert_eq!(
            acc.accept(frame.clone(), Phase::Live),
            LineOutcome::Incomplete(frame)
        );
        assert_eq!(acc.content(), "");
    }

    #[test]
    fn malformed_payload_discarded_during_finalize() {
        let mut acc = DeltaAccumulator::new();
        let frame = data(r#"{"choices":[{"delta":"#);
        assert_eq!(acc.accept(frame, Phase::Finalize), LineOutcome::Discarded);
    }

    #[test]
    fn joined_frame_completes_split_payload() {
        let mut acc = DeltaAccumulator::new();
        let frame = Frame::joined(r#"data: {"choices":[{"delta":"#, r#"{"content":"ok"}}]}"#);
        assert_eq!(acc.accept(frame, Phase::Live), LineOutcome::Merged("ok".into()));
    }

    #[test]
    fn joined_frame_split_inside_string_literal() {
        let mut acc = DeltaAccumulator::new();
        let frame = Frame::joined(r#"data: {"choices":[{"delta":{"con"#, r#"tent":"ok"}}]}"#);
        assert_eq!(acc.accept(frame, Phase::Live), LineOutcome::Merged("ok".into()));
    }

    #[test]
    fn joined_frame_with_new_data_line_drops_fragment() {
        let mut acc = DeltaAccumulator::new();
        let frame = Frame::joined(
            r#"data: {"garbage"#,
            r#"data: {"choices":[{"delta":{"content":"fresh"}}]}"#,
        );
        assert_eq!(acc.accept(frame, Phase::Live), LineOutcome::Merged("fresh".into()));
        assert_eq!(acc.superseded(), 1);
    }

    #[test]
    fn joined_frame_with_new_partial_data_line_holds_only_the_new_line() {
        let mut acc = DeltaAccumulator::new();
        let frame = Frame::joined(r#"data: {"garbage"#, r#"data: {"choices":"#);
        assert_eq!(
            acc.accept(frame, Phase::Live),
            LineOutcome::Incomplete(Frame::line(r#"data: {"choices":"#))
        );
    }

    #[test]
    fn joined_frame_with_done_sentinel_finishes() {
        let mut acc = DeltaAccumulator::new();
        let frame = Frame::joined(r#"data: {"garbage"#, "data: [DONE]");
        assert_eq!(acc.accept(frame, Phase::Live), LineOutcome::Done);
    }

    #[test]
    fn joined_frame_still_incomplete_is_returned_whole() {
        let mut acc = DeltaAccumulator::new();
        let frame = Frame::joined(r#"data: {"choices":"#, r#"[{"delta":"#);
        assert_eq!(
            acc.accept(frame.clone(), Phase::Live),
            LineOutcome::Incomplete(frame)
        );
    }
}

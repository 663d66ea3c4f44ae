// Copyright 2026 The Chatstream Project
// SPDX-License-Identifier: Apache-2.0

// Stream processor
//
// Drives one stream through the framer and the accumulator. Chunks are
// processed strictly in arrival order; every line of a chunk (including
// any holding) is handled before the next chunk is pulled. The sink sees
// the full pending content after each merge.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use super::accumulator::DeltaAccumulator;
use super::framer::StreamFramer;
use super::types::{Flow, LineOutcome, Phase, StreamEnd, StreamStats, DEFAULT_MAX_PENDING_BYTES};

/// Consumes one SSE chat completion stream.
#[derive(Debug)]
pub struct StreamProcessor {
    framer: StreamFramer,
    accumulator: DeltaAccumulator,
    stats: StreamStats,
}

impl Default for StreamProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PENDING_BYTES)
    }
}

impl StreamProcessor {
    pub fn new(max_pending_bytes: usize) -> Self {
        Self {
            framer: StreamFramer::with_limit(max_pending_bytes),
            accumulator: DeltaAccumulator::new(),
            stats: StreamStats::default(),
        }
    }

    /// Pending assistant content merged so far.
    pub fn content(&self) -> &str {
        self.accumulator.content()
    }

    pub fn into_content(self) -> String {
        self.accumulator.into_content()
    }

    pub fn is_done(&self) -> bool {
        self.accumulator.is_done()
    }

    pub fn stats(&self) -> StreamStats {
        StreamStats {
            discarded: self.stats.discarded + self.accumulator.superseded(),
            merges: self.accumulator.merges(),
            ..self.stats.clone()
        }
    }

    /// Run one feed batch.
    pub fn push<F>(&mut self, chunk: &[u8], sink: &mut F) -> Flow
    where
        F: FnMut(&str),
    {
        if self.accumulator.is_done() {
            return Flow::Done;
        }
        self.stats.chunks += 1;
        self.stats.bytes += chunk.len();

        let frames = self.framer.feed(chunk);
        run_batch(frames, &mut self.accumulator, &mut self.stats, Phase::Live, sink)
    }

    /// Run the terminal pass after the source has ended.
    pub fn close<F>(&mut self, sink: &mut F) -> StreamEnd
    where
        F: FnMut(&str),
    {
        if self.accumulator.is_done() {
            return StreamEnd::Done;
        }
        let frames = self.framer.finalize();
        match run_batch(frames, &mut self.accumulator, &mut self.stats, Phase::Finalize, sink) {
            Flow::Done => StreamEnd::Done,
            Flow::Continue => StreamEnd::Closed,
        }
    }

    /// Pull chunks from `input` until `[DONE]`, natural end, or an error.
    ///
    /// The source is not polled again once `[DONE]` is seen.
    pub async fn drive<S, E, F>(&mut self, input: S, mut sink: F) -> Result<StreamEnd, E>
    where
        S: Stream<Item = Result<Bytes, E>>,
        F: FnMut(&str),
    {
        futures_util::pin_mut!(input);
        while let Some(chunk) = input.next().await {
            let chunk = chunk?;
            if self.push(&chunk, &mut sink) == Flow::Done {
                return Ok(StreamEnd::Done);
            }
        }
        Ok(self.close(&mut sink))
    }
}

fn run_batch<F>(
    mut frames: super::framer::Frames<'_>,
    accumulator: &mut DeltaAccumulator,
    stats: &mut StreamStats,
    phase: Phase,
    sink: &mut F,
) -> Flow
where
    F: FnMut(&str),
{
    while let Some(frame) = frames.next() {
        match accumulator.accept(frame, phase) {
            LineOutcome::Merged(_) => sink(accumulator.content()),
            LineOutcome::Skipped => {}
            LineOutcome::Done => return Flow::Done,
            LineOutcome::Incomplete(frame) => {
                if frames.hold(frame) {
                    stats.held += 1;
                    break;
                }
                stats.discarded += 1;
            }
            LineOutcome::Discarded => stats.discarded += 1,
        }
    }
    Flow::Continue
}

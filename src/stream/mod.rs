// Copyright 2026 The Chatstream Project
// SPDX-License-Identifier: Apache-2.0

// SSE chat completion stream consumption
//
// Responsibilities:
// - Reassemble `data: ` lines from arbitrarily chunked bytes
// - Skip comments, blank lines and non-data fields
// - Extract choices[0].delta.content and accumulate it
// - Hold unparseable lines until more bytes complete them
// - Stop on `data: [DONE]`, flush the remainder on natural close
// - Memory-bounded: 1MB default cap per held fragment

mod accumulator;
mod framer;
mod processor;
mod types;

pub use accumulator::DeltaAccumulator;
pub use framer::{Frames, StreamFramer};
pub use processor::StreamProcessor;
pub use types::{
    Flow, Frame, LineOutcome, Phase, StreamEnd, StreamStats, DATA_PREFIX,
    DEFAULT_MAX_PENDING_BYTES, DONE_SENTINEL,
};

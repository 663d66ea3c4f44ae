// Copyright 2026 The Chatstream Project
// SPDX-License-Identifier: Apache-2.0

// Chat session
//
// Owns the conversation and runs one send at a time:
// IDLE -> SENDING -> STREAMING -> {DONE, CLOSED, FAILED}
//
// - Success (DONE or CLOSED): the turn is settled and kept
// - Failure (start or transport): the turn is rolled back and one
//   notification is emitted
// - Cancellation (the send future is dropped): the turn is settled with
//   whatever content was last merged

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::client::ChatClient;
use crate::error::ChatError;
use crate::message::{Conversation, Message};
use crate::notify::Notifier;
use crate::stream::{StreamEnd, StreamProcessor, StreamStats, DEFAULT_MAX_PENDING_BYTES};

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub request_id: Uuid,
    pub end: StreamEnd,
    /// Final assistant content. Empty when the stream carried no fragments.
    pub content: String,
    pub stats: StreamStats,
}

// ---------------------------------------------------------------------------
// Turn guard
// ---------------------------------------------------------------------------

/// Settles an open turn if the send is dropped before it finishes.
struct TurnGuard<'a> {
    conversation: &'a mut Conversation,
    request_id: Uuid,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if self.conversation.is_streaming() {
            tracing::info!(
                request_id = %self.request_id,
                reply_len = self.conversation.reply().map_or(0, |m| m.content.len()),
                "send cancelled, keeping partial reply"
            );
            self.conversation.settle();
        }
    }
}

// ---------------------------------------------------------------------------
// ChatSession
// ---------------------------------------------------------------------------

pub struct ChatSession {
    client: ChatClient,
    conversation: Conversation,
    notifier: Arc<dyn Notifier>,
    max_pending_bytes: usize,
}

impl ChatSession {
    pub fn new(client: ChatClient, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            client,
            conversation: Conversation::new(),
            notifier,
            max_pending_bytes: DEFAULT_MAX_PENDING_BYTES,
        }
    }

    /// Continue from an existing conversation.
    pub fn with_conversation(mut self, conversation: Conversation) -> Self {
        self.conversation = conversation;
        self
    }

    /// Cap on a single held stream fragment.
    pub fn with_max_pending_bytes(mut self, max_pending_bytes: usize) -> Self {
        self.max_pending_bytes = max_pending_bytes;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn into_conversation(self) -> Conversation {
        self.conversation
    }

    /// Whether a send is in flight (the loading indicator).
    pub fn is_streaming(&self) -> bool {
        self.conversation.is_streaming()
    }

    /// Send one user message and stream the reply into the conversation.
    ///
    /// `on_update` sees the assistant message after every merged fragment.
    /// On failure the conversation is restored to its state before the
    /// call and the notifier receives exactly one notification.
    pub async fn send<F>(
        &mut self,
        input: impl Into<String>,
        mut on_update: F,
    ) -> Result<SendOutcome, ChatError>
    where
        F: FnMut(&Message),
    {
        let request_id = Uuid::new_v4();
        let start = Instant::now();

        self.conversation.begin_turn(input)?;
        let mut turn = TurnGuard {
            conversation: &mut self.conversation,
            request_id,
        };

        tracing::info!(
            request_id = %request_id,
            url = %self.client.url(),
            history = turn.conversation.len(),
            "send started"
        );

        let stream = match self.client.open_stream(turn.conversation.messages()).await {
            Ok(stream) => stream,
            Err(e) => return Err(abandon(turn, self.notifier.as_ref(), e, start)),
        };

        let mut processor = StreamProcessor::new(self.max_pending_bytes);
        let driven = {
            let conversation = &mut *turn.conversation;
            processor
                .drive(stream, |content: &str| {
                    if let Ok(reply) = conversation.set_reply(content) {
                        on_update(reply);
                    }
                })
                .await
        };

        let stats = processor.stats();
        tracing::debug!(
            request_id = %request_id,
            chunks = stats.chunks,
            bytes = stats.bytes,
            merges = stats.merges,
            held = stats.held,
            discarded = stats.discarded,
            "stream stats"
        );

        let end = match driven {
            Ok(end) => end,
            Err(e) => {
                return Err(abandon(
                    turn,
                    self.notifier.as_ref(),
                    ChatError::Transport(e),
                    start,
                ))
            }
        };

        turn.conversation.settle();
        drop(turn);

        let content = processor.into_content();
        tracing::info!(
            request_id = %request_id,
            end = ?end,
            merges = stats.merges,
            reply_len = content.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "send completed"
        );

        Ok(SendOutcome {
            request_id,
            end,
            content,
            stats,
        })
    }
}

/// Roll the turn back and notify.
fn abandon(mut turn: TurnGuard<'_>, notifier: &dyn Notifier, err: ChatError, start: Instant) -> ChatError {
    tracing::warn!(
        request_id = %turn.request_id,
        kind = ?err.kind(),
        error = %err,
        latency_ms = start.elapsed().as_millis() as u64,
        "send failed, rolling back turn"
    );
    turn.conversation.rollback();
    notifier.notify(err.notification());
    err
}

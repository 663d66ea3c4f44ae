// Copyright 2026 The Chatstream Project
// SPDX-License-Identifier: Apache-2.0

// Chat error taxonomy
//
// Start failures (status or missing body) and transport failures both roll
// the turn back. Parse anomalies never reach this type; the accumulator
// absorbs them.

use crate::client::HttpError;
use crate::notify::Notification;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("rate limit exceeded")]
    RateLimited,

    #[error("quota exceeded")]
    QuotaExceeded,

    #[error("failed to start stream (status {status})")]
    StreamStart { status: u16 },

    #[error("no response body")]
    MissingBody,

    #[error("failed to start stream: {0}")]
    Request(#[source] HttpError),

    #[error("stream interrupted: {0}")]
    Transport(#[source] HttpError),

    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("a reply is already streaming")]
    TurnInProgress,

    #[error("no turn is open")]
    NoOpenTurn,
}

/// Sub-kinds of a failure to start the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartFailure {
    /// Status 429.
    RateLimited,
    /// Status 402.
    QuotaExceeded,
    /// Any other failure before the first byte of the stream.
    StreamStartError,
}

/// Coarse classification used for notifications and rollback decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Start(StartFailure),
    Transport,
    /// Misuse of the conversation (overlapping turns). Nothing to undo.
    Conflict,
}

impl ChatError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ChatError::RateLimited => FailureKind::Start(StartFailure::RateLimited),
            ChatError::QuotaExceeded => FailureKind::Start(StartFailure::QuotaExceeded),
            ChatError::StreamStart { .. }
            | ChatError::MissingBody
            | ChatError::Request(_)
            | ChatError::Encode(_) => FailureKind::Start(StartFailure::StreamStartError),
            ChatError::Transport(_) => FailureKind::Transport,
            ChatError::TurnInProgress | ChatError::NoOpenTurn => FailureKind::Conflict,
        }
    }

    /// The user-facing notification for this error.
    pub fn notification(&self) -> Notification {
        let kind = self.kind();
        match kind {
            FailureKind::Start(StartFailure::RateLimited) => Notification::new(
                kind,
                "Rate Limit Exceeded",
                "Please try again in a few moments.",
            ),
            FailureKind::Start(StartFailure::QuotaExceeded) => Notification::new(
                kind,
                "Payment Required",
                "Please add funds to continue using AI features.",
            ),
            _ => Notification::new(kind, "Error", self.notification_text()),
        }
    }

    /// Description shown in the generic error notification.
    fn notification_text(&self) -> String {
        match self {
            ChatError::StreamStart { status } => {
                format!("Failed to start stream (status {status})")
            }
            ChatError::MissingBody => "No response body".to_string(),
            ChatError::Request(_) | ChatError::Encode(_) => "Failed to start stream".to_string(),
            ChatError::Transport(_) => "The response was interrupted".to_string(),
            ChatError::TurnInProgress => "A reply is already streaming".to_string(),
            ChatError::NoOpenTurn => "No message is waiting for a reply".to_string(),
            ChatError::RateLimited => "Rate limit exceeded".to_string(),
            ChatError::QuotaExceeded => "Quota exceeded".to_string(),
        }
    }
}

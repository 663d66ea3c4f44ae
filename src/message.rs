// Copyright 2026 The Chatstream Project
// SPDX-License-Identifier: Apache-2.0

// Conversation model
//
// Messages, the conversation they form, and the explicit turn state that
// decides where streamed assistant content lands. The conversation is the
// only state visible outside the streaming subsystem.

use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// The role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Where the conversation is within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// No turn open. Either nothing has been sent yet or the last turn was
    /// rolled back.
    AwaitingUser,
    /// A turn is open.
    StreamingAssistant {
        /// Conversation length before the user message was appended.
        checkpoint: usize,
        /// Index of the assistant reply, once the first fragment arrived.
        reply: Option<usize>,
    },
    /// The last turn completed (or was abandoned) and is kept.
    Settled,
}

/// Ordered, append-mostly message history with an explicit turn state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
    turn: TurnState,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            turn: TurnState::AwaitingUser,
        }
    }

    /// Start from existing history. No turn is open.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let turn = if messages.is_empty() {
            TurnState::AwaitingUser
        } else {
            TurnState::Settled
        };
        Self { messages, turn }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn turn(&self) -> TurnState {
        self.turn
    }

    /// Whether a turn is open (the loading indicator).
    pub fn is_streaming(&self) -> bool {
        matches!(self.turn, TurnState::StreamingAssistant { .. })
    }

    /// The assistant reply of the open turn, if any content arrived.
    pub fn reply(&self) -> Option<&Message> {
        match self.turn {
            TurnState::StreamingAssistant {
                reply: Some(idx), ..
            } => self.messages.get(idx),
            _ => None,
        }
    }

    /// Append a user message and open a turn.
    pub fn begin_turn(&mut self, content: impl Into<String>) -> Result<(), ChatError> {
        if self.is_streaming() {
            return Err(ChatError::TurnInProgress);
        }
        let checkpoint = self.messages.len();
        self.messages.push(Message::user(content));
        self.turn = TurnState::StreamingAssistant {
            checkpoint,
            reply: None,
        };
        Ok(())
    }

    /// Mirror the pending assistant content into the reply slot.
    ///
    /// The reply is created on the first call with non-empty content and
    /// rewritten in place afterwards. Returns the reply.
    pub fn set_reply(&mut self, content: &str) -> Result<&Message, ChatError> {
        let TurnState::StreamingAssistant { checkpoint, reply } = self.turn else {
            return Err(ChatError::NoOpenTurn);
        };

        let idx = match reply {
            Some(idx) => {
                self.messages[idx].content.clear();
                self.messages[idx].content.push_str(content);
                idx
            }
            None => {
                self.messages.push(Message::assistant(content));
                let idx = self.messages.len() - 1;
                self.turn = TurnState::StreamingAssistant {
                    checkpoint,
                    reply: Some(idx),
                };
                idx
            }
        };
        Ok(&self.messages[idx])
    }

    /// Close the open turn, keeping everything it produced.
    pub fn settle(&mut self) {
        if self.is_streaming() {
            self.turn = TurnState::Settled;
        }
    }

    /// Remove the open turn entirely: the user message and any partial
    /// reply. The conversation returns to its length before the turn.
    pub fn rollback(&mut self) {
        if let TurnState::StreamingAssistant { checkpoint, .. } = self.turn {
            self.messages.truncate(checkpoint);
            self.turn = if self.messages.is_empty() {
                TurnState::AwaitingUser
            } else {
                TurnState::Settled
            };
        }
    }
}

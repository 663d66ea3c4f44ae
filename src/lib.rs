// Copyright 2026 The Chatstream Project
// SPDX-License-Identifier: Apache-2.0

pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod notify;
pub mod session;
pub mod stream;

pub use client::{ChatClient, HttpSender, ReqwestHttpSender};
pub use error::{ChatError, FailureKind, StartFailure};
pub use message::{Conversation, Message, Role, TurnState};
pub use notify::{Notification, Notifier};
pub use session::{ChatSession, SendOutcome};

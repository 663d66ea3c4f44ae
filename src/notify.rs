// Copyright 2026 The Chatstream Project
// SPDX-License-Identifier: Apache-2.0

// User-facing notifications
//
// Failed sends produce one notification. How it is presented is up to the
// embedding application.

use std::sync::Mutex;

use crate::error::FailureKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: FailureKind,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn new(kind: FailureKind, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Receives notifications for failed sends.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far, oldest first.
    pub fn notifications(&self) -> Vec<Notification> {
        match self.seen.lock() {
            Ok(seen) => seen.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        match self.seen.lock() {
            Ok(mut seen) => seen.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use kemi_model::{Message, Role};
use kemi_tools::Workspace;
use tokio::sync::Mutex;
use uuid::Uuid;

/// One conversation session: the message history plus the shared workspace
/// (plan, artifacts, documents, scratch files).
///
/// A session is an explicit object with a `new`/`reset` lifecycle — nothing
/// here is process-global, so multiple sessions can coexist.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub messages: Vec<Message>,
    workspace: Arc<Mutex<Workspace>>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            messages: Vec::new(),
            workspace: Arc::new(Mutex::new(Workspace::new())),
        }
    }

    /// Shared handle to the workspace, given to tools at registration time.
    pub fn workspace(&self) -> Arc<Mutex<Workspace>> {
        self.workspace.clone()
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    /// Clear the session for reuse: fresh id, empty history, empty workspace.
    pub async fn reset(&mut self) {
        self.id = Uuid::new_v4().to_string();
        self.messages.clear();
        self.workspace.lock().await.reset();
    }

    /// Render the non-system history as plain text, for the synthesis tiers.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                let who = match m.role {
                    Role::User => "User",
                    Role::Assistant => "Assistant",
                    Role::System => unreachable!(),
                };
                format!("{who}: {}", m.content)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

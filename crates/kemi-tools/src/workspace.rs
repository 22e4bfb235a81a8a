// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Shared session state mutated by tools and read by the driver.
//!
//! A [`Workspace`] holds the current plan, the append-only artifact and
//! document stores, a small virtual file system used as inter-step scratch
//! memory, and the findings accumulated from sub-agent delegations.  It sits
//! behind one async mutex and is never locked across a completion-service
//! await, so all mutation is effectively single-writer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    /// Rank in the pending → in-progress → completed progression.
    fn rank(self) -> u8 {
        match self {
            TodoStatus::Pending => 0,
            TodoStatus::InProgress => 1,
            TodoStatus::Completed => 2,
        }
    }
}

/// One item of the execution plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TodoStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Plan,
    Research,
    Notes,
    Document,
    Code,
    File,
}

impl ArtifactKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "plan" => Some(Self::Plan),
            "research" => Some(Self::Research),
            "notes" => Some(Self::Notes),
            "document" => Some(Self::Document),
            "code" => Some(Self::Code),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

/// A durable work product.  Append-only: after creation only the
/// `updated_at` timestamp may change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub kind: ArtifactKind,
    pub title: String,
    pub content: String,
    pub producing_agent: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: Value,
}

/// The terminal, user-facing output of a research session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<String>>,
}

/// Summary returned by one sub-agent delegation, recorded for synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub agent: String,
    pub task: String,
    pub summary: String,
}

/// Events emitted by tools to communicate state changes back to the driver,
/// which translates them into broadcast task events.
#[derive(Debug)]
pub enum ToolEvent {
    TodoUpdate(Vec<TodoItem>),
    ArtifactCreated { id: String, title: String, kind: ArtifactKind },
    DocumentFinalized { id: String, title: String },
}

#[derive(Debug, Default)]
pub struct Workspace {
    todos: Vec<TodoItem>,
    artifacts: Vec<Artifact>,
    documents: Vec<FinalDocument>,
    /// Virtual file system: path → content, unique keys, deterministic order.
    files: BTreeMap<String, String>,
    findings: Vec<Finding>,
    delegations: usize,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear everything.  Used by the session lifecycle between runs.
    pub fn reset(&mut self) {
        self.todos.clear();
        self.artifacts.clear();
        self.documents.clear();
        self.files.clear();
        self.findings.clear();
        self.delegations = 0;
    }

    // ── Plan ──────────────────────────────────────────────────────────────────

    /// Replace the whole plan.  No merging: the previous plan is discarded.
    /// Items keep their given order; a duplicate id keeps the first occurrence.
    pub fn replace_todos(&mut self, items: Vec<TodoItem>) {
        let mut seen = std::collections::HashSet::new();
        self.todos = items.into_iter().filter(|t| seen.insert(t.id.clone())).collect();
    }

    pub fn todos(&self) -> &[TodoItem] {
        &self.todos
    }

    /// First pending item in creation order, if any.
    pub fn next_pending(&self) -> Option<TodoItem> {
        self.todos.iter().find(|t| t.status == TodoStatus::Pending).cloned()
    }

    /// Advance one item's status.  Transitions are monotonic: an item never
    /// moves backwards, so a completed item stays completed.  Returns whether
    /// the status actually changed.
    pub fn set_todo_status(&mut self, id: &str, status: TodoStatus) -> bool {
        match self.todos.iter_mut().find(|t| t.id == id) {
            Some(item) if status.rank() > item.status.rank() => {
                item.status = status;
                true
            }
            _ => false,
        }
    }

    /// (completed, total) counts for progress reporting.
    pub fn plan_progress(&self) -> (usize, usize) {
        let done = self.todos.iter().filter(|t| t.status == TodoStatus::Completed).count();
        (done, self.todos.len())
    }

    // ── Artifacts ─────────────────────────────────────────────────────────────

    pub fn add_artifact(
        &mut self,
        kind: ArtifactKind,
        title: impl Into<String>,
        content: impl Into<String>,
        producing_agent: impl Into<String>,
        metadata: Value,
    ) -> String {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        self.artifacts.push(Artifact {
            id: id.clone(),
            kind,
            title: title.into(),
            content: content.into(),
            producing_agent: producing_agent.into(),
            created_at: now,
            updated_at: now,
            metadata,
        });
        id
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Refresh an artifact's `updated_at`.  Content is immutable.
    pub fn touch_artifact(&mut self, id: &str) -> bool {
        match self.artifacts.iter_mut().find(|a| a.id == id) {
            Some(a) => {
                a.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    // ── Final documents ───────────────────────────────────────────────────────

    pub fn add_document(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
        format: impl Into<String>,
        sections: Option<Vec<String>>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        self.documents.push(FinalDocument {
            id: id.clone(),
            title: title.into(),
            content: content.into(),
            format: format.into(),
            sections,
        });
        id
    }

    pub fn documents(&self) -> &[FinalDocument] {
        &self.documents
    }

    pub fn has_documents(&self) -> bool {
        !self.documents.is_empty()
    }

    // ── Virtual files ─────────────────────────────────────────────────────────

    pub fn write_file(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn read_file(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn list_files(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }

    // ── Delegations ───────────────────────────────────────────────────────────

    pub fn record_delegation(&mut self, finding: Finding) {
        self.delegations += 1;
        self.findings.push(finding);
    }

    pub fn delegation_count(&self) -> usize {
        self.delegations
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

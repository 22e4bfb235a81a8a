// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Progress events and their synchronous broadcast bus.
//!
//! Events are ephemeral: they are handed to every subscriber in registration
//! order at the moment of emission and never buffered, so a subscriber added
//! after an event was emitted does not see it.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskEventKind {
    TaskStart,
    TaskUpdate,
    TaskComplete,
    TaskError,
    StepStart,
    StepComplete,
    ToolCall,
    ToolResult,
    Thinking,
    Writing,
    Searching,
    DocumentReady,
    ArtifactCreated,
    StepStream,
}

/// One progress event, tagged with the correlation id of the top-level task
/// it belongs to.  Nested work (sub-agent tool calls) carries the parent's
/// id so observers can render it under one logical task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEvent {
    pub kind: TaskEventKind,
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl TaskEvent {
    pub fn new(kind: TaskEventKind, task_id: impl Into<String>) -> Self {
        Self {
            kind,
            task_id: task_id.into(),
            title: None,
            message: None,
            status: None,
            progress: None,
            data: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Flavor event emitted alongside `tool-call` for tools whose activity the
/// observer renders specially: lookups and searches as "searching", document
/// and artifact production as "writing".
pub(crate) fn activity_event_kind(tool: &str) -> Option<TaskEventKind> {
    if tool.contains("search") || tool.starts_with("lookup_") || tool.starts_with("fetch") {
        Some(TaskEventKind::Searching)
    } else if matches!(tool, "finalize_document" | "create_artifact" | "write_file") {
        Some(TaskEventKind::Writing)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberId(u64);

type Callback = Arc<dyn Fn(&TaskEvent) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscribers: Vec<(u64, Callback)>,
}

/// Synchronous pub/sub fan-out of [`TaskEvent`]s.
///
/// `emit` invokes every subscriber inline, in registration order.  The
/// subscriber list is snapshotted before the callbacks run, so a callback may
/// subscribe or unsubscribe without deadlocking the bus.
#[derive(Default)]
pub struct EventBus {
    inner: Mutex<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: impl Fn(&TaskEvent) + Send + Sync + 'static) -> SubscriberId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, Arc::new(callback)));
        SubscriberId(id)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut inner = self.inner.lock().unwrap();
        inner.subscribers.retain(|(sid, _)| *sid != id.0);
    }

    pub fn emit(&self, event: TaskEvent) {
        let callbacks: Vec<Callback> = {
            let inner = self.inner.lock().unwrap();
            inner.subscribers.iter().map(|(_, cb)| cb.clone()).collect()
        };
        for cb in callbacks {
            cb(&event);
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn ev(kind: TaskEventKind) -> TaskEvent {
        TaskEvent::new(kind, "task-1")
    }

    #[test]
    fn subscriber_receives_emitted_event() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        bus.subscribe(move |e| seen2.lock().unwrap().push(e.kind));
        bus.emit(ev(TaskEventKind::TaskStart));
        assert_eq!(*seen.lock().unwrap(), vec![TaskEventKind::TaskStart]);
    }

    #[test]
    fn fan_out_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            bus.subscribe(move |_| order.lock().unwrap().push(tag));
        }
        bus.emit(ev(TaskEventKind::Thinking));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn late_subscriber_misses_earlier_events() {
        let bus = EventBus::new();
        bus.emit(ev(TaskEventKind::TaskStart));
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        bus.subscribe(move |_| {
            count2.fetch_add(1, Ordering::SeqCst);
        });
        bus.emit(ev(TaskEventKind::TaskComplete));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let id = bus.subscribe(move |_| {
            count2.fetch_add(1, Ordering::SeqCst);
        });
        bus.emit(ev(TaskEventKind::Thinking));
        bus.unsubscribe(id);
        bus.emit(ev(TaskEventKind::Thinking));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscribing_from_a_callback_does_not_deadlock() {
        let bus = Arc::new(EventBus::new());
        let bus2 = bus.clone();
        bus.subscribe(move |_| {
            bus2.subscribe(|_| {});
        });
        bus.emit(ev(TaskEventKind::TaskStart));
    }

    #[test]
    fn event_serialises_with_kebab_case_kind() {
        let e = ev(TaskEventKind::DocumentReady).title("Report");
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"document-ready\""));
        assert!(json.contains("\"Report\""));
    }

    #[test]
    fn optional_fields_are_omitted_when_absent() {
        let json = serde_json::to_string(&ev(TaskEventKind::Thinking)).unwrap();
        assert!(!json.contains("title"));
        assert!(!json.contains("progress"));
    }

    #[test]
    fn activity_kind_classifies_tools() {
        assert_eq!(activity_event_kind("web_search"), Some(TaskEventKind::Searching));
        assert_eq!(activity_event_kind("lookup_molecule"), Some(TaskEventKind::Searching));
        assert_eq!(activity_event_kind("finalize_document"), Some(TaskEventKind::Writing));
        assert_eq!(activity_event_kind("task"), None);
    }

    #[test]
    fn step_stream_round_trips() {
        let e = ev(TaskEventKind::StepStream).message("chunk");
        let json = serde_json::to_string(&e).unwrap();
        let back: TaskEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, TaskEventKind::StepStream);
        assert_eq!(back.message.as_deref(), Some("chunk"));
    }
}

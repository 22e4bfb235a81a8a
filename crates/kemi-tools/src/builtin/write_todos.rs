// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::tool::{error_envelope, success_envelope, Tool, ToolCall};
use crate::workspace::{TodoItem, TodoStatus, ToolEvent, Workspace};

pub struct WriteTodosTool {
    workspace: Arc<Mutex<Workspace>>,
    event_tx: mpsc::Sender<ToolEvent>,
}

impl WriteTodosTool {
    pub fn new(workspace: Arc<Mutex<Workspace>>, event_tx: mpsc::Sender<ToolEvent>) -> Self {
        Self { workspace, event_tx }
    }
}

#[async_trait]
impl Tool for WriteTodosTool {
    fn name(&self) -> &str {
        "write_todos"
    }

    fn description(&self) -> &str {
        "Create or replace the research plan for the current session.\n\n\
         Each call replaces the ENTIRE plan (not a merge/patch). Provide every \
         item you still want, in execution order. Each item needs a unique id \
         and a short actionable title; an optional description adds detail. \
         New items start as pending — the engine advances their status as it \
         works through the plan, so do not set statuses yourself.\n\n\
         Use a plan for multi-step research (3+ distinct steps); skip it for \
         single-step questions."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "todos": {
                    "type": "array",
                    "description": "Full plan, replaces the existing one",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "description": "Unique identifier" },
                            "title": { "type": "string", "description": "Short actionable title" },
                            "description": { "type": "string", "description": "Optional detail" }
                        },
                        "required": ["id", "title"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["todos"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, call: &ToolCall) -> anyhow::Result<String> {
        let todos_value = match call.params.get("todos").and_then(|v| v.as_array()) {
            Some(arr) => arr.clone(),
            None => return Ok(error_envelope("missing 'todos' array")),
        };

        let mut items: Vec<TodoItem> = Vec::new();
        for item in &todos_value {
            let id = match item.get("id").and_then(|v| v.as_str()) {
                Some(s) => s.to_string(),
                None => return Ok(error_envelope("todo item missing 'id'")),
            };
            let title = match item.get("title").and_then(|v| v.as_str()) {
                Some(s) => s.to_string(),
                None => return Ok(error_envelope(format!("todo '{id}' missing 'title'"))),
            };
            let description = item
                .get("description")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            items.push(TodoItem { id, title, description, status: TodoStatus::Pending });
        }

        debug!(count = items.len(), "write_todos tool");

        let stored = {
            let mut ws = self.workspace.lock().await;
            ws.replace_todos(items);
            ws.todos().to_vec()
        };
        let count = stored.len();
        let _ = self.event_tx.send(ToolEvent::TodoUpdate(stored)).await;

        Ok(success_envelope(json!({ "count": count })))
    }
}

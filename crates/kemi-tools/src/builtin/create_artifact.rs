// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};

use crate::tool::{error_envelope, success_envelope, Tool, ToolCall};
use crate::workspace::{ArtifactKind, ToolEvent, Workspace};

pub struct CreateArtifactTool {
    workspace: Arc<Mutex<Workspace>>,
    event_tx: mpsc::Sender<ToolEvent>,
    agent_label: String,
}

impl CreateArtifactTool {
    pub fn new(
        workspace: Arc<Mutex<Workspace>>,
        event_tx: mpsc::Sender<ToolEvent>,
        agent_label: impl Into<String>,
    ) -> Self {
        Self { workspace, event_tx, agent_label: agent_label.into() }
    }
}

#[async_trait]
impl Tool for CreateArtifactTool {
    fn name(&self) -> &str {
        "create_artifact"
    }

    fn description(&self) -> &str {
        "Record a durable work product (research notes, a plan, a code \
         snippet, a draft section) so it survives the conversation and can \
         feed into the final document. Artifacts are append-only: create a \
         new one rather than rewriting an old one."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "type": {
                    "type": "string",
                    "enum": ["plan", "research", "notes", "document", "code", "file"],
                    "description": "Kind of work product"
                },
                "title": { "type": "string" },
                "content": { "type": "string" },
                "metadata": { "type": "object", "description": "Optional extra fields" }
            },
            "required": ["type", "title", "content"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, call: &ToolCall) -> anyhow::Result<String> {
        let kind_str = call.params.get("type").and_then(|v| v.as_str()).unwrap_or_default();
        let Some(kind) = ArtifactKind::parse(kind_str) else {
            return Ok(error_envelope(format!("unknown artifact type '{kind_str}'")));
        };
        let Some(title) = call.params.get("title").and_then(|v| v.as_str()) else {
            return Ok(error_envelope("missing 'title'"));
        };
        let Some(content) = call.params.get("content").and_then(|v| v.as_str()) else {
            return Ok(error_envelope("missing 'content'"));
        };
        let metadata = call.params.get("metadata").cloned().unwrap_or_else(|| json!({}));

        let id = {
            let mut ws = self.workspace.lock().await;
            ws.add_artifact(kind, title, content, &self.agent_label, metadata)
        };
        let _ = self
            .event_tx
            .send(ToolEvent::ArtifactCreated { id: id.clone(), title: title.to_string(), kind })
            .await;

        Ok(success_envelope(json!({ "artifact_id": id })))
    }
}

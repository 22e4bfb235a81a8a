// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};

use crate::sanitize::sanitize_response;
use crate::tool::{error_envelope, success_envelope, Tool, ToolCall};
use crate::workspace::{ToolEvent, Workspace};

pub struct FinalizeDocumentTool {
    workspace: Arc<Mutex<Workspace>>,
    event_tx: mpsc::Sender<ToolEvent>,
}

impl FinalizeDocumentTool {
    pub fn new(workspace: Arc<Mutex<Workspace>>, event_tx: mpsc::Sender<ToolEvent>) -> Self {
        Self { workspace, event_tx }
    }
}

#[async_trait]
impl Tool for FinalizeDocumentTool {
    fn name(&self) -> &str {
        "finalize_document"
    }

    fn description(&self) -> &str {
        "Store the final research document for this session. Call exactly \
         once, after the research is complete, with the full document body in \
         markdown. Structure it with a summary, an introduction, themed \
         sections, key findings, and references where available."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "content": { "type": "string", "description": "Full document body" },
                "format": { "type": "string", "description": "Defaults to markdown" },
                "sections": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Optional ordered section titles"
                }
            },
            "required": ["title", "content"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, call: &ToolCall) -> anyhow::Result<String> {
        let Some(title) = call.params.get("title").and_then(|v| v.as_str()) else {
            return Ok(error_envelope("missing 'title'"));
        };
        let Some(content) = call.params.get("content").and_then(|v| v.as_str()) else {
            return Ok(error_envelope("missing 'content'"));
        };
        let format = call.params.get("format").and_then(|v| v.as_str()).unwrap_or("markdown");
        let sections: Option<Vec<String>> = call.params.get("sections").and_then(|v| {
            v.as_array().map(|arr| {
                arr.iter().filter_map(|s| s.as_str().map(str::to_string)).collect()
            })
        });

        // All document content passes through sanitization before storage.
        let clean = sanitize_response(content);
        if clean.is_empty() {
            return Ok(error_envelope("document content is empty after sanitization"));
        }

        let id = {
            let mut ws = self.workspace.lock().await;
            ws.add_document(title, clean, format, sections)
        };
        let _ = self
            .event_tx
            .send(ToolEvent::DocumentFinalized { id: id.clone(), title: title.to_string() })
            .await;

        Ok(success_envelope(json!({ "document_id": id })))
    }
}

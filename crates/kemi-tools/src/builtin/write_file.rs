// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::tool::{error_envelope, success_envelope, Tool, ToolCall};
use crate::workspace::Workspace;

/// Write to the session's virtual file system — scratch memory that carries
/// intermediate results between plan steps and sub-agents.
pub struct WriteFileTool {
    workspace: Arc<Mutex<Workspace>>,
}

impl WriteFileTool {
    pub fn new(workspace: Arc<Mutex<Workspace>>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Save text to a named scratch file in the session workspace. \
         Overwrites any previous content at the same path. Use this to pass \
         intermediate results between steps."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "content": { "type": "string" }
            },
            "required": ["path", "content"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, call: &ToolCall) -> anyhow::Result<String> {
        let Some(path) = call.params.get("path").and_then(|v| v.as_str()) else {
            return Ok(error_envelope("missing 'path'"));
        };
        let Some(content) = call.params.get("content").and_then(|v| v.as_str()) else {
            return Ok(error_envelope("missing 'content'"));
        };

        let bytes = content.len();
        self.workspace.lock().await.write_file(path, content);
        Ok(success_envelope(json!({ "path": path, "bytes": bytes })))
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::tool::{error_envelope, success_envelope, Tool, ToolCall};
use crate::workspace::Workspace;

pub struct ReadFileTool {
    workspace: Arc<Mutex<Workspace>>,
}

impl ReadFileTool {
    pub fn new(workspace: Arc<Mutex<Workspace>>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a scratch file previously saved with write_file. Omit 'path' to \
         list the available files instead."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to read; omit to list files" }
            },
            "additionalProperties": false
        })
    }

    async fn execute(&self, call: &ToolCall) -> anyhow::Result<String> {
        let ws = self.workspace.lock().await;
        match call.params.get("path").and_then(|v| v.as_str()) {
            Some(path) => match ws.read_file(path) {
                Some(content) => Ok(success_envelope(json!({ "path": path, "content": content }))),
                None => Ok(error_envelope(format!("file '{path}' not found"))),
            },
            None => Ok(success_envelope(json!({ "files": ws.list_files() }))),
        }
    }
}

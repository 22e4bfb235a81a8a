// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};

use crate::chart::parse_series;
use crate::tool::{error_envelope, success_envelope, Tool, ToolCall};
use crate::workspace::{ArtifactKind, ToolEvent, Workspace};

/// Turn loosely formatted label/value text into a chart specification and
/// record it as a `file` artifact.  Rendering the spec to an image is an
/// external collaborator's job.
pub struct GenerateChartTool {
    workspace: Arc<Mutex<Workspace>>,
    event_tx: mpsc::Sender<ToolEvent>,
    agent_label: String,
}

impl GenerateChartTool {
    pub fn new(
        workspace: Arc<Mutex<Workspace>>,
        event_tx: mpsc::Sender<ToolEvent>,
        agent_label: impl Into<String>,
    ) -> Self {
        Self { workspace, event_tx, agent_label: agent_label.into() }
    }
}

#[async_trait]
impl Tool for GenerateChartTool {
    fn name(&self) -> &str {
        "generate_chart"
    }

    fn description(&self) -> &str {
        "Build a bar-chart specification from labelled numeric data. 'data' \
         is free text like \"Product A 120, Product B 85\" — pairs separated \
         by commas, semicolons, or newlines, each ending in a number. The \
         parsed series preserves input order."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "data": { "type": "string", "description": "Label/value pairs" }
            },
            "required": ["data"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, call: &ToolCall) -> anyhow::Result<String> {
        let Some(data) = call.params.get("data").and_then(|v| v.as_str()) else {
            return Ok(error_envelope("missing 'data'"));
        };
        let title = call.params.get("title").and_then(|v| v.as_str()).unwrap_or("Chart");

        let series = parse_series(data);
        if series.is_empty() {
            return Ok(error_envelope("no labelled numeric values found in 'data'"));
        }

        let spec = json!({
            "type": "bar",
            "title": title,
            "series": series,
        });

        let id = {
            let mut ws = self.workspace.lock().await;
            ws.add_artifact(ArtifactKind::File, title, spec.to_string(), &self.agent_label, json!({
                "points": series.len(),
            }))
        };
        let _ = self
            .event_tx
            .send(ToolEvent::ArtifactCreated {
                id: id.clone(),
                title: title.to_string(),
                kind: ArtifactKind::File,
            })
            .await;

        Ok(success_envelope(json!({ "artifact_id": id, "chart": spec })))
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod create_artifact;
mod finalize_document;
mod generate_chart;
mod read_file;
mod write_file;
mod write_todos;

pub use create_artifact::CreateArtifactTool;
pub use finalize_document::FinalizeDocumentTool;
pub use generate_chart::GenerateChartTool;
pub use read_file::ReadFileTool;
pub use write_file::WriteFileTool;
pub use write_todos::WriteTodosTool;

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::registry::ToolRegistry;
use crate::workspace::{ToolEvent, Workspace};

/// Build a registry holding every built-in engine tool, all sharing the same
/// workspace and event channel.  `agent_label` is recorded as the producing
/// agent on artifacts ("main" for the top-level driver, the sub-agent name
/// inside a delegation).
pub fn standard_registry(
    workspace: Arc<Mutex<Workspace>>,
    event_tx: mpsc::Sender<ToolEvent>,
    agent_label: &str,
) -> ToolRegistry {
    let mut reg = ToolRegistry::new();
    reg.register(WriteTodosTool::new(workspace.clone(), event_tx.clone()));
    reg.register(CreateArtifactTool::new(workspace.clone(), event_tx.clone(), agent_label));
    reg.register(FinalizeDocumentTool::new(workspace.clone(), event_tx.clone()));
    reg.register(WriteFileTool::new(workspace.clone()));
    reg.register(ReadFileTool::new(workspace.clone()));
    reg.register(GenerateChartTool::new(workspace, event_tx, agent_label));
    reg
}

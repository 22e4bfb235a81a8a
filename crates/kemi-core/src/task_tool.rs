use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use kemi_config::AgentConfig;
use kemi_model::ModelProvider;
use kemi_tools::tool::{error_envelope, success_envelope};
use kemi_tools::{standard_registry, Finding, Tool, ToolCall, ToolEvent, Workspace};

use crate::error::EngineError;
use crate::events::EventBus;
use crate::executor::SubAgentExecutor;
use crate::subagent::SubAgentRegistry;

/// The `task` tool: delegate a focused sub-task to a named sub-agent.
///
/// Each invocation builds a fresh tool registry for the delegation (sharing
/// the session workspace, with the `task` tool itself deliberately absent so
/// delegations cannot nest) and runs the sub-agent executor over it.
pub struct TaskTool {
    model: Arc<dyn ModelProvider>,
    subagents: Arc<SubAgentRegistry>,
    workspace: Arc<Mutex<Workspace>>,
    event_tx: mpsc::Sender<ToolEvent>,
    bus: Arc<EventBus>,
    config: Arc<AgentConfig>,
}

impl TaskTool {
    pub fn new(
        model: Arc<dyn ModelProvider>,
        subagents: Arc<SubAgentRegistry>,
        workspace: Arc<Mutex<Workspace>>,
        event_tx: mpsc::Sender<ToolEvent>,
        bus: Arc<EventBus>,
        config: Arc<AgentConfig>,
    ) -> Self {
        Self { model, subagents, workspace, event_tx, bus, config }
    }
}

#[async_trait]
impl Tool for TaskTool {
    fn name(&self) -> &str {
        "task"
    }

    fn description(&self) -> &str {
        "Delegate a focused sub-task to a specialized sub-agent and receive \
         its summary. The sub-agent works in an isolated conversation with \
         its own restricted tool set; its intermediate steps never enter this \
         conversation. Use 'general-purpose' when no listed persona fits. \
         Delegations cannot nest."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "subagent": {
                    "type": "string",
                    "description": "Name of the sub-agent persona"
                },
                "task": {
                    "type": "string",
                    "description": "What the sub-agent should do"
                }
            },
            "required": ["subagent", "task"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, call: &ToolCall) -> anyhow::Result<String> {
        let Some(subagent) = call.params.get("subagent").and_then(|v| v.as_str()) else {
            return Ok(error_envelope("missing 'subagent'"));
        };
        let Some(task) = call.params.get("task").and_then(|v| v.as_str()) else {
            return Ok(error_envelope("missing 'task'"));
        };

        debug!(subagent, "task: spawning sub-agent");

        // Fresh registry per delegation; the task tool is intentionally not
        // registered here, which limits nesting to one level.
        let tools = Arc::new(standard_registry(
            self.workspace.clone(),
            self.event_tx.clone(),
            subagent,
        ));
        let executor = SubAgentExecutor::new(
            self.model.clone(),
            tools,
            self.subagents.clone(),
            self.bus.clone(),
            self.config.clone(),
        );

        match executor.run(subagent, task, &call.task_id).await {
            Ok(summary) => {
                self.workspace.lock().await.record_delegation(Finding {
                    agent: subagent.to_string(),
                    task: task.to_string(),
                    summary: summary.clone(),
                });
                Ok(success_envelope(json!({ "subagent": subagent, "summary": summary })))
            }
            // Recoverable: the model sees a structured failure and the turn
            // continues.
            Err(e @ EngineError::SubAgentNotFound(_)) => Ok(error_envelope(e.to_string())),
            Err(EngineError::Completion(e)) => {
                Ok(error_envelope(format!("delegation failed: {e}")))
            }
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use kemi_model::ScriptedMockProvider;
    use serde_json::json;

    use super::*;

    fn make_tool(model: ScriptedMockProvider) -> (TaskTool, Arc<Mutex<Workspace>>) {
        let workspace = Arc::new(Mutex::new(Workspace::new()));
        let (tx, _rx) = mpsc::channel(64);
        let tool = TaskTool::new(
            Arc::new(model),
            Arc::new(SubAgentRegistry::builtin()),
            workspace.clone(),
            tx,
            Arc::new(EventBus::new()),
            Arc::new(AgentConfig::default()),
        );
        (tool, workspace)
    }

    fn call(params: Value) -> ToolCall {
        ToolCall::new("task", params, "task-1")
    }

    #[tokio::test]
    async fn delegation_records_finding_and_returns_summary() {
        let (tool, ws) = make_tool(ScriptedMockProvider::always_text("two routes found"));
        let out = tool
            .execute(&call(json!({
                "subagent": "literature-researcher",
                "task": "survey aspirin synthesis routes"
            })))
            .await
            .unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["summary"], "two routes found");

        let locked = ws.lock().await;
        assert_eq!(locked.delegation_count(), 1);
        assert_eq!(locked.findings()[0].agent, "literature-researcher");
        assert_eq!(locked.findings()[0].task, "survey aspirin synthesis routes");
    }

    #[tokio::test]
    async fn unknown_subagent_returns_not_found_envelope() {
        let (tool, ws) = make_tool(ScriptedMockProvider::always_text("x"));
        let out = tool
            .execute(&call(json!({ "subagent": "mystery-agent", "task": "t" })))
            .await
            .unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["success"], false);
        assert!(v["error"].as_str().unwrap().contains("not found"));
        // A failed delegation is not recorded.
        assert_eq!(ws.lock().await.delegation_count(), 0);
    }

    #[tokio::test]
    async fn missing_params_are_error_envelopes() {
        let (tool, _ws) = make_tool(ScriptedMockProvider::always_text("x"));
        for params in [json!({}), json!({ "subagent": "document-writer" })] {
            let out = tool.execute(&call(params)).await.unwrap();
            let v: Value = serde_json::from_str(&out).unwrap();
            assert_eq!(v["success"], false);
        }
    }
}

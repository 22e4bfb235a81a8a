// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Arc;

use crate::tool::{error_envelope, Tool, ToolCall, ToolOutput};

/// A tool schema — name, description, and parameter shape, as rendered into
/// the system prompt so the model knows what it may call.
#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Central registry holding all available tools.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Produce schemas for all registered tools, sorted by name.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .values()
            .map(|t| ToolSchema {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Dispatch one call.  An unknown tool name and a tool that returns `Err`
    /// both produce a structured error envelope — dispatch itself never fails,
    /// so one bad call can never abort the rest of a turn.
    pub async fn execute(&self, call: &ToolCall) -> ToolOutput {
        match self.tools.get(&call.name) {
            Some(tool) => match tool.execute(call).await {
                Ok(content) => ToolOutput::ok(content),
                Err(e) => {
                    tracing::warn!(tool = %call.name, error = %e, "tool execution failed");
                    ToolOutput { content: error_envelope(e.to_string()), is_error: true }
                }
            },
            None => ToolOutput {
                content: error_envelope(format!("tool '{}' is not available", call.name)),
                is_error: true,
            },
        }
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;
    use crate::tool::{success_envelope, Tool, ToolCall};

    /// Minimal no-op tool for registry tests.
    struct EchoTool {
        name: &'static str,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn parameters_schema(&self) -> Value {
            json!({ "type": "object" })
        }
        async fn execute(&self, call: &ToolCall) -> anyhow::Result<String> {
            Ok(success_envelope(json!({ "echo": call.params })))
        }
    }

    /// A tool whose execute always returns `Err`.
    struct ThrowingTool;

    #[async_trait]
    impl Tool for ThrowingTool {
        fn name(&self) -> &str {
            "throwing"
        }
        fn description(&self) -> &str {
            "always fails"
        }
        fn parameters_schema(&self) -> Value {
            json!({ "type": "object" })
        }
        async fn execute(&self, _call: &ToolCall) -> anyhow::Result<String> {
            anyhow::bail!("x")
        }
    }

    fn call(name: &str) -> ToolCall {
        ToolCall::new(name, json!({}), "task-1")
    }

    #[test]
    fn register_and_get() {
        let mut reg = ToolRegistry::new();
        reg.register(EchoTool { name: "echo" });
        assert!(reg.get("echo").is_some());
    }

    #[test]
    fn get_unknown_returns_none() {
        let reg = ToolRegistry::new();
        assert!(reg.get("nope").is_none());
    }

    #[test]
    fn names_are_sorted() {
        let mut reg = ToolRegistry::new();
        reg.register(EchoTool { name: "b" });
        reg.register(EchoTool { name: "a" });
        assert_eq!(reg.names(), vec!["a", "b"]);
    }

    #[test]
    fn schemas_include_description() {
        let mut reg = ToolRegistry::new();
        reg.register(EchoTool { name: "t" });
        let schemas = reg.schemas();
        assert_eq!(schemas[0].description, "echoes its input");
    }

    #[tokio::test]
    async fn execute_known_tool_succeeds() {
        let mut reg = ToolRegistry::new();
        reg.register(EchoTool { name: "echo" });
        let out = reg.execute(&call("echo")).await;
        assert!(!out.is_error);
        let v: Value = serde_json::from_str(&out.content).unwrap();
        assert_eq!(v["success"], true);
    }

    #[tokio::test]
    async fn execute_unknown_tool_returns_error_envelope() {
        let reg = ToolRegistry::new();
        let out = reg.execute(&call("missing")).await;
        assert!(out.is_error);
        let v: Value = serde_json::from_str(&out.content).unwrap();
        assert_eq!(v["success"], false);
        assert!(v["error"].as_str().unwrap().contains("not available"));
    }

    #[tokio::test]
    async fn thrown_error_becomes_envelope_and_later_calls_run() {
        let mut reg = ToolRegistry::new();
        reg.register(ThrowingTool);
        reg.register(EchoTool { name: "echo" });

        let bad = reg.execute(&call("throwing")).await;
        assert!(bad.is_error);
        let v: Value = serde_json::from_str(&bad.content).unwrap();
        assert_eq!(v["error"], "x");

        // The registry is unaffected — the next call in the batch still runs.
        let good = reg.execute(&call("echo")).await;
        assert!(!good.is_error);
    }

    #[test]
    fn registering_same_name_twice_overwrites() {
        let mut reg = ToolRegistry::new();
        reg.register(EchoTool { name: "t" });
        reg.register(EchoTool { name: "t" });
        assert_eq!(reg.names().len(), 1);
    }
}

use async_trait::async_trait;
use serde_json::Value;

/// A single tool invocation extracted from model output.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub name: String,
    /// Parsed JSON parameters
    pub params: Value,
    /// Correlation id of the top-level task this call belongs to.  Threaded
    /// through dispatch so nested work (delegations) can tag its progress
    /// events with the parent task.
    pub task_id: String,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, params: Value, task_id: impl Into<String>) -> Self {
        Self { name: name.into(), params, task_id: task_id.into() }
    }
}

/// The result of dispatching a tool call.
///
/// `content` is always a JSON status envelope `{"success": bool, ...}` —
/// either the tool's own return value or the error envelope the registry
/// builds when the tool failed or does not exist.  `is_error` marks results
/// the registry had to synthesize.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn ok(content: impl Into<String>) -> Self {
        Self { content: content.into(), is_error: false }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        let envelope = serde_json::json!({ "success": false, "error": msg.into() });
        Self { content: envelope.to_string(), is_error: true }
    }
}

/// Trait that every built-in and user-defined tool must implement.
///
/// `execute` returns the JSON status envelope as a string.  Errors should be
/// reported *inside* the envelope (`{"success":false,"error":…}`); returning
/// `Err` is also safe — the registry converts it to an error envelope and the
/// turn continues — but it marks the result as a dispatch failure.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema for parameters
    fn parameters_schema(&self) -> Value;
    /// Execute the tool.
    async fn execute(&self, call: &ToolCall) -> anyhow::Result<String>;
}

/// Build a success envelope from extra key/value pairs.
pub fn success_envelope(extra: Value) -> String {
    let mut obj = serde_json::Map::new();
    obj.insert("success".into(), Value::Bool(true));
    if let Value::Object(map) = extra {
        for (k, v) in map {
            obj.insert(k, v);
        }
    }
    Value::Object(obj).to_string()
}

/// Build an error envelope with the given message.
pub fn error_envelope(msg: impl Into<String>) -> String {
    serde_json::json!({ "success": false, "error": msg.into() }).to_string()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

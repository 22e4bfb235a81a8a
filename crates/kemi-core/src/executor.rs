// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The sub-agent executor: one delegated task, run to completion in an
//! isolated nested conversation.
//!
//! Isolation invariant: the nested conversation is seeded only with the
//! sub-agent's system prompt, its tool subset, and the task text — never the
//! parent's history.  The parent receives a single cleaned summary string;
//! the sub-agent's own tool calls and reflections stay internal, visible only
//! as progress events tagged with the parent's correlation id.

use std::sync::Arc;

use kemi_config::AgentConfig;
use kemi_model::{collect_stream, CompletionRequest, Message, ModelProvider};
use kemi_tools::{ToolCall, ToolRegistry, ToolSchema};
use tracing::debug;

use crate::error::EngineError;
use crate::events::{activity_event_kind, EventBus, TaskEvent, TaskEventKind};
use crate::parser::{parse_tool_calls, strip_tool_calls};
use crate::prompts::subagent_prompt;
use crate::subagent::{SubAgentDefinition, SubAgentRegistry, GENERAL_AGENT};

const NO_SUMMARY_PLACEHOLDER: &str =
    "The subagent completed the task but returned no summary.";

/// Clip a tool result to the configured character cap before it is fed back
/// into a conversation.
pub(crate) fn clip_result(text: &str, cap: usize) -> String {
    if cap == 0 || text.len() <= cap {
        return text.to_string();
    }
    let mut end = cap;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n[... result truncated ...]", &text[..end])
}

pub struct SubAgentExecutor {
    model: Arc<dyn ModelProvider>,
    tools: Arc<ToolRegistry>,
    subagents: Arc<SubAgentRegistry>,
    bus: Arc<EventBus>,
    config: Arc<AgentConfig>,
}

impl SubAgentExecutor {
    pub fn new(
        model: Arc<dyn ModelProvider>,
        tools: Arc<ToolRegistry>,
        subagents: Arc<SubAgentRegistry>,
        bus: Arc<EventBus>,
        config: Arc<AgentConfig>,
    ) -> Self {
        Self { model, tools, subagents, bus, config }
    }

    /// Resolve `name`, falling back to a synthesized all-tools definition for
    /// the documented generic name.
    fn resolve(&self, name: &str) -> Result<Arc<SubAgentDefinition>, EngineError> {
        if let Some(def) = self.subagents.get(name) {
            return Ok(def);
        }
        if name == GENERAL_AGENT {
            let mut def = SubAgentDefinition::new(
                GENERAL_AGENT,
                "Generic fallback persona with access to every registered tool",
                "You are a capable research assistant. Complete the task with \
                 the tools available and report a concise summary.",
                [],
            );
            def.tool_names = self.tools.names().into_iter().collect();
            return Ok(Arc::new(def));
        }
        Err(EngineError::SubAgentNotFound(name.to_string()))
    }

    /// Run one delegation to completion and return its summary.
    ///
    /// The returned string is never empty.  Unknown sub-agent names are the
    /// only error the caller must translate; everything below (rejected
    /// tools, malformed blocks, failing tools) is recovered in the loop.
    pub async fn run(
        &self,
        name: &str,
        task: &str,
        correlation_id: &str,
    ) -> Result<String, EngineError> {
        let def = self.resolve(name)?;

        self.bus.emit(
            TaskEvent::new(TaskEventKind::StepStart, correlation_id)
                .title(name.to_string())
                .message(task.chars().take(120).collect::<String>()),
        );

        // Only the subset both allowed and actually registered is rendered;
        // a call to an allowed-but-unregistered name still fails per-call
        // with a structured envelope.
        let schemas: Vec<ToolSchema> = self
            .tools
            .schemas()
            .into_iter()
            .filter(|s| def.allows(&s.name))
            .collect();

        // Fresh conversation: the parent history is deliberately excluded.
        let mut messages = vec![
            Message::system(subagent_prompt(&def, &schemas)),
            Message::user(task),
        ];

        let mut last_text = String::new();
        let mut rounds = 0u32;

        loop {
            rounds += 1;
            if rounds > self.config.subagent_max_rounds {
                debug!(subagent = name, "delegation hit round cap");
                break;
            }

            let req = CompletionRequest {
                messages: messages.clone(),
                stream: true,
                ..Default::default()
            };
            let stream = match self.model.complete(req).await {
                Ok(s) => s,
                Err(e) => {
                    self.bus.emit(
                        TaskEvent::new(TaskEventKind::StepComplete, correlation_id)
                            .title(name.to_string())
                            .status("failed"),
                    );
                    return Err(EngineError::Completion(e));
                }
            };

            let bus = self.bus.clone();
            let cid = correlation_id.to_string();
            let (text, _) = collect_stream(stream, move |delta| {
                bus.emit(TaskEvent::new(TaskEventKind::StepStream, &cid).message(delta));
            })
            .await
            .map_err(EngineError::Completion)?;

            messages.push(Message::assistant(&text));
            last_text = text;

            let calls = parse_tool_calls(&last_text);
            if calls.is_empty() {
                break;
            }

            let mut results = String::from("Tool results:\n");
            for inv in calls {
                self.bus.emit(
                    TaskEvent::new(TaskEventKind::ToolCall, correlation_id)
                        .title(inv.name.clone())
                        .data(inv.params.clone()),
                );
                if let Some(kind) = activity_event_kind(&inv.name) {
                    self.bus.emit(TaskEvent::new(kind, correlation_id).title(inv.name.clone()));
                }

                // Per-call subset enforcement: a rejected call reports back
                // to the model without aborting the rest of the turn.
                let output = if !def.allows(&inv.name) {
                    kemi_tools::ToolOutput::err(format!(
                        "tool '{}' is not available to this subagent",
                        inv.name
                    ))
                } else {
                    let call = ToolCall::new(&inv.name, inv.params, correlation_id);
                    self.tools.execute(&call).await
                };

                self.bus.emit(
                    TaskEvent::new(TaskEventKind::ToolResult, correlation_id)
                        .title(inv.name.clone())
                        .status(if output.is_error { "error" } else { "ok" }),
                );

                results.push_str(&format!(
                    "### {}\n{}\n\n",
                    inv.name,
                    clip_result(&output.content, self.config.tool_result_char_cap)
                ));
            }
            results.push_str("Continue the task with these results.");
            messages.push(Message::user(results));
        }

        // The parent never sees residual call syntax.
        let cleaned = strip_tool_calls(&last_text);
        let summary = if cleaned.is_empty() {
            NO_SUMMARY_PLACEHOLDER.to_string()
        } else {
            cleaned
        };

        self.bus.emit(
            TaskEvent::new(TaskEventKind::StepComplete, correlation_id)
                .title(name.to_string())
                .status("completed"),
        );

        Ok(summary)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

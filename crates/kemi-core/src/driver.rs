// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The top-level conversation driver.
//!
//! One user message runs through: dispatch loop (complete → parse → execute
//! → feed back, capped), plan auto-continuation (one dispatch-loop pass per
//! pending todo, capped), and the synthesis gate that guarantees a final
//! document whenever delegations happened.  A failed tool, todo, or
//! delegation never aborts the session; only a completion-service failure on
//! the opening turn surfaces to the user, as an apology plus a `task-error`
//! event, and even then the session stays usable.

use std::sync::Arc;

use anyhow::Context;
use kemi_config::AgentConfig;
use kemi_model::{collect_stream, CompletionRequest, Message, ModelProvider};
use kemi_tools::{standard_registry, ToolCall, ToolEvent, ToolRegistry, TodoStatus, Workspace};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::events::{activity_event_kind, EventBus, TaskEvent, TaskEventKind};
use crate::executor::clip_result;
use crate::parser::{parse_tool_calls, strip_tool_calls};
use crate::prompts::{continuation_prompt, system_prompt};
use crate::session::Session;
use crate::subagent::SubAgentRegistry;
use crate::synthesis::{SynthesisContext, SynthesisPipeline};
use crate::task_tool::TaskTool;

const APOLOGY: &str = "I'm sorry — I couldn't reach the completion service. \
                       Nothing was lost; please send your message again.";

pub struct Driver {
    session: Session,
    model: Arc<dyn ModelProvider>,
    tools: Arc<ToolRegistry>,
    subagents: Arc<SubAgentRegistry>,
    workspace: Arc<Mutex<Workspace>>,
    config: Arc<AgentConfig>,
    bus: Arc<EventBus>,
    /// Sender handed to every stateful tool; also cloned into delegation
    /// registries so nested tool events reach the same drain.
    tool_event_tx: mpsc::Sender<ToolEvent>,
    tool_event_rx: mpsc::Receiver<ToolEvent>,
}

impl Driver {
    pub fn new(model: Arc<dyn ModelProvider>, config: Arc<AgentConfig>, bus: Arc<EventBus>) -> Self {
        Self::new_with_tools(model, config, bus, |_| {})
    }

    /// Like [`Driver::new`], with a hook to register extra tools (domain
    /// collaborators, test doubles) before the registry is frozen.
    pub fn new_with_tools(
        model: Arc<dyn ModelProvider>,
        config: Arc<AgentConfig>,
        bus: Arc<EventBus>,
        customize: impl FnOnce(&mut ToolRegistry),
    ) -> Self {
        let session = Session::new();
        let workspace = session.workspace();
        let subagents = Arc::new(SubAgentRegistry::builtin());
        let (tool_event_tx, tool_event_rx) = mpsc::channel::<ToolEvent>(256);

        let mut tools = standard_registry(workspace.clone(), tool_event_tx.clone(), "main");
        tools.register(TaskTool::new(
            model.clone(),
            subagents.clone(),
            workspace.clone(),
            tool_event_tx.clone(),
            bus.clone(),
            config.clone(),
        ));
        customize(&mut tools);

        Self {
            session,
            model,
            tools: Arc::new(tools),
            subagents,
            workspace,
            config,
            bus,
            tool_event_tx,
            tool_event_rx,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn workspace(&self) -> Arc<Mutex<Workspace>> {
        self.workspace.clone()
    }

    /// Clear the session for a fresh run (new id, empty history and
    /// workspace).  The registries stay as built.
    pub async fn reset(&mut self) {
        self.session.reset().await;
    }

    /// Process one user message to completion and return the reply text.
    pub async fn process_message(&mut self, user_input: &str) -> anyhow::Result<String> {
        let task_id = Uuid::new_v4().to_string();
        self.bus.emit(
            TaskEvent::new(TaskEventKind::TaskStart, &task_id)
                .title(user_input.chars().take(80).collect::<String>()),
        );

        if self.session.messages.is_empty() {
            let prompt = system_prompt(
                self.config.system_prompt.as_deref(),
                &self.tools.schemas(),
                &self.subagents.descriptions(),
            );
            self.session.push(Message::system(prompt));
        }
        self.session.push(Message::user(user_input));

        let reply = match self.run_dispatch_loop(&task_id).await {
            Ok(text) => text,
            Err(e) => {
                // Terminal for this turn only: report and keep the session
                // usable for the next message.
                warn!("first dispatch pass failed: {e:#}");
                self.bus.emit(
                    TaskEvent::new(TaskEventKind::TaskError, &task_id).message(e.to_string()),
                );
                self.session.push(Message::assistant(APOLOGY));
                self.bus.emit(
                    TaskEvent::new(TaskEventKind::TaskComplete, &task_id).status("failed"),
                );
                return Ok(APOLOGY.to_string());
            }
        };

        self.continue_plan(&task_id).await;
        self.ensure_final_document(user_input, &task_id).await;

        self.bus
            .emit(TaskEvent::new(TaskEventKind::TaskComplete, &task_id).status("completed"));

        if reply.is_empty() {
            // Every visible reply was tool syntax; point the user at the
            // produced documents instead of returning nothing.
            let ws = self.workspace.lock().await;
            if let Some(doc) = ws.documents().last() {
                return Ok(format!("The research is complete — see \"{}\".", doc.title));
            }
            return Ok("Done.".to_string());
        }
        Ok(reply)
    }

    /// One dispatch-loop pass: complete → parse → execute → feed back, until
    /// a reply has no calls or the round cap is reached.  Returns the last
    /// reply with call syntax stripped.
    async fn run_dispatch_loop(&mut self, task_id: &str) -> anyhow::Result<String> {
        let mut final_text = String::new();
        let mut rounds = 0u32;

        loop {
            rounds += 1;
            if rounds > self.config.max_tool_rounds {
                debug!(rounds, "dispatch loop hit round cap");
                break;
            }

            self.bus.emit(TaskEvent::new(TaskEventKind::Thinking, task_id));

            let req = CompletionRequest {
                messages: self.session.messages.clone(),
                stream: true,
                ..Default::default()
            };
            let stream = self
                .model
                .complete(req)
                .await
                .context("model completion failed")?;

            let bus = self.bus.clone();
            let tid = task_id.to_string();
            let (text, _) = collect_stream(stream, move |delta| {
                bus.emit(TaskEvent::new(TaskEventKind::StepStream, &tid).message(delta));
            })
            .await?;

            self.session.push(Message::assistant(&text));
            final_text = strip_tool_calls(&text);

            let calls = parse_tool_calls(&text);
            if calls.is_empty() {
                break;
            }

            // The prompting convention invites "parallel" blocks; execution
            // is sequential in parsed order, which keeps every downstream
            // ordering deterministic.
            let mut results = String::from("Tool results:\n");
            for inv in calls {
                self.bus.emit(
                    TaskEvent::new(TaskEventKind::ToolCall, task_id)
                        .title(inv.name.clone())
                        .data(inv.params.clone()),
                );
                if let Some(kind) = activity_event_kind(&inv.name) {
                    self.bus.emit(TaskEvent::new(kind, task_id).title(inv.name.clone()));
                }

                let call = ToolCall::new(&inv.name, inv.params, task_id);
                let output = self.tools.execute(&call).await;
                self.drain_tool_events(task_id);

                self.bus.emit(
                    TaskEvent::new(TaskEventKind::ToolResult, task_id)
                        .title(inv.name.clone())
                        .status(if output.is_error { "error" } else { "ok" }),
                );

                results.push_str(&format!(
                    "### {}\n{}\n\n",
                    inv.name,
                    clip_result(&output.content, self.config.tool_result_char_cap)
                ));
            }
            results.push_str("Continue with the task using these results.");
            self.session.push(Message::user(results));
        }

        Ok(final_text)
    }

    /// Walk pending todos in creation order, one dispatch-loop pass each.
    /// This loop is the only writer of todo status, and it only moves
    /// forward: pending → in-progress → completed.
    async fn continue_plan(&mut self, task_id: &str) {
        let mut iterations = 0u32;

        loop {
            iterations += 1;
            if iterations > self.config.plan_iteration_cap {
                warn!("plan continuation hit iteration cap");
                break;
            }

            let todo = { self.workspace.lock().await.next_pending() };
            let Some(todo) = todo else { break };

            let (done, total) = {
                let mut ws = self.workspace.lock().await;
                ws.set_todo_status(&todo.id, TodoStatus::InProgress);
                ws.plan_progress()
            };
            self.bus.emit(
                TaskEvent::new(TaskEventKind::StepStart, task_id)
                    .title(todo.title.clone())
                    .progress(percent(done, total)),
            );

            self.session.push(Message::user(continuation_prompt(&todo)));
            if let Err(e) = self.run_dispatch_loop(task_id).await {
                // One todo failing must not abort the plan: report inline
                // and move on to the remaining steps.
                warn!(todo = %todo.id, "plan step failed: {e:#}");
                let note = format!(
                    "I hit a problem while working on \"{}\" ({e}). \
                     Continuing with the remaining steps.",
                    todo.title
                );
                self.session.push(Message::assistant(&note));
                self.bus.emit(
                    TaskEvent::new(TaskEventKind::TaskUpdate, task_id)
                        .message(note)
                        .status("error"),
                );
            }

            let (done, total) = {
                let mut ws = self.workspace.lock().await;
                ws.set_todo_status(&todo.id, TodoStatus::Completed);
                ws.plan_progress()
            };
            self.bus.emit(
                TaskEvent::new(TaskEventKind::StepComplete, task_id)
                    .title(todo.title.clone())
                    .status("completed")
                    .progress(percent(done, total)),
            );
        }
    }

    /// The pipeline invariant: research happened (≥1 delegation) and no
    /// document exists → the fallback chain produces one.
    async fn ensure_final_document(&mut self, user_input: &str, task_id: &str) {
        let (needs_document, findings) = {
            let ws = self.workspace.lock().await;
            (
                ws.delegation_count() > 0 && !ws.has_documents(),
                ws.findings().to_vec(),
            )
        };
        if !needs_document {
            return;
        }

        debug!("no document after research; running synthesis pipeline");
        let ctx = SynthesisContext {
            topic: user_input.chars().take(60).collect::<String>(),
            findings,
            transcript: self.session.transcript(),
        };
        let pipeline = SynthesisPipeline::new(
            self.model.clone(),
            self.subagents.clone(),
            self.workspace.clone(),
            self.tool_event_tx.clone(),
            self.bus.clone(),
            self.config.clone(),
        );
        pipeline.ensure_document(&ctx, task_id).await;
        self.drain_tool_events(task_id);
    }

    /// Translate pending tool events (todo updates, artifact and document
    /// notifications) into broadcast task events.
    fn drain_tool_events(&mut self, task_id: &str) {
        while let Ok(te) = self.tool_event_rx.try_recv() {
            match te {
                ToolEvent::TodoUpdate(todos) => {
                    self.bus.emit(
                        TaskEvent::new(TaskEventKind::TaskUpdate, task_id)
                            .message(format!("plan updated: {} step(s)", todos.len()))
                            .data(serde_json::to_value(&todos).unwrap_or_default()),
                    );
                }
                ToolEvent::ArtifactCreated { id, title, kind } => {
                    self.bus.emit(
                        TaskEvent::new(TaskEventKind::ArtifactCreated, task_id)
                            .title(title)
                            .data(serde_json::json!({ "id": id, "kind": kind })),
                    );
                }
                ToolEvent::DocumentFinalized { id, title } => {
                    self.bus.emit(
                        TaskEvent::new(TaskEventKind::DocumentReady, task_id)
                            .title(title)
                            .data(serde_json::json!({ "id": id })),
                    );
                }
            }
        }
    }
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done * 100) / total).min(100) as u8
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn percent_is_bounded() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 2), 50);
        assert_eq!(percent(2, 2), 100);
        assert_eq!(percent(5, 2), 100);
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Document synthesis: the ordered fallback chain that guarantees a final
//! document exists for every research-bearing session.
//!
//! Tier 1 asks the document-writer persona to synthesize and finalize the
//! document itself.  Tier 2 assembles one deterministically from recorded
//! findings and transcript segments, with no completion call.  Tier 3 wraps
//! the sanitized transcript verbatim — it cannot fail, which is what closes
//! the invariant.

use std::sync::Arc;

use async_trait::async_trait;
use kemi_config::AgentConfig;
use kemi_model::ModelProvider;
use kemi_tools::sanitize::sanitize_response;
use kemi_tools::{standard_registry, Finding, ToolEvent, Workspace};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::events::EventBus;
use crate::executor::SubAgentExecutor;
use crate::prompts::synthesis_prompt;
use crate::subagent::SubAgentRegistry;

/// Minimum length for a transcript paragraph to count as a findings segment.
const MIN_SEGMENT_LEN: usize = 200;
/// Minimum length for a recorded delegation summary to be worth a section.
const MIN_FINDING_LEN: usize = 40;

pub(crate) struct SynthesisContext {
    /// Short topic seed for generated titles (first user message, truncated).
    pub topic: String,
    pub findings: Vec<Finding>,
    pub transcript: String,
}

#[async_trait]
trait SynthesisTier: Send + Sync {
    fn name(&self) -> &str;
    /// Try to produce a document.  Returns `true` when a document exists in
    /// the workspace afterwards.
    async fn attempt(&self, ctx: &SynthesisContext, correlation_id: &str) -> bool;
}

// ─── Tier 1: the synthesizer persona ─────────────────────────────────────────

struct SynthesizerTier {
    model: Arc<dyn ModelProvider>,
    subagents: Arc<SubAgentRegistry>,
    workspace: Arc<Mutex<Workspace>>,
    event_tx: mpsc::Sender<ToolEvent>,
    bus: Arc<EventBus>,
    config: Arc<AgentConfig>,
}

#[async_trait]
impl SynthesisTier for SynthesizerTier {
    fn name(&self) -> &str {
        "synthesizer"
    }

    async fn attempt(&self, ctx: &SynthesisContext, correlation_id: &str) -> bool {
        let tools = Arc::new(standard_registry(
            self.workspace.clone(),
            self.event_tx.clone(),
            "document-writer",
        ));
        let executor = SubAgentExecutor::new(
            self.model.clone(),
            tools,
            self.subagents.clone(),
            self.bus.clone(),
            self.config.clone(),
        );
        if let Err(e) = executor
            .run("document-writer", &synthesis_prompt(&ctx.findings), correlation_id)
            .await
        {
            warn!("synthesizer tier failed: {e}");
        }
        // Success is defined by the side effect, not the summary: the persona
        // is expected to have called finalize_document.
        self.workspace.lock().await.has_documents()
    }
}

// ─── Tier 2: deterministic extraction ────────────────────────────────────────

struct ExtractionTier {
    workspace: Arc<Mutex<Workspace>>,
    event_tx: mpsc::Sender<ToolEvent>,
}

/// Pull recognizable findings segments out of the session: recorded
/// delegation summaries first, then long assistant paragraphs from the
/// transcript.
fn extract_segments(ctx: &SynthesisContext) -> Vec<(String, String)> {
    let mut segments: Vec<(String, String)> = ctx
        .findings
        .iter()
        .filter(|f| f.summary.len() >= MIN_FINDING_LEN)
        .map(|f| (format!("Findings from {}", f.agent), f.summary.clone()))
        .collect();

    if segments.is_empty() {
        for para in ctx.transcript.split("\n\n") {
            if let Some(body) = para.strip_prefix("Assistant: ") {
                let body = body.trim();
                if body.len() >= MIN_SEGMENT_LEN {
                    segments.push(("Session notes".to_string(), body.to_string()));
                }
            }
        }
    }
    segments
}

fn first_sentence(text: &str) -> &str {
    let end = text.find(['.', '\n']).map(|i| i + 1).unwrap_or(text.len());
    text[..end].trim_end()
}

#[async_trait]
impl SynthesisTier for ExtractionTier {
    fn name(&self) -> &str {
        "extraction"
    }

    async fn attempt(&self, ctx: &SynthesisContext, _correlation_id: &str) -> bool {
        let segments = extract_segments(ctx);
        if segments.is_empty() {
            return false;
        }

        let title = format!("Research Synthesis: {}", ctx.topic);
        let mut body = String::new();
        body.push_str(&format!("# {title}\n\n"));
        body.push_str(&format!(
            "## Summary\n\nThis document was assembled from {} recorded research \
             segment(s) of the session.\n\n",
            segments.len()
        ));
        body.push_str(&format!(
            "## Introduction\n\nThe session investigated: {}.\n\n",
            ctx.topic
        ));
        for (heading, content) in &segments {
            body.push_str(&format!("## {heading}\n\n{content}\n\n"));
        }
        body.push_str("## Key Findings\n\n");
        for (_, content) in &segments {
            body.push_str(&format!("- {}\n", first_sentence(content)));
        }
        body.push_str("\n## References\n\n");
        let mut ws = self.workspace.lock().await;
        if ws.artifacts().is_empty() {
            body.push_str("No artifacts were recorded in this session.\n");
        } else {
            let lines: Vec<String> = ws
                .artifacts()
                .iter()
                .map(|a| format!("- {} ({})", a.title, a.producing_agent))
                .collect();
            body.push_str(&lines.join("\n"));
            body.push('\n');
        }

        let sections: Vec<String> = segments.iter().map(|(h, _)| h.clone()).collect();
        let id = ws.add_document(title.clone(), sanitize_response(&body), "markdown", Some(sections));
        let _ = self.event_tx.try_send(ToolEvent::DocumentFinalized { id, title });
        true
    }
}

// ─── Tier 3: verbatim transcript ─────────────────────────────────────────────

struct TranscriptTier {
    workspace: Arc<Mutex<Workspace>>,
    event_tx: mpsc::Sender<ToolEvent>,
}

#[async_trait]
impl SynthesisTier for TranscriptTier {
    fn name(&self) -> &str {
        "transcript"
    }

    async fn attempt(&self, ctx: &SynthesisContext, _correlation_id: &str) -> bool {
        let title = format!("Research Session Notes: {}", ctx.topic);
        let content = sanitize_response(&ctx.transcript);
        let content = if content.is_empty() {
            "The session produced no recoverable content.".to_string()
        } else {
            content
        };
        let id = self
            .workspace
            .lock()
            .await
            .add_document(title.clone(), content, "markdown", None);
        let _ = self.event_tx.try_send(ToolEvent::DocumentFinalized { id, title });
        true
    }
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

pub(crate) struct SynthesisPipeline {
    workspace: Arc<Mutex<Workspace>>,
    tiers: Vec<Box<dyn SynthesisTier>>,
}

impl SynthesisPipeline {
    pub fn new(
        model: Arc<dyn ModelProvider>,
        subagents: Arc<SubAgentRegistry>,
        workspace: Arc<Mutex<Workspace>>,
        event_tx: mpsc::Sender<ToolEvent>,
        bus: Arc<EventBus>,
        config: Arc<AgentConfig>,
    ) -> Self {
        let tiers: Vec<Box<dyn SynthesisTier>> = vec![
            Box::new(SynthesizerTier {
                model,
                subagents,
                workspace: workspace.clone(),
                event_tx: event_tx.clone(),
                bus,
                config,
            }),
            Box::new(ExtractionTier {
                workspace: workspace.clone(),
                event_tx: event_tx.clone(),
            }),
            Box::new(TranscriptTier { workspace: workspace.clone(), event_tx }),
        ];
        Self { workspace, tiers }
    }

    /// Run the fallback chain until a document exists.  Tier 3 cannot fail,
    /// so a document always exists on return.  Every document creation path
    /// notifies through the tool-event channel, which the driver drains into
    /// a `document-ready` broadcast.
    pub async fn ensure_document(&self, ctx: &SynthesisContext, correlation_id: &str) {
        for tier in &self.tiers {
            if self.workspace.lock().await.has_documents() {
                break;
            }
            debug!(tier = tier.name(), "attempting synthesis tier");
            if tier.attempt(ctx, correlation_id).await {
                debug!(tier = tier.name(), "synthesis tier produced a document");
                break;
            }
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use kemi_model::ScriptedMockProvider;

    use super::*;

    fn pipeline(model: ScriptedMockProvider, ws: Arc<Mutex<Workspace>>) -> SynthesisPipeline {
        let (tx, _rx) = mpsc::channel(64);
        SynthesisPipeline::new(
            Arc::new(model),
            Arc::new(SubAgentRegistry::builtin()),
            ws,
            tx,
            Arc::new(EventBus::new()),
            Arc::new(AgentConfig::default()),
        )
    }

    fn ctx_with_findings() -> SynthesisContext {
        SynthesisContext {
            topic: "aspirin synthesis".into(),
            findings: vec![Finding {
                agent: "literature-researcher".into(),
                task: "survey".into(),
                summary: "Two practical routes dominate the literature: esterification \
                          of salicylic acid, and the Kolbe-Schmitt pathway."
                    .into(),
            }],
            transcript: "User: research aspirin\n\nAssistant: working on it".into(),
        }
    }

    #[tokio::test]
    async fn tier1_document_writer_finalizes_itself() {
        // The persona calls finalize_document, so tier 1 succeeds.
        let script = "```tool_call\n{\"tool\": \"finalize_document\", \"params\": \
                      {\"title\": \"Aspirin Review\", \"content\": \"Full review body.\"}}\n```";
        let model = ScriptedMockProvider::new(vec![script.into(), "stored".into()]);
        let ws = Arc::new(Mutex::new(Workspace::new()));
        let p = pipeline(model, ws.clone());

        p.ensure_document(&ctx_with_findings(), "task-1").await;

        let locked = ws.lock().await;
        assert_eq!(locked.documents().len(), 1);
        assert_eq!(locked.documents()[0].title, "Aspirin Review");
    }

    #[tokio::test]
    async fn tier2_assembles_from_findings_when_tier1_does_nothing() {
        // The persona replies without finalizing → tier 2 builds the document.
        let model = ScriptedMockProvider::always_text("I could not write the document.");
        let ws = Arc::new(Mutex::new(Workspace::new()));
        let p = pipeline(model, ws.clone());

        p.ensure_document(&ctx_with_findings(), "task-1").await;

        let locked = ws.lock().await;
        assert_eq!(locked.documents().len(), 1);
        let doc = &locked.documents()[0];
        assert!(doc.title.contains("aspirin synthesis"));
        assert!(doc.content.contains("Findings from literature-researcher"));
        assert!(doc.content.contains("## Key Findings"));
        assert!(doc.sections.is_some());
    }

    #[tokio::test]
    async fn tier3_wraps_transcript_as_last_resort() {
        let model = ScriptedMockProvider::always_text("no finalize call");
        let ws = Arc::new(Mutex::new(Workspace::new()));
        let p = pipeline(model, ws.clone());

        let ctx = SynthesisContext {
            topic: "benzene".into(),
            findings: vec![],
            transcript: "User: hi\n\nAssistant: short".into(),
        };
        p.ensure_document(&ctx, "task-1").await;

        let locked = ws.lock().await;
        assert_eq!(locked.documents().len(), 1);
        assert!(locked.documents()[0].title.contains("Session Notes"));
        assert!(locked.documents()[0].content.contains("short"));
    }

    #[tokio::test]
    async fn pipeline_is_a_noop_when_document_already_exists() {
        let model = ScriptedMockProvider::always_text("unused");
        let ws = Arc::new(Mutex::new(Workspace::new()));
        ws.lock().await.add_document("Existing", "body", "markdown", None);
        let p = pipeline(model, ws.clone());

        p.ensure_document(&ctx_with_findings(), "task-1").await;

        assert_eq!(ws.lock().await.documents().len(), 1);
    }

    #[tokio::test]
    async fn fallback_document_notifies_via_tool_event_channel() {
        let model = ScriptedMockProvider::always_text("nothing");
        let ws = Arc::new(Mutex::new(Workspace::new()));
        let (tx, mut rx) = mpsc::channel(64);

        let p = SynthesisPipeline::new(
            Arc::new(model),
            Arc::new(SubAgentRegistry::builtin()),
            ws,
            tx,
            Arc::new(EventBus::new()),
            Arc::new(AgentConfig::default()),
        );
        p.ensure_document(&ctx_with_findings(), "task-1").await;

        let mut finalized = false;
        while let Ok(ev) = rx.try_recv() {
            if matches!(ev, ToolEvent::DocumentFinalized { .. }) {
                finalized = true;
            }
        }
        assert!(finalized, "tier 2 should announce the document on the channel");
    }

    #[test]
    fn extract_segments_prefers_recorded_findings() {
        let segs = extract_segments(&ctx_with_findings());
        assert_eq!(segs.len(), 1);
        assert!(segs[0].0.contains("literature-researcher"));
    }

    #[test]
    fn extract_segments_falls_back_to_long_assistant_paragraphs() {
        let long = "x".repeat(MIN_SEGMENT_LEN);
        let ctx = SynthesisContext {
            topic: "t".into(),
            findings: vec![],
            transcript: format!("Assistant: {long}\n\nAssistant: short"),
        };
        let segs = extract_segments(&ctx);
        assert_eq!(segs.len(), 1);
    }

    #[test]
    fn extract_segments_ignores_short_findings() {
        let ctx = SynthesisContext {
            topic: "t".into(),
            findings: vec![Finding { agent: "a".into(), task: "t".into(), summary: "tiny".into() }],
            transcript: String::new(),
        };
        assert!(extract_segments(&ctx).is_empty());
    }

    #[test]
    fn first_sentence_stops_at_period_or_newline() {
        assert_eq!(first_sentence("One. Two."), "One.");
        assert_eq!(first_sentence("line\nmore"), "line");
        assert_eq!(first_sentence("no period"), "no period");
    }
}

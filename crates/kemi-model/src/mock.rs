// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;

use crate::{provider::ResponseStream, CompletionRequest, ResponseEvent};

/// Deterministic mock provider for tests.  Echoes the last user message
/// back as the assistant response.
#[derive(Default)]
pub struct MockProvider;

#[async_trait]
impl crate::ModelProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }
    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<ResponseStream> {
        let reply = req
            .messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, crate::Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("[no input]")
            .to_string();

        let events: Vec<anyhow::Result<ResponseEvent>> = vec![
            Ok(ResponseEvent::TextDelta(format!("MOCK: {reply}"))),
            Ok(ResponseEvent::Usage { input_tokens: 10, output_tokens: 10 }),
            Ok(ResponseEvent::Done),
        ];
        Ok(Box::pin(stream::iter(events)))
    }
}

/// A pre-scripted mock provider.  Each call to `complete` pops the next
/// response text from the front of the queue.  This lets tests specify exact
/// responses — including embedded tool-call blocks — without network access.
pub struct ScriptedMockProvider {
    scripts: Arc<Mutex<Vec<String>>>,
    /// Response returned once the queue is exhausted (also used by
    /// [`ScriptedMockProvider::repeat_text`], which starts empty).
    exhausted_reply: String,
    /// Number of `complete()` calls seen so far.
    calls: Arc<Mutex<usize>>,
    /// The last `CompletionRequest` seen by this provider.
    /// Written on each `complete()` call so tests can inspect what was sent.
    pub last_request: Arc<Mutex<Option<CompletionRequest>>>,
}

impl ScriptedMockProvider {
    /// Build a provider from an ordered list of response texts.
    pub fn new(scripts: Vec<String>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts)),
            exhausted_reply: "[no more scripts]".into(),
            calls: Arc::new(Mutex::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Convenience: provider that always returns the same text, forever.
    /// Used to exercise iteration caps.
    pub fn repeat_text(reply: impl Into<String>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(Vec::new())),
            exhausted_reply: reply.into(),
            calls: Arc::new(Mutex::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Convenience: provider that returns a single text reply.
    pub fn always_text(reply: impl Into<String>) -> Self {
        Self::new(vec![reply.into()])
    }

    /// Number of completion calls made against this provider.
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    /// Shared handle to the call counter, for tests that move the provider
    /// into an `Arc<dyn ModelProvider>`.
    pub fn call_counter(&self) -> Arc<Mutex<usize>> {
        self.calls.clone()
    }
}

#[async_trait]
impl crate::ModelProvider for ScriptedMockProvider {
    fn name(&self) -> &str {
        "scripted-mock"
    }
    fn model_name(&self) -> &str {
        "scripted-mock-model"
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<ResponseStream> {
        *self.last_request.lock().unwrap() = Some(req);
        *self.calls.lock().unwrap() += 1;

        let text = {
            let mut scripts = self.scripts.lock().unwrap();
            if scripts.is_empty() {
                self.exhausted_reply.clone()
            } else {
                scripts.remove(0)
            }
        };

        let events: Vec<anyhow::Result<ResponseEvent>> = vec![
            Ok(ResponseEvent::TextDelta(text)),
            Ok(ResponseEvent::Usage { input_tokens: 5, output_tokens: 5 }),
            Ok(ResponseEvent::Done),
        ];
        Ok(Box::pin(stream::iter(events)))
    }
}

/// A provider whose every call fails.  Used to exercise the engine's
/// completion-failure recovery paths.
pub struct FailingMockProvider;

#[async_trait]
impl crate::ModelProvider for FailingMockProvider {
    fn name(&self) -> &str {
        "failing-mock"
    }
    fn model_name(&self) -> &str {
        "failing-mock-model"
    }

    async fn complete(&self, _req: CompletionRequest) -> anyhow::Result<ResponseStream> {
        anyhow::bail!("completion service unreachable")
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;

use crate::{CompletionRequest, ResponseEvent, Usage};

pub type ResponseStream = Pin<Box<dyn Stream<Item = anyhow::Result<ResponseEvent>> + Send>>;

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Human-readable provider name for status display.
    fn name(&self) -> &str;

    /// Model identifier as reported to users.
    fn model_name(&self) -> &str;

    /// Send a completion request and return a streaming response.
    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<ResponseStream>;
}

/// Drain a response stream into the full text, invoking `on_delta` for every
/// chunk as it arrives.
///
/// Stream-level `Error` events are logged and skipped (the provider signalled
/// a recoverable problem); a hard `Err` item aborts and propagates.
pub async fn collect_stream(
    mut stream: ResponseStream,
    mut on_delta: impl FnMut(&str) + Send,
) -> anyhow::Result<(String, Usage)> {
    let mut text = String::new();
    let mut usage = Usage::default();

    while let Some(event) = stream.next().await {
        match event? {
            ResponseEvent::TextDelta(delta) => {
                on_delta(&delta);
                text.push_str(&delta);
            }
            ResponseEvent::Usage { input_tokens, output_tokens } => {
                usage.input_tokens += input_tokens;
                usage.output_tokens += output_tokens;
            }
            ResponseEvent::Done => break,
            ResponseEvent::Error(e) => {
                tracing::warn!("model stream error: {e}");
            }
        }
    }

    Ok((text, usage))
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

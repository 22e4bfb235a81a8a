// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod mock;
mod openai_compat;
mod provider;
mod types;

pub use mock::{FailingMockProvider, MockProvider, ScriptedMockProvider};
pub use provider::{collect_stream, ModelProvider, ResponseStream};
pub use types::{CompletionRequest, Message, ResponseEvent, Role, Usage};

use std::sync::Arc;

use kemi_config::ModelConfig;

/// Build a provider from configuration.
///
/// `provider = "mock"` selects the deterministic echo provider (tests, dry
/// runs); everything else is treated as an OpenAI-compatible endpoint, with
/// `base_url` overriding the default API host.
pub fn from_config(cfg: &ModelConfig) -> anyhow::Result<Arc<dyn ModelProvider>> {
    if cfg.provider == "mock" {
        return Ok(Arc::new(MockProvider));
    }

    let api_key = cfg
        .api_key
        .clone()
        .or_else(|| cfg.api_key_env.as_ref().and_then(|env| std::env::var(env).ok()));

    let base_url = cfg.base_url.as_deref().unwrap_or("https://api.openai.com/v1");

    Ok(Arc::new(openai_compat::OpenAICompatProvider::new(
        cfg.name.clone(),
        api_key,
        base_url,
        cfg.max_tokens,
        cfg.temperature,
    )))
}

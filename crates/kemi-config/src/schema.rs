// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider identifier: "openai" (any OpenAI-compatible endpoint) | "mock"
    pub provider: String,
    /// Model name forwarded to the provider API
    pub name: String,
    /// Environment variable that holds the API key (read at runtime)
    pub api_key_env: Option<String>,
    /// Explicit API key; prefer api_key_env in config files to avoid secrets
    /// in version-controlled files
    pub api_key: Option<String>,
    /// Base URL override.  Useful for local servers, proxies, or gateways.
    pub base_url: Option<String>,
    /// Maximum tokens to request in a single completion
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0–2.0)
    pub temperature: Option<f32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            name: "gpt-4o-mini".into(),
            api_key_env: Some("OPENAI_API_KEY".into()),
            api_key: None,
            base_url: None,
            max_tokens: None,
            temperature: None,
        }
    }
}

fn default_tool_rounds() -> u32 {
    10
}

fn default_subagent_rounds() -> u32 {
    10
}

fn default_plan_cap() -> u32 {
    10
}

fn default_tool_result_cap() -> usize {
    16_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum completion → tool-dispatch rounds per dispatch-loop pass.
    #[serde(default = "default_tool_rounds")]
    pub max_tool_rounds: u32,
    /// Maximum rounds inside one sub-agent delegation.
    #[serde(default = "default_subagent_rounds")]
    pub subagent_max_rounds: u32,
    /// Maximum todos executed by the plan auto-continuation loop per turn.
    #[serde(default = "default_plan_cap")]
    pub plan_iteration_cap: u32,
    /// Character cap applied to a tool result before it is fed back into the
    /// conversation.  Oversized results are clipped with a truncation marker.
    #[serde(default = "default_tool_result_cap")]
    pub tool_result_char_cap: usize,
    /// Replace the built-in system prompt entirely.
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_tool_rounds(),
            subagent_max_rounds: default_subagent_rounds(),
            plan_iteration_cap: default_plan_cap(),
            tool_result_char_cap: default_tool_result_cap(),
            system_prompt: None,
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

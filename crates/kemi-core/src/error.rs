// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

/// Engine-level error taxonomy.
///
/// Most failures in the engine are recovered where they occur (malformed
/// blocks dropped, tool errors enveloped); these variants cover the cases
/// that must cross a component boundary before being handled.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A delegation named a sub-agent that does not exist.  Recoverable: the
    /// `task` tool converts this into an error envelope for the model.
    #[error("subagent '{0}' not found")]
    SubAgentNotFound(String),

    /// The completion service failed.  At the top of the first turn this is
    /// surfaced to the user; inside a plan step it is reported inline and the
    /// plan continues.
    #[error("completion service failed: {0}")]
    Completion(#[source] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_contains_name_and_phrase() {
        let e = EngineError::SubAgentNotFound("mystery-agent".into());
        let msg = e.to_string();
        assert!(msg.contains("mystery-agent"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn completion_error_wraps_source() {
        let e = EngineError::Completion(anyhow::anyhow!("timeout"));
        assert!(e.to_string().contains("timeout"));
    }
}

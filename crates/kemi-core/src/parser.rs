// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Extraction of tool invocations from completion-service text.
//!
//! Two block protocols are recognised: the primary fenced form — a
//! ` ```tool_call ` code fence whose body is a JSON object
//! `{ "tool": "web_search", "params": { "query": "aspirin synthesis" } }` —
//! and the legacy bracket-tag form `[TOOL:web_search]{ "query": … }[/TOOL]`.
//! Matches from both protocols are returned in source order.  A block whose
//! body fails to parse is dropped and logged — a malformed block never aborts
//! the scan, and a text with no well-formed blocks parses to an empty list.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// One tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub params: Value,
}

static FENCED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```tool_call[ \t]*\r?\n(.*?)```").expect("fenced pattern")
});

static LEGACY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[TOOL:([A-Za-z0-9_-]+)\](.*?)\[/TOOL\]").expect("legacy pattern")
});

/// Scan `text` for tool-call blocks of both protocols, in source order.
pub fn parse_tool_calls(text: &str) -> Vec<ToolInvocation> {
    let mut found: Vec<(usize, ToolInvocation)> = Vec::new();

    for caps in FENCED.captures_iter(text) {
        let at = caps.get(0).map(|m| m.start()).unwrap_or(0);
        let body = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        match parse_fenced_body(body) {
            Some(inv) => found.push((at, inv)),
            None => debug!(offset = at, "dropping malformed fenced tool-call block"),
        }
    }

    for caps in LEGACY.captures_iter(text) {
        let at = caps.get(0).map(|m| m.start()).unwrap_or(0);
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let body = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        match parse_legacy_body(name, body) {
            Some(inv) => found.push((at, inv)),
            None => debug!(offset = at, tool = name, "dropping malformed legacy tool-call block"),
        }
    }

    found.sort_by_key(|(at, _)| *at);
    found.into_iter().map(|(_, inv)| inv).collect()
}

/// Fenced body: a JSON object `{"tool": <name>, "params": {…}}`.
/// `params` is optional and defaults to `{}`; when present it must be an object.
fn parse_fenced_body(body: &str) -> Option<ToolInvocation> {
    let v: Value = serde_json::from_str(body.trim()).ok()?;
    let obj = v.as_object()?;
    let name = obj.get("tool")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let params = match obj.get("params") {
        None | Some(Value::Null) => Value::Object(Default::default()),
        Some(p @ Value::Object(_)) => p.clone(),
        Some(_) => return None,
    };
    Some(ToolInvocation { name: name.to_string(), params })
}

/// Legacy body: the JSON params object itself; an empty body means `{}`.
fn parse_legacy_body(name: &str, body: &str) -> Option<ToolInvocation> {
    if name.is_empty() {
        return None;
    }
    let body = body.trim();
    let params = if body.is_empty() {
        Value::Object(Default::default())
    } else {
        let v: Value = serde_json::from_str(body).ok()?;
        if !v.is_object() {
            return None;
        }
        v
    };
    Some(ToolInvocation { name: name.to_string(), params })
}

/// Remove every tool-call block of either protocol from `text`.
///
/// Used to clean sub-agent summaries and user-facing responses of residual
/// call syntax.
pub fn strip_tool_calls(text: &str) -> String {
    let without_fenced = FENCED.replace_all(text, "");
    let without_legacy = LEGACY.replace_all(&without_fenced, "");
    without_legacy.trim().to_string()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fenced(body: &str) -> String {
        format!("```tool_call\n{body}\n```")
    }

    // ── Fenced protocol ───────────────────────────────────────────────────────

    #[test]
    fn parses_single_fenced_call() {
        let text = fenced(r#"{"tool": "web_search", "params": {"query": "caffeine"}}"#);
        let calls = parse_tool_calls(&text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "web_search");
        assert_eq!(calls[0].params["query"], "caffeine");
    }

    #[test]
    fn missing_params_defaults_to_empty_object() {
        let text = fenced(r#"{"tool": "read_file"}"#);
        let calls = parse_tool_calls(&text);
        assert_eq!(calls[0].params, json!({}));
    }

    #[test]
    fn surrounding_prose_is_ignored() {
        let text = format!(
            "Let me look that up.\n\n{}\n\nI'll report back.",
            fenced(r#"{"tool": "lookup_molecule", "params": {"name": "aspirin"}}"#)
        );
        let calls = parse_tool_calls(&text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "lookup_molecule");
    }

    #[test]
    fn multiple_fenced_calls_keep_source_order() {
        let text = format!(
            "{}\nthen\n{}",
            fenced(r#"{"tool": "first"}"#),
            fenced(r#"{"tool": "second"}"#)
        );
        let names: Vec<String> = parse_tool_calls(&text).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn duplicate_tool_names_are_all_returned() {
        let text = format!(
            "{}{}",
            fenced(r#"{"tool": "task", "params": {"subagent": "a"}}"#),
            fenced(r#"{"tool": "task", "params": {"subagent": "b"}}"#)
        );
        let calls = parse_tool_calls(&text);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].params["subagent"], "a");
        assert_eq!(calls[1].params["subagent"], "b");
    }

    // ── Legacy protocol ───────────────────────────────────────────────────────

    #[test]
    fn parses_legacy_block() {
        let text = r#"[TOOL:generate_chart]{"data": "A 1, B 2"}[/TOOL]"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "generate_chart");
        assert_eq!(calls[0].params["data"], "A 1, B 2");
    }

    #[test]
    fn legacy_empty_body_means_empty_params() {
        let calls = parse_tool_calls("[TOOL:read_file][/TOOL]");
        assert_eq!(calls[0].params, json!({}));
    }

    #[test]
    fn protocols_interleave_in_source_order() {
        let text = format!(
            "{}\nmiddle\n[TOOL:second][/TOOL]\n{}",
            fenced(r#"{"tool": "first"}"#),
            fenced(r#"{"tool": "third"}"#)
        );
        let names: Vec<String> = parse_tool_calls(&text).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    // ── Malformed input ───────────────────────────────────────────────────────

    #[test]
    fn no_blocks_parses_to_empty_list() {
        assert!(parse_tool_calls("").is_empty());
        assert!(parse_tool_calls("just prose, no calls").is_empty());
        assert!(parse_tool_calls("```rust\nfn main() {}\n```").is_empty());
    }

    #[test]
    fn malformed_json_block_is_dropped() {
        let text = fenced(r#"{"tool": "web_search", "params": {broken"#);
        assert!(parse_tool_calls(&text).is_empty());
    }

    #[test]
    fn block_without_tool_key_is_dropped() {
        let text = fenced(r#"{"params": {"query": "x"}}"#);
        assert!(parse_tool_calls(&text).is_empty());
    }

    #[test]
    fn empty_tool_name_is_dropped() {
        let text = fenced(r#"{"tool": "", "params": {}}"#);
        assert!(parse_tool_calls(&text).is_empty());
    }

    #[test]
    fn non_object_params_is_dropped() {
        let text = fenced(r#"{"tool": "t", "params": [1, 2]}"#);
        assert!(parse_tool_calls(&text).is_empty());
    }

    #[test]
    fn non_object_body_is_dropped() {
        let text = fenced(r#""just a string""#);
        assert!(parse_tool_calls(&text).is_empty());
    }

    #[test]
    fn legacy_non_object_body_is_dropped() {
        assert!(parse_tool_calls("[TOOL:t]42[/TOOL]").is_empty());
        assert!(parse_tool_calls("[TOOL:t]not json[/TOOL]").is_empty());
    }

    #[test]
    fn unterminated_fence_is_not_a_block() {
        let text = "```tool_call\n{\"tool\": \"x\"}";
        assert!(parse_tool_calls(text).is_empty());
    }

    #[test]
    fn unterminated_legacy_tag_is_not_a_block() {
        assert!(parse_tool_calls(r#"[TOOL:x]{"a":1}"#).is_empty());
    }

    #[test]
    fn malformed_blocks_do_not_abort_the_scan() {
        let text = format!(
            "{}\n{}\n{}",
            fenced(r#"{"tool": "good_one"}"#),
            fenced(r#"{"tool": broken}"#),
            fenced(r#"{"tool": "good_two"}"#)
        );
        let names: Vec<String> = parse_tool_calls(&text).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["good_one", "good_two"]);
    }

    // ── Stripping ─────────────────────────────────────────────────────────────

    #[test]
    fn strip_removes_both_protocols() {
        let text = format!(
            "Summary first.\n{}\n[TOOL:x]{{}}[/TOOL]\nSummary last.",
            fenced(r#"{"tool": "t"}"#)
        );
        let cleaned = strip_tool_calls(&text);
        assert!(cleaned.contains("Summary first."));
        assert!(cleaned.contains("Summary last."));
        assert!(!cleaned.contains("tool_call"));
        assert!(!cleaned.contains("[TOOL:"));
    }

    #[test]
    fn strip_on_clean_text_is_identity_modulo_trim() {
        assert_eq!(strip_tool_calls("  plain text  "), "plain text");
    }

    #[test]
    fn strip_of_only_blocks_yields_empty() {
        let text = fenced(r#"{"tool": "t"}"#);
        assert_eq!(strip_tool_calls(&text), "");
    }
}

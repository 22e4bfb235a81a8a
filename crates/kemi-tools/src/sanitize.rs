// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Response sanitization: strip internal narration before content is stored
//! as a final document.
//!
//! The pass is a deterministic, ordered sequence of pattern removals followed
//! by blank-line collapsing.  It is pure text-in/text-out and idempotent —
//! re-applying it to already-clean text is a no-op.

use std::sync::LazyLock;

use regex::Regex;

static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Progress narration: "Task 2/5: ..." / "Task 3. ..."
        r"(?m)^\s*Task \d+(?:/\d+)?\s*[.:].*$",
        // Waiting / delegation narration lines
        r"(?m)^\s*I am awaiting\b.*$",
        r"(?m)^\s*I have delegated\b.*$",
        r"(?m)^\s*Delegating (?:this |the )?task\b.*$",
        // Reasoning-tag leakage
        r"(?s)<thinking>.*?</thinking>",
        // Stray fence leftovers: a fence line with a marker but no body until
        // the closing fence, or an unpaired bare fence at line start
        r"(?m)^```(?:tool_call|json)?\s*$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("sanitize pattern"))
    .collect()
});

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank-line pattern"));

/// Apply the sanitization pass.
pub fn sanitize_response(text: &str) -> String {
    let mut out = text.to_string();
    for re in PATTERNS.iter() {
        out = re.replace_all(&out, "").into_owned();
    }
    // Collapse 3+ consecutive newlines (2+ blank lines) down to one blank line.
    out = BLANK_RUNS.replace_all(&out, "\n\n").into_owned();
    out.trim().to_string()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_task_progress_lines() {
        let input = "Task 1/3: searching literature\nReal content stays.";
        let out = sanitize_response(input);
        assert!(!out.contains("Task 1/3"));
        assert!(out.contains("Real content stays."));
    }

    #[test]
    fn removes_awaiting_and_delegation_narration() {
        let input = "I am awaiting the sub-agent results.\nI have delegated the lookup.\nDone.";
        let out = sanitize_response(input);
        assert_eq!(out, "Done.");
    }

    #[test]
    fn removes_thinking_tags_across_lines() {
        let input = "Before.\n<thinking>secret\nplans</thinking>\nAfter.";
        let out = sanitize_response(input);
        assert!(!out.contains("secret"));
        assert!(out.contains("Before."));
        assert!(out.contains("After."));
    }

    #[test]
    fn removes_stray_fences() {
        let input = "text\n```\nmore\n```tool_call\nrest";
        let out = sanitize_response(input);
        assert!(!out.contains("```"));
        assert!(out.contains("more"));
        assert!(out.contains("rest"));
    }

    #[test]
    fn collapses_blank_line_runs() {
        let input = "a\n\n\n\n\nb";
        assert_eq!(sanitize_response(input), "a\n\nb");
    }

    #[test]
    fn preserves_single_blank_lines() {
        let input = "para one\n\npara two";
        assert_eq!(sanitize_response(input), "para one\n\npara two");
    }

    #[test]
    fn idempotent_on_clean_text() {
        let clean = "## Heading\n\nBody text with detail.\n\n- item";
        assert_eq!(sanitize_response(clean), clean);
    }

    #[test]
    fn idempotent_in_general() {
        let inputs = [
            "Task 1/2: x\n\n\n\nI am awaiting results\nreal\n```\n",
            "<thinking>a</thinking>b",
            "",
            "plain",
        ];
        for input in inputs {
            let once = sanitize_response(input);
            let twice = sanitize_response(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(sanitize_response(""), "");
    }
}

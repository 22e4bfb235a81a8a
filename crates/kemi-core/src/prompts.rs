// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! System-prompt assembly for the driver and the sub-agent executor.

use kemi_tools::{Finding, TodoItem, ToolSchema};

use crate::subagent::SubAgentDefinition;

// ─── Guidelines ──────────────────────────────────────────────────────────────

mod guidelines {
    pub fn protocol() -> &'static str {
        "## Calling tools\n\
         To call a tool, emit a fenced block anywhere in your reply:\n\
         ```tool_call\n\
         { \"tool\": \"<name>\", \"params\": { … } }\n\
         ```\n\
         You may emit several blocks in one reply for parallel execution; \
         they run in the order written and you receive every result before \
         your next turn. Text outside the blocks is shown to the user."
    }

    pub fn planning() -> &'static str {
        "## Planning\n\
         For multi-step research, first store a plan with write_todos (3-6 \
         focused steps). The engine walks the plan for you, one step per \
         turn — act on the current step, do not narrate plan status."
    }

    pub fn delegation() -> &'static str {
        "## Delegation\n\
         Delegate focused sub-tasks with the task tool: \
         { \"tool\": \"task\", \"params\": { \"subagent\": \"<name>\", \
         \"task\": \"<what to do>\" } }. Each sub-agent works in isolation \
         and returns only a summary, keeping this conversation small."
    }

    pub fn closing() -> &'static str {
        "## Finishing\n\
         When the research is done, ensure a final document exists: either \
         delegate to document-writer or call finalize_document yourself. \
         Never leave a research session without a document."
    }
}

/// Render tool schemas as a prompt section.
pub fn render_tools(tools: &[ToolSchema]) -> String {
    let mut out = String::from("## Available tools\n");
    for t in tools {
        out.push_str(&format!("- `{}` — {}\n", t.name, t.description));
    }
    out
}

fn render_subagents(subagents: &[(String, String)]) -> String {
    let mut out = String::from("## Available sub-agents\n");
    for (name, desc) in subagents {
        out.push_str(&format!("- `{name}` — {desc}\n"));
    }
    out.push_str("- `general-purpose` — fallback persona with every tool\n");
    out
}

/// The driver's system prompt.  A `custom` override replaces the persona
/// paragraph but the protocol sections are always appended — without them the
/// model cannot reach any tool.
pub fn system_prompt(
    custom: Option<&str>,
    tools: &[ToolSchema],
    subagents: &[(String, String)],
) -> String {
    let persona = custom.unwrap_or(
        "You are Kemi, a research agent for chemistry. You orchestrate \
         research: plan, delegate to sub-agents, collect findings, and \
         deliver a final document. Be precise; verify with tools instead of \
         guessing.",
    );
    [
        persona,
        guidelines::protocol(),
        &render_tools(tools),
        &render_subagents(subagents),
        guidelines::planning(),
        guidelines::delegation(),
        guidelines::closing(),
    ]
    .join("\n\n")
}

/// A sub-agent's system prompt: its persona plus the protocol and its tool
/// subset only.  The parent conversation is deliberately absent.
pub fn subagent_prompt(def: &SubAgentDefinition, tools: &[ToolSchema]) -> String {
    let mut sections = vec![def.system_prompt.clone(), guidelines::protocol().to_string()];
    sections.push(render_tools(tools));
    if let Some(verbosity) = &def.verbosity {
        sections.push(format!("Keep your answers {verbosity}."));
    }
    sections.push(
        "Work autonomously: you cannot ask questions. When you are done, \
         reply with a plain-text summary of what you found or produced — no \
         tool-call blocks in the final reply."
            .to_string(),
    );
    sections.join("\n\n")
}

/// Prompt pushed before executing one plan step.
pub fn continuation_prompt(todo: &TodoItem) -> String {
    let detail = todo
        .description
        .as_deref()
        .map(|d| format!("\nDetails: {d}"))
        .unwrap_or_default();
    format!(
        "Work on the current plan step now: {}{detail}\n\
         Act — call the tools or delegate the work. Do not report status, do \
         not restate the plan, and do not touch other steps.",
        todo.title
    )
}

/// Task text for the document-writer synthesis tier.
pub fn synthesis_prompt(findings: &[Finding]) -> String {
    let mut digest = String::new();
    for (i, f) in findings.iter().enumerate() {
        digest.push_str(&format!(
            "### Finding {} (from {})\nTask: {}\n{}\n\n",
            i + 1,
            f.agent,
            f.task,
            f.summary
        ));
    }
    format!(
        "Write the final research document from the findings below. \
         Structure: summary, introduction, one themed section per line of \
         inquiry, key findings, references. Store it with finalize_document \
         — that call is the deliverable.\n\n{digest}"
    )
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use kemi_tools::TodoStatus;

    use super::*;

    fn schema(name: &str) -> ToolSchema {
        ToolSchema {
            name: name.into(),
            description: format!("{name} description"),
            parameters: serde_json::json!({ "type": "object" }),
        }
    }

    #[test]
    fn system_prompt_lists_tools_and_subagents() {
        let p = system_prompt(
            None,
            &[schema("write_todos")],
            &[("literature-researcher".into(), "searches".into())],
        );
        assert!(p.contains("`write_todos`"));
        assert!(p.contains("`literature-researcher`"));
        assert!(p.contains("general-purpose"));
        assert!(p.contains("```tool_call"));
    }

    #[test]
    fn custom_persona_replaces_default_but_keeps_protocol() {
        let p = system_prompt(Some("You are a terse bot."), &[], &[]);
        assert!(p.starts_with("You are a terse bot."));
        assert!(!p.contains("You are Kemi"));
        assert!(p.contains("```tool_call"));
    }

    #[test]
    fn subagent_prompt_excludes_other_tools() {
        let def = SubAgentDefinition::new("t", "d", "You are focused.", ["a"]);
        let p = subagent_prompt(&def, &[schema("a")]);
        assert!(p.contains("You are focused."));
        assert!(p.contains("`a`"));
        assert!(!p.contains("write_todos"));
    }

    #[test]
    fn continuation_prompt_demands_action() {
        let todo = TodoItem {
            id: "1".into(),
            title: "survey aspirin routes".into(),
            description: Some("focus on green chemistry".into()),
            status: TodoStatus::Pending,
        };
        let p = continuation_prompt(&todo);
        assert!(p.contains("survey aspirin routes"));
        assert!(p.contains("green chemistry"));
        assert!(p.contains("Do not report status"));
    }

    #[test]
    fn synthesis_prompt_embeds_findings_in_order() {
        let findings = vec![
            Finding { agent: "a1".into(), task: "t1".into(), summary: "first result".into() },
            Finding { agent: "a2".into(), task: "t2".into(), summary: "second result".into() },
        ];
        let p = synthesis_prompt(&findings);
        let i1 = p.find("first result").unwrap();
        let i2 = p.find("second result").unwrap();
        assert!(i1 < i2);
        assert!(p.contains("finalize_document"));
    }
}

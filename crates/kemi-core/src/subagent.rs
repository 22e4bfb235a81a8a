// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Name of the generic fallback persona.  Resolvable even when no definition
/// was registered under it: the executor synthesizes one with access to every
/// registered tool.
pub const GENERAL_AGENT: &str = "general-purpose";

/// A named persona with its own system prompt and restricted tool subset.
///
/// Immutable after registration.  `tool_names` may reference tools that are
/// not (yet) in the registry — unresolved names are rejected per-call at
/// dispatch time, not here.
#[derive(Debug, Clone)]
pub struct SubAgentDefinition {
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    pub tool_names: BTreeSet<String>,
    /// Optional model override hint for this persona.
    pub model: Option<String>,
    /// Optional verbosity hint ("terse" | "detailed").
    pub verbosity: Option<String>,
}

impl SubAgentDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        system_prompt: impl Into<String>,
        tool_names: impl IntoIterator<Item = &'static str>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            system_prompt: system_prompt.into(),
            tool_names: tool_names.into_iter().map(str::to_string).collect(),
            model: None,
            verbosity: None,
        }
    }

    pub fn allows(&self, tool: &str) -> bool {
        self.tool_names.contains(tool)
    }
}

/// Registry of sub-agent definitions, keyed by name.
pub struct SubAgentRegistry {
    agents: HashMap<String, Arc<SubAgentDefinition>>,
}

impl SubAgentRegistry {
    pub fn empty() -> Self {
        Self { agents: HashMap::new() }
    }

    /// The built-in research personas.
    pub fn builtin() -> Self {
        let mut reg = Self::empty();

        reg.register(SubAgentDefinition::new(
            "literature-researcher",
            "Searches the literature and the web for prior work and data",
            "You are a literature researcher for a chemistry assistant. \
             Search thoroughly, read critically, and record what you find as \
             research artifacts. Cite sources by title and origin. Finish \
             with a compact summary of the most relevant findings.",
            ["web_search", "fetch_page", "create_artifact", "write_file", "read_file"],
        ));

        reg.register(SubAgentDefinition::new(
            "compound-analyst",
            "Looks up molecules, proteins, and reactions and interprets the results",
            "You are a chemistry analyst. Use the lookup tools to retrieve \
             structures, properties, and reaction data, then interpret the \
             results for a technically literate reader. Record notable data \
             as artifacts and finish with a concise interpretation.",
            ["lookup_molecule", "lookup_protein", "lookup_reaction", "create_artifact", "write_file"],
        ));

        reg.register(SubAgentDefinition::new(
            "data-visualizer",
            "Turns numeric findings into chart specifications",
            "You are a data visualizer. Extract the labelled numeric series \
             from the task, build charts with generate_chart, and describe \
             each chart in one sentence.",
            ["generate_chart", "create_artifact", "read_file"],
        ));

        reg.register(SubAgentDefinition::new(
            "document-writer",
            "Synthesizes accumulated findings into the final document",
            "You are a scientific writer. Synthesize the findings you are \
             given into one coherent document with a summary, an \
             introduction, themed sections, key findings, and references. \
             Store the result with the finalize_document tool — that call is \
             your deliverable.",
            ["finalize_document", "create_artifact", "read_file"],
        ));

        reg
    }

    /// Register a definition.  Definitions are immutable once stored; a
    /// duplicate name replaces the old definition wholesale.
    pub fn register(&mut self, def: SubAgentDefinition) {
        self.agents.insert(def.name.clone(), Arc::new(def));
    }

    pub fn get(&self, name: &str) -> Option<Arc<SubAgentDefinition>> {
        self.agents.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }

    /// `(name, description)` pairs for prompt rendering, sorted by name.
    pub fn descriptions(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .agents
            .values()
            .map(|d| (d.name.clone(), d.description.clone()))
            .collect();
        out.sort();
        out
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_contains_research_personas() {
        let reg = SubAgentRegistry::builtin();
        for name in [
            "literature-researcher",
            "compound-analyst",
            "data-visualizer",
            "document-writer",
        ] {
            assert!(reg.get(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn unknown_name_resolves_to_none() {
        let reg = SubAgentRegistry::builtin();
        assert!(reg.get("mystery-agent").is_none());
    }

    #[test]
    fn definitions_may_reference_unregistered_tools() {
        // lookup_molecule is a domain collaborator that may not be plugged in;
        // the definition still lists it and dispatch rejects it per-call.
        let reg = SubAgentRegistry::builtin();
        let analyst = reg.get("compound-analyst").unwrap();
        assert!(analyst.allows("lookup_molecule"));
    }

    #[test]
    fn allows_is_exact_membership() {
        let def = SubAgentDefinition::new("t", "d", "p", ["a", "b"]);
        assert!(def.allows("a"));
        assert!(!def.allows("c"));
    }

    #[test]
    fn register_replaces_same_name() {
        let mut reg = SubAgentRegistry::empty();
        reg.register(SubAgentDefinition::new("x", "old", "p", []));
        reg.register(SubAgentDefinition::new("x", "new", "p", []));
        assert_eq!(reg.get("x").unwrap().description, "new");
        assert_eq!(reg.names().len(), 1);
    }

    #[test]
    fn descriptions_are_sorted_by_name() {
        let reg = SubAgentRegistry::builtin();
        let descs = reg.descriptions();
        let names: Vec<&str> = descs.iter().map(|(n, _)| n.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
pub mod builtin;
pub mod chart;
pub mod registry;
pub mod sanitize;
pub mod tool;
pub mod workspace;

pub use builtin::standard_registry;
pub use registry::{ToolRegistry, ToolSchema};
pub use tool::{Tool, ToolCall, ToolOutput};
pub use workspace::{
    Artifact, ArtifactKind, FinalDocument, Finding, TodoItem, TodoStatus, ToolEvent, Workspace,
};

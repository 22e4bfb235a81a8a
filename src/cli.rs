// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "kemi",
    about = "A research agent engine for chemistry assistants",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Research prompt; omit to read it from --file or stdin
    #[arg(value_name = "PROMPT")]
    pub prompt: Option<String>,

    /// Model to use, e.g. "gpt-4o-mini", "openai/gpt-4o", or "mock"
    #[arg(long, short = 'M', env = "KEMI_MODEL")]
    pub model: Option<String>,

    /// Path to a file whose contents become the prompt
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,

    /// Path to config file (overrides auto-discovery)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress output on stderr
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the merged configuration and exit
    ShowConfig,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}

/// Apply a `--model` override onto the loaded config.
///
/// Accepts "name", "provider/name", or the bare provider "mock".
pub fn apply_model_override(config: &mut kemi_config::Config, spec: &str) {
    match spec.split_once('/') {
        Some((provider, name)) => {
            config.model.provider = provider.to_string();
            config.model.name = name.to_string();
        }
        None if spec == "mock" => {
            config.model.provider = "mock".to_string();
            config.model.name = "mock-model".to_string();
        }
        None => config.model.name = spec.to_string(),
    }
}

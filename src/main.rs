mod cli;

use std::io::{self, Read};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{apply_model_override, Cli, Commands};
use kemi_core::{Driver, EventBus, TaskEventKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Some(cmd) = &cli.command {
        match cmd {
            Commands::Completions { shell } => {
                cli::print_completions(*shell);
                return Ok(());
            }
            Commands::ShowConfig => {
                let config = kemi_config::load(cli.config.as_deref())?;
                println!("{}", serde_yaml::to_string(&config).unwrap_or_default());
                return Ok(());
            }
        }
    }

    let mut config = kemi_config::load(cli.config.as_deref())?;
    if let Some(spec) = &cli.model {
        apply_model_override(&mut config, spec);
    }

    // ── Prompt input: argument, file, or piped stdin ─────────────────────────
    let prompt = if let Some(p) = &cli.prompt {
        p.clone()
    } else if let Some(path) = &cli.file {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading prompt file {}", path.display()))?
    } else if !is_stdin_tty() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("reading stdin")?;
        buf
    } else {
        anyhow::bail!("no prompt given; pass one as an argument, via --file, or on stdin");
    };
    let prompt = prompt.trim();
    if prompt.is_empty() {
        anyhow::bail!("prompt is empty");
    }

    let model = kemi_model::from_config(&config.model)?;
    let bus = Arc::new(EventBus::new());
    if !cli.quiet {
        bus.subscribe(print_progress);
    }

    let mut driver = Driver::new(model, Arc::new(config.agent.clone()), bus);
    let reply = driver.process_message(prompt).await?;

    println!("{reply}");

    // Print finalized documents after the reply, stdout-pipeable.
    let workspace = driver.workspace();
    let ws = workspace.lock().await;
    for doc in ws.documents() {
        println!("\n---\n# {}\n\n{}", doc.title, doc.content);
    }

    Ok(())
}

/// Render progress events as terse stderr lines.
fn print_progress(event: &kemi_core::TaskEvent) {
    let line = match event.kind {
        TaskEventKind::TaskStart => {
            Some(format!("task: {}", event.title.as_deref().unwrap_or("")))
        }
        TaskEventKind::StepStart => {
            Some(format!("  step: {}", event.title.as_deref().unwrap_or("")))
        }
        TaskEventKind::StepComplete => Some(format!(
            "  step done: {}{}",
            event.title.as_deref().unwrap_or(""),
            event
                .progress
                .map(|p| format!(" ({p}%)"))
                .unwrap_or_default()
        )),
        TaskEventKind::ToolCall => {
            Some(format!("    tool: {}", event.title.as_deref().unwrap_or("")))
        }
        TaskEventKind::ArtifactCreated => {
            Some(format!("  artifact: {}", event.title.as_deref().unwrap_or("")))
        }
        TaskEventKind::DocumentReady => {
            Some(format!("  document: {}", event.title.as_deref().unwrap_or("")))
        }
        TaskEventKind::TaskError => {
            Some(format!("error: {}", event.message.as_deref().unwrap_or("")))
        }
        TaskEventKind::TaskComplete => {
            Some(format!("task {}", event.status.as_deref().unwrap_or("done")))
        }
        // High-frequency stream/thinking/flavor events stay silent.
        _ => None,
    };
    if let Some(line) = line {
        eprintln!("[kemi] {line}");
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn is_stdin_tty() -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        unsafe { libc::isatty(io::stdin().as_raw_fd()) != 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

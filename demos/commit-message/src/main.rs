//! Writes a commit message for the diff piped on standard input.
//!
//! ```text
//! git diff --staged | weave-commit-message --config agents.toml
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use agent_config::{AgentConfig, DEFAULT_PROFILE};
use agent_kernel::{OutputSink, agent_from_config};
use agent_telemetry::{TelemetryConfig, init_tracing};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing::info;

const COMMIT_PROMPT: &str = "You are a senior software engineer reviewing a code change. \
Write a commit message for the diff you are given. Keep it concise and cover every change.

Use this layout: a title line summarising the change, a blank line, then one bullet per change, for example:

Add TOML config support and refactor agent initialization

- Add `config.toml` to .gitignore to exclude local configuration files
- Build agents from a loaded configuration instead of a hand-made client
  - Add `config` and `client` parameters to agent constructors
- Extend the config model with model, api_key, base_url and timeout fields";

#[derive(Debug, Parser)]
#[command(version, about = "Generate a commit message from a diff on stdin")]
struct Args {
    /// TOML configuration file; the environment is used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Table of the configuration file to read.
    #[arg(long, default_value = DEFAULT_PROFILE)]
    profile: String,

    /// Print the message only once it is complete.
    #[arg(long)]
    no_stream: bool,
}

struct Stdout;

impl OutputSink for Stdout {
    fn on_chunk(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    fn on_response_end(&self) {
        println!();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => AgentConfig::from_toml_file(path, &args.profile)
            .with_context(|| format!("loading profile `{}`", args.profile))?,
        None => AgentConfig::from_env().context("reading configuration from the environment")?,
    };
    if config.system_prompt.is_none() {
        config.system_prompt = Some(COMMIT_PROMPT.to_owned());
    }
    config.stream = !args.no_stream;

    init_tracing(&TelemetryConfig::new(config.log_level.as_str()).with_debug(config.debug))?;

    let mut diff = String::new();
    tokio::io::stdin()
        .read_to_string(&mut diff)
        .await
        .context("reading the diff from stdin")?;
    if diff.trim().is_empty() {
        eprintln!("no diff on stdin");
        return Ok(());
    }

    let mut agent = agent_from_config(&config, Arc::new(Stdout)).await?;
    info!(diff_bytes = diff.len(), "generating commit message");
    agent.run(&diff).await?;
    Ok(())
}

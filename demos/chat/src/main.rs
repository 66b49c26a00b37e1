//! Interactive chat with a tool-augmented agent.
//!
//! Reads one line at a time from the terminal; `exit`, `quit`, `bye`, `q`
//! or `x` ends the session.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use agent_config::{AgentConfig, DEFAULT_PROFILE};
use agent_kernel::{OutputSink, agent_from_config};
use agent_telemetry::{TelemetryConfig, init_tracing};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

const EXIT_WORDS: [&str; 5] = ["exit", "quit", "bye", "q", "x"];

#[derive(Debug, Parser)]
#[command(version, about = "Chat with a tool-augmented agent")]
struct Args {
    /// TOML configuration file; the environment is used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Table of the configuration file to read.
    #[arg(long, default_value = DEFAULT_PROFILE)]
    profile: String,

    /// Stream the answer as it is generated.
    #[arg(long)]
    stream: bool,
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

fn load_config(args: &Args) -> Result<AgentConfig> {
    let config = match &args.config {
        Some(path) => AgentConfig::from_toml_file(path, &args.profile)
            .with_context(|| format!("loading profile `{}`", args.profile))?,
        None => AgentConfig::from_env().context("reading configuration from the environment")?,
    };
    Ok(config)
}

fn prompt(label: &str) -> Result<()> {
    let mut out = std::io::stdout().lock();
    write!(out, "{label}: ")?;
    out.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(&args)?;
    config.stream |= args.stream;

    init_tracing(&TelemetryConfig::new(config.log_level.as_str()).with_debug(config.debug))?;

    let mut agent = agent_from_config(&config, Arc::new(Stdout)).await?;
    info!(
        agent = %agent.id(),
        tools = agent.registry().len(),
        "chat session started"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt("You")?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&input.to_lowercase().as_str()) {
            break;
        }

        prompt(agent.name())?;
        if let Err(err) = agent.run(input).await {
            error!(error = %err, "chat session aborted");
            return Err(err.into());
        }
    }

    println!("Goodbye!");
    Ok(())
}

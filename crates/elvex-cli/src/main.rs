//! Command-line interface for elvex-rs

use anyhow::{Context, bail};
use clap::Parser;
use elvex_llm::{ElvexConfig, ElvexProvider, Message, StreamingProvider};
use elvex_utils::{Config, LogFormat};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "elvex-cli")]
#[command(about = "Stream a reply from an elvex app version", long_about = None)]
struct Args {
    /// Prompt sent as the final user message
    prompt: Option<String>,

    /// System prompt
    #[arg(short, long, default_value = "")]
    system: String,

    /// JSON file holding an array of prior messages
    #[arg(short, long)]
    conversation: Option<PathBuf>,

    /// elvex app ID
    #[arg(long, env = "ELVEX_APP_ID", default_value = "")]
    app_id: String,

    /// elvex app version
    #[arg(long = "version-id", env = "ELVEX_VERSION", default_value = "")]
    version_id: String,

    /// elvex API key
    #[arg(long, env = "ELVEX_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,

    /// Override the API base URL
    #[arg(long, env = "ELVEX_API_BASE")]
    api_base: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout: u64,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print the model id and info instead of sending a prompt
    #[arg(long)]
    model: bool,
}

impl Args {
    fn elvex_config(&self) -> ElvexConfig {
        let config = ElvexConfig::new(&self.app_id, &self.version_id, &self.api_key)
            .with_timeout(self.timeout);
        match &self.api_base {
            Some(api_base) => config.with_api_base(api_base),
            None => config,
        }
    }

    fn messages(&self) -> anyhow::Result<Vec<Message>> {
        let mut messages = match &self.conversation {
            Some(path) => load_conversation(path)?,
            None => Vec::new(),
        };
        if let Some(prompt) = &self.prompt {
            messages.push(Message::user(prompt));
        }
        Ok(messages)
    }
}

fn load_conversation(path: &Path) -> anyhow::Result<Vec<Message>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read conversation file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse conversation file {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let mut log_config = Config::from_env()?;
    if args.json_logs {
        log_config.log_format = LogFormat::Json;
    }
    elvex_utils::init_tracing_with(&log_config)?;

    info!("Starting elvex-cli");

    let provider = ElvexProvider::with_config(args.elvex_config())?;

    if args.model {
        println!("{}", serde_json::to_string_pretty(&provider.get_model())?);
        return Ok(());
    }

    let messages = args.messages()?;
    if messages.is_empty() {
        bail!("nothing to send: pass a prompt or --conversation FILE");
    }

    let mut stream = provider.create_message(&args.system, &messages)?;
    let mut stdout = tokio::io::stdout();
    while let Some(chunk) = stream.next().await {
        if let Some(text) = chunk?.as_text() {
            stdout.write_all(text.as_bytes()).await?;
            stdout.flush().await?;
        }
    }
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;

    Ok(())
}

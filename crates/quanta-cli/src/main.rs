use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use quanta_core::impls::FileStore;
use quanta_core::ports::KeyValueStore;
use quanta_core::queue::decode_slot;
use quanta_core::{QuantaConfig, Tracker, TrackerBuilder};

#[derive(Debug, Parser)]
#[command(name = "quanta", about = "Queue and deliver analytics events")]
struct Cli {
    /// TOML config file; `QUANTA__*` environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Queue an event and wait until the queue is drained.
    Log {
        event: String,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        revenue: f64,
        /// `key=value`, repeatable.
        #[arg(long = "arg", value_parser = parse_key_value)]
        args: Vec<(String, String)>,
    },
    /// Queue a profile update and wait until the queue is drained.
    UserUpdate,
    /// Print the number of persisted pending tasks.
    Pending,
    /// Deliver whatever a previous run left behind.
    Drain,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{s}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = QuantaConfig::load(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Command::Log { event, revenue, args } => {
            if event.is_empty() {
                bail!("event name must not be empty");
            }
            let tracker = build(&config).await?;
            let arguments: BTreeMap<String, String> = args.into_iter().collect();
            tracker.log(&event, revenue, &arguments).await;
            settle(&tracker).await;
        }
        Command::UserUpdate => {
            let tracker = build(&config).await?;
            tracker.send_user_update().await;
            settle(&tracker).await;
        }
        Command::Pending => {
            let store = FileStore::open(&config.storage_dir).await?;
            let count = match store.read(&config.queue.storage_key).await? {
                Some(bytes) => decode_slot(&bytes).context("queue slot is unreadable")?.tasks.len(),
                None => 0,
            };
            println!("{count}");
        }
        Command::Drain => {
            let tracker = build(&config).await?;
            settle(&tracker).await;
        }
    }

    Ok(())
}

async fn build(config: &QuantaConfig) -> anyhow::Result<Tracker> {
    TrackerBuilder::from_config(config)
        .build()
        .await
        .context("failed to start tracker")
}

async fn settle(tracker: &Tracker) {
    tracker.queue().wait_idle().await;
    info!(pending = tracker.queue().pending().await, "queue idle");
}

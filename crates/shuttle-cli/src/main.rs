mod cli;
mod handlers;
mod script;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use shuttle_core::observability::spawn_event_log;
use shuttle_core::typed::HandlerProcessor;
use shuttle_core::{InstructionQueue, ItemId, QueueConfig, QueueEvent};

use crate::cli::{CliArgs, Command};
use crate::script::ScriptEntry;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Run { script, wait_secs } => {
            let entries = match script {
                Some(path) => script::load(&path)?,
                None => {
                    info!("no script given, running the demo");
                    script::demo()
                }
            };
            run(config, entries, Duration::from_secs(wait_secs)).await?;
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<QueueConfig> {
    let config = match path {
        Some(path) => QueueConfig::from_path(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => QueueConfig::default(),
    };
    config.validate().context("invalid configuration")
}

async fn run(config: QueueConfig, entries: Vec<ScriptEntry>, wait: Duration) -> Result<()> {
    let processor = HandlerProcessor::new(handlers::router()?);
    let queue = InstructionQueue::new(config, processor).context("failed to start queue")?;
    let log = spawn_event_log(queue.subscribe());
    let mut events = queue.subscribe();

    let mut ids: Vec<ItemId> = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let parent = entry.parent.and_then(|p| ids.get(p).copied());
        let item = queue
            .enqueue(entry.payload, entry.priority, parent)
            .await
            .with_context(|| format!("failed to enqueue entry {index}"))?;
        ids.push(item.id);
    }
    info!(items = ids.len(), "script enqueued");

    let drained = tokio::time::timeout(wait, async {
        loop {
            match events.recv().await {
                Ok(QueueEvent::QueueEmpty) | Err(RecvError::Lagged(_)) => {
                    if queue.state().await.items.is_empty() {
                        return true;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Closed) => return false,
            }
        }
    })
    .await;

    let state = queue.state().await;
    println!("{}", serde_json::to_string_pretty(&state.stats)?);
    log.abort();

    match drained {
        Ok(true) => Ok(()),
        Ok(false) => bail!("event bus closed before the queue drained"),
        Err(_) => {
            warn!(left = state.items.len(), "timed out waiting for the queue");
            bail!("queue did not drain within {}s", wait.as_secs())
        }
    }
}

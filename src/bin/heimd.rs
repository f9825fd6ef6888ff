//! heimd: Heimdall daemon.
//!
//! Keeps the space-data cache warm: restores the last store dump, runs every
//! collector on its schedule until interrupted, then dumps the store again.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use heimdall::store::persist::{load_dump, save_dump};
use heimdall::{Config, Heimdall, MemoryStore, Scheduler, SpaceDataGateway, SpaceGateway};

/// Heimdall daemon: freshness-aware cache for space data feeds.
#[derive(Parser)]
#[command(name = "heimd")]
#[command(version)]
#[command(about = "Heimdall space data cache daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "HEIMDALL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Warm up, then collect on schedule until ctrl-c (default)
    Serve,

    /// Run every collector once and print the per-source status
    Refresh,

    /// Print the latest cached data for a source
    Latest {
        /// Source name, e.g. "neo" or "donki_flr"
        source: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    let dump_path = config.store.dump_path();

    let store = Arc::new(MemoryStore::new());
    if let Some(dump) = load_dump(&dump_path) {
        store.restore(dump)?;
        info!(path = %dump_path.display(), "restored store dump");
    }

    let gateway = Heimdall::builder()
        .config(config)
        .store(store.clone())
        .default_collectors()
        .build()?;

    let mut failed = false;
    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&gateway).await?,
        Command::Refresh => {
            let statuses = gateway.refresh_all().await;
            println!("{}", serde_json::to_string_pretty(&statuses)?);
        }
        Command::Latest { source } => match gateway.get_latest(&source).await {
            Ok(latest) => println!("{}", serde_json::to_string_pretty(&latest)?),
            Err(e) => {
                eprintln!("{}: {e}", e.kind());
                failed = true;
            }
        },
    }

    save_dump(&dump_path, &store.dump()?)?;
    info!(path = %dump_path.display(), "store dumped");

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

async fn serve(gateway: &SpaceGateway) -> Result<(), Box<dyn std::error::Error>> {
    let mut scheduler = Scheduler::new(gateway.jobs());
    info!(version = env!("CARGO_PKG_VERSION"), "heimd starting");
    scheduler.start().await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c, shutting down");
    }
    info!("shutting down");
    scheduler.shutdown();
    Ok(())
}

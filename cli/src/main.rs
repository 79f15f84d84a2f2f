use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::{error::Error, path::PathBuf, sync::Arc};
use tracing::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use engine::storage::{memory::Memory, RecordStore};
use files::JsonFiles;

mod dump;
mod serve;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Serve(serve::Command),
    Dump(dump::Command),
}

#[derive(Debug, Args, Clone)]
pub struct StoreConfiguration {
    /// Directory holding one JSON file per collection.
    #[arg(long, env = "INVOICES_DATA", default_value = "data")]
    data: PathBuf,
    /// Keep everything in memory, nothing is written to disk.
    #[arg(long)]
    memory: bool,
}

impl StoreConfiguration {
    pub fn make_store(&self) -> Result<Arc<dyn RecordStore>> {
        let store: Arc<dyn RecordStore> = if self.memory {
            warn!("memory store, nothing will be persisted");

            Memory::new()
        } else {
            JsonFiles::new(&self.data)?
        };

        Ok(store)
    }
}

fn get_rust_log(verbose: u8) -> String {
    let fallback = if verbose > 0 {
        "invoices=debug,engine=debug,files=debug"
    } else {
        "invoices=info,engine=info,files=info"
    };

    let mut original = std::env::var("RUST_LOG").unwrap_or_else(|_| fallback.into());

    if !original.contains("tower_http=") {
        original.push_str(",tower_http=info");
    }

    original
}

fn main() -> Result<(), Box<dyn Error>> {
    color_backtrace::install();

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(get_rust_log(cli.verbose)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("initialized, ready");

    match &cli.command {
        Some(Commands::Serve(cmd)) => Ok(serve::execute_command(cmd)?),
        Some(Commands::Dump(cmd)) => Ok(dump::execute_command(cmd)?),
        None => Ok(()),
    }
}

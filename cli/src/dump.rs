use std::io::{self, Write};

use anyhow::Result;
use clap::Args;

use crate::StoreConfiguration;

#[derive(Debug, Args, Clone)]
pub struct Command {
    #[arg(value_parser = ["events", "users"])]
    collection: String,
    #[arg(short, long)]
    lines: bool,
    #[command(flatten)]
    store: StoreConfiguration,
}

pub fn execute_command(cmd: &Command) -> Result<()> {
    let store = cmd.store.make_store()?;

    let records = store.load(&cmd.collection)?;
    let mut stdout = io::stdout().lock();
    if cmd.lines {
        for record in records {
            stdout.write_all(&serde_json::to_vec(&record)?)?;
            stdout.write_all(b"\n")?;
        }
    } else {
        let array = serde_json::Value::Array(records);
        stdout.write_all(&serde_json::to_vec_pretty(&array)?)?;
        stdout.write_all(b"\n")?;
    }

    Ok(())
}

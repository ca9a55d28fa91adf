use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rowdb::{Table, repl};

/// A single-table record store with an interactive prompt.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Database file, created if it does not exist
    filename: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let mut table = Table::open(&args.filename).with_context(|| {
        format!(
            "Failed to open database file {}",
            args.filename.display()
        )
    })?;

    let result = repl::run(&mut table, io::stdin().lock(), io::stdout().lock());
    let closed = table.close();

    result.context("Failed to process input")?;
    closed.context("Failed to flush database file")?;
    Ok(())
}

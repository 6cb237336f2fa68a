use std::process::ExitCode;

use anyhow::{Context, Result};
use log::error;
use pronto_engine::IndexConfig;
use pronto_indexer::build_and_save;
use pronto_runtime::default_scan_root;

use crate::Cli;
use crate::commands::database_path;

/// `-u/--update`: rescan and rewrite the database.
pub fn run(cli: &Cli) -> ExitCode {
    match execute(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("[update] {e:#}");
            eprintln!("pronto: database update failed: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn execute(cli: &Cli) -> Result<ExitCode> {
    let root = default_scan_root();
    let db = database_path(cli);

    println!("Updating database...");
    let index = build_and_save(&root, &db, IndexConfig::default())
        .with_context(|| format!("scan of {} failed", root.display()))?;

    println!(
        "Database updated: {} paths in {}",
        index.live_file_count(),
        db.display()
    );
    Ok(ExitCode::SUCCESS)
}

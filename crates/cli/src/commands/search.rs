use std::process::ExitCode;

use anyhow::{Context, Result};
use log::{error, warn};
use pronto_engine::{IndexConfig, QueryContext};
use pronto_indexer::open_or_build;
use pronto_runtime::default_scan_root;

use crate::Cli;
use crate::commands::database_path;
use crate::printer::print_hits;

/// Search the database for a literal pattern.
pub fn run(cli: &Cli, pattern: &str) -> ExitCode {
    match execute(cli, pattern) {
        Ok(code) => code,
        Err(e) => {
            error!("[search] {e:#}");
            eprintln!("pronto: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn execute(cli: &Cli, pattern: &str) -> Result<ExitCode> {
    if cli.regexp {
        // Accepted for locate compatibility; matching stays literal.
        warn!("[search] --regexp not supported, matching literally");
    }

    let db = database_path(cli);
    let index = open_or_build(&default_scan_root(), &db, IndexConfig::default())
        .context("failed to initialize index")?;

    let (uid, gid) = caller_ids();
    let mut ctx = QueryContext::new(pattern.as_bytes().to_vec(), uid, gid);
    if cli.ignore_case {
        ctx = ctx.ignore_case();
    }

    let outcome = index.search(&ctx).context("query failed")?;
    print_hits(&outcome.hits);
    Ok(ExitCode::SUCCESS)
}

#[cfg(unix)]
fn caller_ids() -> (u32, u32) {
    // SAFETY: getuid/getgid cannot fail and touch no memory.
    unsafe { (libc::getuid(), libc::getgid()) }
}

#[cfg(not(unix))]
fn caller_ids() -> (u32, u32) {
    (0, 0)
}

pub mod search;
pub mod update;

use std::path::PathBuf;

use crate::Cli;

/// Database location: the `-d` flag, or the per-user cache default.
pub fn database_path(cli: &Cli) -> PathBuf {
    cli.database
        .clone()
        .unwrap_or_else(pronto_runtime::default_database_path)
}

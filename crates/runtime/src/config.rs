use std::path::PathBuf;

pub const PROGRAM_NAME: &str = "pronto";
pub const PROGRAM_LOG_LEVEL: &str = "PRONTO_LOG_LEVEL";
const DATABASE_FILE_NAME: &str = "pronto.db";

/// Per-user cache directory holding the database image:
/// `$XDG_CACHE_HOME/pronto`, or `~/.cache/pronto` when XDG is unset.
pub fn pronto_dir() -> PathBuf {
    std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PROGRAM_NAME)
}

pub fn default_database_path() -> PathBuf {
    pronto_dir().join(DATABASE_FILE_NAME)
}

/// Where `--update` starts scanning when no root is given: the caller's
/// home directory, or the working directory as a last resort.
pub fn default_scan_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Subtrees a path index is better off without: VCS internals, package
/// and build output, interpreter caches.
pub const DEFAULT_PROJECT_IGNORE_PATTERNS: &[&str] = &[
    ".git/",
    ".hg/",
    ".svn/",
    ".cache/",
    "__pycache__/",
    "node_modules/",
    "target/",
    "build/",
    "dist/",
    ".venv/",
    "venv/",
    "vendor/",
    "lost+found/",
    ".DS_Store",
];

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

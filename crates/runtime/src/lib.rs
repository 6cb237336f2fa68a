mod config;
pub mod logging;

pub use config::{
    DEFAULT_PROJECT_IGNORE_PATTERNS, PROGRAM_LOG_LEVEL, PROGRAM_NAME, default_database_path,
    default_scan_root, pronto_dir,
};

pub use logging::init;

mod config;
mod events;
mod excludes;
mod record;
mod walker;

pub use config::{BATCH_SIZE, MAX_SCAN_DEPTH};
pub use events::{FsEvent, FsEventKind};
pub use excludes::IgnoreEngine;
pub use record::PathRecord;
pub use walker::{ScanContext, walk_parallel};

/// Records per channel send. Keeps channel overhead off the scan threads.
pub const BATCH_SIZE: usize = 64;

/// Directory-depth cap for the walk. Defends against symlink loops and
/// pathological trees.
pub const MAX_SCAN_DEPTH: usize = 64;

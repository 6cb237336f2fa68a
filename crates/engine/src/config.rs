use std::time::Duration;

/// Primary bloom filter size in bytes.
pub const PRIMARY_BLOOM_SIZE: usize = 32 << 20;
/// Secondary (query-hotness) bloom filter size in bytes.
pub const SECONDARY_BLOOM_SIZE: usize = 16 << 20;
/// Hash functions per bloom lookup.
pub const BLOOM_HASH_COUNT: u32 = 8;
/// Bytes per trigram window.
pub const TRIGRAM_SIZE: usize = 3;
/// Upper bound on query worker threads, regardless of CPU count.
pub const WORKER_THREAD_CAP: usize = 16;
/// Maximum results a single query returns.
pub const MAX_RESULTS: usize = 10_000;
/// Candidate ids examined per query before the scan gives up.
pub const MAX_CANDIDATES: usize = 100_000;
/// Longest query, measured in trigrams.
pub const MAX_QUERY_TRIGRAMS: usize = 1024;
/// Relevance cut, relative to the best-scoring candidate.
pub const SCORE_THRESHOLD: f32 = 0.25;
/// Directory-depth cap for indexed paths.
pub const MAX_DIRECTORY_DEPTH: usize = 64;
/// Pending events that force an update commit.
pub const BATCH_COMMIT_THRESHOLD: usize = 5000;
/// Idle interval after which pending updates are committed anyway.
pub const BATCH_COMMIT_INTERVAL: Duration = Duration::from_secs(30);
/// Per-worker result cap during the parallel scan.
pub const RESULTS_PER_THREAD: usize = 512;
/// Longest path the index accepts, in bytes.
pub const PATH_MAX: usize = 4096;

/// Tunables for one index instance. The module constants above are the
/// defaults; tests shrink the bloom filters to keep fixtures cheap.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub primary_bloom_size: usize,
    pub secondary_bloom_size: usize,
    pub bloom_hash_count: u32,
    pub worker_thread_cap: usize,
    pub max_results: usize,
    pub max_candidates: usize,
    pub max_query_trigrams: usize,
    pub score_threshold: f32,
    pub max_depth: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            primary_bloom_size: PRIMARY_BLOOM_SIZE,
            secondary_bloom_size: SECONDARY_BLOOM_SIZE,
            bloom_hash_count: BLOOM_HASH_COUNT,
            worker_thread_cap: WORKER_THREAD_CAP,
            max_results: MAX_RESULTS,
            max_candidates: MAX_CANDIDATES,
            max_query_trigrams: MAX_QUERY_TRIGRAMS,
            score_threshold: SCORE_THRESHOLD,
            max_depth: MAX_DIRECTORY_DEPTH,
        }
    }
}

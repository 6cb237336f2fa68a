use std::sync::Mutex;
use std::thread;

use log::debug;

use crate::{
    config::{MAX_RESULTS, PATH_MAX, RESULTS_PER_THREAD},
    error::{EngineError, Result},
    index::{FileId, Index},
    trigram::{extract_into, fold_bytes},
};

mod access;
mod plan;
mod score;

pub use access::check_file_permission;

/// One search request: pattern bytes plus the caller's identity for
/// permission filtering.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub pattern: Vec<u8>,
    pub case_sensitive: bool,
    pub max_results: usize,
    pub uid: u32,
    pub gid: u32,
}

impl QueryContext {
    pub fn new(pattern: impl Into<Vec<u8>>, uid: u32, gid: u32) -> Self {
        QueryContext {
            pattern: pattern.into(),
            case_sensitive: true,
            max_results: MAX_RESULTS,
            uid,
            gid,
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }
}

#[derive(Debug, Clone)]
pub struct QueryHit {
    pub id: FileId,
    pub score: f32,
    /// Absolute path bytes, cloned out of the metadata table so hits stay
    /// valid after the read lock is dropped.
    pub path: Vec<u8>,
}

/// Counters a query leaves behind. Tests and the CLI's verbose mode read
/// these; nothing in the pipeline depends on them.
#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    /// Trigrams extracted from the pattern (duplicates included).
    pub trigram_count: usize,
    /// Distinct query trigrams the secondary bloom already knew.
    pub hot_trigrams: usize,
    /// Posting lists decompressed for this query.
    pub postings_decoded: usize,
    /// Candidate ids that reached the scan stage.
    pub candidates: usize,
    /// The primary bloom vetoed the query outright.
    pub bloom_rejected: bool,
    /// Pattern was too short for trigrams; the trie answered.
    pub used_trie: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub hits: Vec<QueryHit>,
    pub metrics: PipelineMetrics,
}

impl Index {
    /// Run the full query pipeline under the caller's read lock.
    ///
    /// Stages: trigram extraction; trie delegation for sub-trigram
    /// patterns; bloom gate (with feed-forward recording); posting
    /// intersection; parallel permission + scoring scan; ranked merge.
    pub fn search(&self, ctx: &QueryContext) -> Result<SearchOutcome> {
        if ctx.pattern.is_empty() {
            return Err(EngineError::InvalidQuery("empty pattern"));
        }
        if ctx.pattern.len() > PATH_MAX {
            return Err(EngineError::InvalidQuery("pattern longer than PATH_MAX"));
        }

        let mut metrics = PipelineMetrics::default();
        let fold = !ctx.case_sensitive;

        let mut tris = Vec::new();
        if fold {
            let folded = fold_bytes(&ctx.pattern);
            extract_into(&folded, false, &mut tris);
        } else {
            extract_into(&ctx.pattern, false, &mut tris);
        }
        metrics.trigram_count = tris.len();

        if tris.len() > self.cfg.max_query_trigrams {
            return Err(EngineError::InvalidQuery("too many query trigrams"));
        }

        if tris.is_empty() {
            return Ok(self.search_trie(ctx, metrics));
        }

        tris.sort_unstable();
        tris.dedup();

        // Hot set from prior query history, sampled before this query
        // teaches the secondary about itself.
        let hot = self.bloom.get_candidates(&tris);
        metrics.hot_trigrams = hot.len();

        // Bloom gate: any definite miss ends the query with zero decodes.
        for &tri in &tris {
            if !self.bloom.check_and_record(tri) {
                metrics.bloom_rejected = true;
                return Ok(SearchOutcome {
                    hits: Vec::new(),
                    metrics,
                });
            }
        }

        let mut candidates = plan::intersect_postings(self, &tris, &hot, &mut metrics)?;
        if candidates.len() > self.cfg.max_candidates {
            debug!(
                "[query] candidate cap: {} of {} examined",
                self.cfg.max_candidates,
                candidates.len()
            );
            candidates.truncate(self.cfg.max_candidates);
        }
        metrics.candidates = candidates.len();

        if candidates.is_empty() {
            return Ok(SearchOutcome {
                hits: Vec::new(),
                metrics,
            });
        }

        let weights = score::trigram_weights(self, &tris);
        let mut hits = self.scan_candidates(ctx, &candidates, &weights, fold);

        score::rank_hits(&mut hits);
        score::apply_threshold(&mut hits, self.cfg.score_threshold);
        hits.truncate(ctx.max_results);

        Ok(SearchOutcome { hits, metrics })
    }

    /// Parallel scan: candidate ranges are sharded over
    /// min(CPUs, worker cap) scoped threads. Each worker filters
    /// tombstones, applies the permission gate, scores, and keeps at most
    /// RESULTS_PER_THREAD local hits; locals merge under one mutex.
    fn scan_candidates(
        &self,
        ctx: &QueryContext,
        candidates: &[FileId],
        weights: &[score::TrigramWeight],
        fold: bool,
    ) -> Vec<QueryHit> {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(self.cfg.worker_thread_cap)
            .max(1);
        let chunk_size = candidates.len().div_ceil(workers);

        let merged: Mutex<Vec<QueryHit>> = Mutex::new(Vec::new());

        thread::scope(|s| {
            for chunk in candidates.chunks(chunk_size) {
                let merged = &merged;
                s.spawn(move || {
                    let mut local: Vec<QueryHit> = Vec::new();
                    let mut scratch = Vec::new();

                    for &id in chunk {
                        if local.len() >= RESULTS_PER_THREAD {
                            break;
                        }
                        let Some(meta) = self.meta(id) else { continue };
                        if meta.is_tombstone() {
                            continue;
                        }
                        if !check_file_permission(meta, ctx.uid, ctx.gid) {
                            continue;
                        }

                        let score = score::score_path(&meta.path, weights, fold, &mut scratch);
                        local.push(QueryHit {
                            id,
                            score,
                            path: meta.path.clone(),
                        });
                    }

                    let mut global = merged.lock().expect("result merge poisoned");
                    for hit in local {
                        if global.len() >= ctx.max_results {
                            break;
                        }
                        global.push(hit);
                    }
                });
            }
        });

        merged.into_inner().expect("result merge poisoned")
    }

    /// Sub-trigram patterns: the trie is the sole evaluator. Matches are
    /// path prefixes (component suffixes included at insertion), returned
    /// in DFS pre-order, tombstone- and permission-filtered.
    fn search_trie(&self, ctx: &QueryContext, mut metrics: PipelineMetrics) -> SearchOutcome {
        metrics.used_trie = true;

        let ids = self.trie.find_prefix(&ctx.pattern, ctx.max_results);

        let mut hits = Vec::new();
        let mut seen = hashbrown::HashSet::new();
        for id in ids {
            if hits.len() >= ctx.max_results {
                break;
            }
            if !seen.insert(id) {
                continue;
            }
            let Some(meta) = self.meta(id) else { continue };
            if meta.is_tombstone() {
                continue;
            }
            if !check_file_permission(meta, ctx.uid, ctx.gid) {
                continue;
            }
            hits.push(QueryHit {
                id,
                score: 0.0,
                path: meta.path.clone(),
            });
        }

        SearchOutcome { hits, metrics }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

use crate::{
    index::Index,
    query::QueryHit,
    trigram::{Trigram, extract_into},
};

/// One query trigram with its inverse document frequency.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TrigramWeight {
    pub tri: Trigram,
    pub idf: f32,
}

/// idf(t) = ln(N / (df + 1)), floored at zero. Tombstoned ids still sit in
/// the posting lists, so df can transiently exceed the live count.
pub(crate) fn trigram_weights(index: &Index, trigrams: &[Trigram]) -> Vec<TrigramWeight> {
    let total = index.live_file_count().max(1) as f32;
    trigrams
        .iter()
        .map(|&tri| {
            let df = index.entry(tri).map_or(0, |e| e.file_count) as f32;
            let idf = (total / (df + 1.0)).ln().max(0.0);
            TrigramWeight { tri, idf }
        })
        .collect()
}

/// TF-IDF relevance of one path against the query trigrams, normalized by
/// sqrt of the path length so deep paths do not win on bulk.
///
/// tf(t) = occurrences of t in the path / (len - 2).
pub(crate) fn score_path(
    path: &[u8],
    weights: &[TrigramWeight],
    fold_case: bool,
    scratch: &mut Vec<Trigram>,
) -> f32 {
    if path.len() < 3 {
        return 0.0;
    }

    extract_into(path, fold_case, scratch);
    let windows = scratch.len() as f32;

    let mut sum = 0.0f32;
    for w in weights {
        let occurrences = scratch.iter().filter(|&&t| t == w.tri).count() as f32;
        sum += (occurrences / windows) * w.idf;
    }

    sum / (path.len() as f32).sqrt()
}

/// Order: relevance descending, id ascending on ties.
pub(crate) fn rank_hits(hits: &mut [QueryHit]) {
    hits.sort_unstable_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Drop candidates scoring under `threshold` of the best hit. Relative, so
/// a uniformly weak result set (tiny index, idf ~ 0) is kept intact.
pub(crate) fn apply_threshold(hits: &mut Vec<QueryHit>, threshold: f32) {
    let Some(best) = hits.first().map(|h| h.score) else {
        return;
    };
    if best <= 0.0 {
        return;
    }
    let cut = best * threshold;
    hits.retain(|h| h.score >= cut);
}

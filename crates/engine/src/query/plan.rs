use std::cmp::Ordering;

use crate::{
    error::Result,
    index::{Entry, FileId, Index},
    postings::Decoder,
    query::PipelineMetrics,
    trigram::Trigram,
};

/// Precomputed intersection plan over the query's posting lists.
///
/// Each query trigram's postings are decoded exactly once; lists are
/// intersected rarest-first so the working set shrinks as fast as possible.
/// Among equally rare lists, trigrams the secondary bloom marked hot go
/// first. An empty intermediate result short-circuits the remaining
/// decodes.
///
/// The result is the candidate set *and* the all-trigram confirmation in
/// one: every surviving id appears in every query trigram's posting list.
pub(crate) fn intersect_postings(
    index: &Index,
    trigrams: &[Trigram],
    hot: &[Trigram],
    metrics: &mut PipelineMetrics,
) -> Result<Vec<FileId>> {
    let mut entries: Vec<(&Entry, bool)> = Vec::with_capacity(trigrams.len());
    for &tri in trigrams {
        match index.entry(tri) {
            // Bloom false positive: the trigram was never indexed.
            None => return Ok(Vec::new()),
            Some(entry) => entries.push((entry, hot.contains(&tri))),
        }
    }

    entries.sort_by_key(|(e, is_hot)| (e.file_count, !is_hot));

    let mut decoder = Decoder::new()?;
    let mut acc: Option<Vec<FileId>> = None;

    for (entry, _) in entries {
        let list = decode_entry(index, entry, &mut decoder)?;
        metrics.postings_decoded += 1;

        acc = Some(match acc {
            None => list,
            Some(prev) => intersect_sorted(&prev, &list),
        });

        if acc.as_ref().is_some_and(|a| a.is_empty()) {
            break;
        }
    }

    Ok(acc.unwrap_or_default())
}

/// Decode an entry's current posting set: the sealed payload, the pending
/// (uncommitted) buffer, or both merged.
fn decode_entry(index: &Index, entry: &Entry, decoder: &mut Decoder) -> Result<Vec<FileId>> {
    let mut ids = if entry.is_sealed() {
        decoder.decode(index.payload(entry))?
    } else {
        Vec::new()
    };

    if let Some(pending) = &entry.buffer {
        ids.extend_from_slice(pending);
        ids.sort_unstable();
        ids.dedup();
    }

    Ok(ids)
}

/// Linear merge intersection of two sorted id lists.
pub(crate) fn intersect_sorted(a: &[FileId], b: &[FileId]) -> Vec<FileId> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));

    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }

    out
}

//! HNSW-backed `ColumnNameEvaluator`.
//!
//! Grounded on the teacher's `hnsw_index::HnswIndex`: same `hnsw_rs` wrapper
//! shape (an owned graph behind a `RwLock`, vectors stored separately so the
//! graph's internal indices can be mapped back to stable ids). Simplified
//! relative to the teacher in two ways, both recorded in DESIGN.md: a single
//! fixed cosine metric (the only one `colname.search` documents, §6), and no
//! incremental insert/delete — index mutation is the index-build
//! subsystem's job and is explicitly out of scope (§5 "Index snapshot"), so
//! the graph is built once from a snapshot and never mutated again.

use super::{ColumnNameEvaluator, EvaluatorError};
use crate::ids::ColumnId;
use hnsw_rs::dist::DistCosine;
use hnsw_rs::hnsw::Hnsw;
use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

const EMBED_DIM: usize = 64;

/// Embeds a column name as a bag-of-character-trigrams vector, normalized to
/// unit length. A cheap stand-in for a real name-embedding model — good
/// enough to make cosine similarity favor names sharing substrings.
fn embed(name: &str) -> Vec<f32> {
    let mut v = vec![0f32; EMBED_DIM];
    let chars: Vec<char> = name.to_lowercase().chars().collect();
    if chars.is_empty() {
        return v;
    }
    let padded: Vec<char> = std::iter::once('\u{2581}')
        .chain(chars.into_iter())
        .chain(std::iter::once('\u{2581}'))
        .collect();
    for window in padded.windows(3.min(padded.len())) {
        let mut h = DefaultHasher::new();
        window.hash(&mut h);
        let bucket = (h.finish() as usize) % EMBED_DIM;
        v[bucket] += 1.0;
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-10 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

struct HnswInner {
    hnsw: Hnsw<'static, f32, DistCosine>,
    // Keeps the Arc alive; the graph borrows from it for 'static (see Safety
    // note below, mirroring the teacher's `HnswInnerOwned`).
    _storage: Arc<Vec<Vec<f32>>>,
    index_to_column: Vec<ColumnId>,
}

// Safety: `_storage` is kept alive for exactly as long as `hnsw` (both live
// inside the same `HnswInner`, dropped together field-order-last), and
// nothing ever clones `_storage` out from under the graph.
unsafe impl Send for HnswInner {}
unsafe impl Sync for HnswInner {}

pub struct HnswColumnNameEvaluator {
    inner: RwLock<Option<HnswInner>>,
    names: Vec<(ColumnId, String)>,
    ef_search: usize,
}

impl HnswColumnNameEvaluator {
    /// Builds the graph once from a snapshot of `(column, name)` pairs.
    pub fn build(names: Vec<(ColumnId, String)>) -> Self {
        let ev = HnswColumnNameEvaluator { inner: RwLock::new(None), names, ef_search: 64 };
        ev.rebuild();
        ev
    }

    fn rebuild(&self) {
        if self.names.is_empty() {
            *self.inner.write() = None;
            return;
        }
        let storage: Vec<Vec<f32>> = self.names.iter().map(|(_, n)| embed(n)).collect();
        let index_to_column: Vec<ColumnId> = self.names.iter().map(|(c, _)| *c).collect();
        let storage = Arc::new(storage);

        // SAFETY: extends the borrow to 'static; sound because `storage`
        // (the Arc) moves into `HnswInner::_storage`, keeping refcount >= 1
        // for exactly as long as `hnsw` (which holds the reference) lives,
        // and no code path ever clones `_storage` out of `HnswInner`.
        let storage_ref: &'static Vec<Vec<f32>> = unsafe { &*Arc::as_ptr(&storage).cast() };

        let n = storage_ref.len();
        let m = 16;
        let max_layer = if n <= 1 { 4 } else { ((n as f64).ln() / (m as f64).ln()).ceil() as usize }.clamp(4, 16);
        let mut hnsw: Hnsw<'static, f32, DistCosine> = Hnsw::new(m, n, max_layer, 200, DistCosine {});
        hnsw.set_keeping_pruned(true);

        for (idx, vec) in storage_ref.iter().enumerate() {
            hnsw.insert((vec, idx));
        }

        *self.inner.write() = Some(HnswInner { hnsw, _storage: storage, index_to_column });
    }
}

impl ColumnNameEvaluator for HnswColumnNameEvaluator {
    fn search(&self, name: &str, k: u32) -> Result<Vec<ColumnId>, EvaluatorError> {
        if k == 0 {
            let query = name.to_lowercase();
            return Ok(self
                .names
                .iter()
                .filter(|(_, n)| n.to_lowercase() == query)
                .map(|(id, _)| *id)
                .collect());
        }

        let guard = self.inner.read();
        let Some(inner) = guard.as_ref() else {
            return Ok(Vec::new());
        };

        let query_vec = embed(name);
        let raw = inner.hnsw.search(&query_vec, k as usize, self.ef_search);
        let mut results: Vec<(ColumnId, f32)> = raw
            .into_iter()
            .filter_map(|n| inner.index_to_column.get(n.d_id).map(|c| (*c, n.distance)))
            .collect();
        results.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        results.truncate(k as usize);
        Ok(results.into_iter().map(|(c, _)| c).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_with_k_zero() {
        let ev = HnswColumnNameEvaluator::build(vec![
            (ColumnId(0), "age".into()),
            (ColumnId(1), "ages".into()),
        ]);
        assert_eq!(ev.search("age", 0).unwrap(), vec![ColumnId(0)]);
    }

    #[test]
    fn nearest_neighbor_favors_shared_trigrams() {
        let ev = HnswColumnNameEvaluator::build(vec![
            (ColumnId(0), "age".into()),
            (ColumnId(1), "ages".into()),
            (ColumnId(2), "unrelated_field".into()),
        ]);
        let got = ev.search("age", 2).unwrap();
        assert!(got.contains(&ColumnId(0)));
    }

    #[test]
    fn empty_index_returns_empty() {
        let ev = HnswColumnNameEvaluator::build(Vec::new());
        assert_eq!(ev.search("age", 3).unwrap(), Vec::<ColumnId>::new());
    }
}

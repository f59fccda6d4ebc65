//! Small in-memory evaluator implementations: good enough for the test
//! suite, the REPL's `.load` demo fixtures, and documentation examples.
//! None of these are meant to be fast or complete — the real index
//! back-ends live outside this crate (§6).

use super::{ColumnNameEvaluator, EvaluatorError, FainderMode, KeywordEvaluator, KeywordHits, PercentileEvaluator};
use crate::ast::Comparator;
use crate::candidates::IdSet;
use crate::ids::{ColumnId, DatasetId, HistogramId};
use std::collections::HashMap;

/// Splits the toy keyword query language the optimizer's keyword-merge pass
/// emits: a single term, or terms joined homogeneously by `" AND "` or
/// `" OR "` (never mixed — merging only ever fuses siblings of the same
/// connective, §4.2(b)).
fn parse_toy_query(query: &str) -> (Vec<String>, bool) {
    if query.contains(" AND ") {
        (query.split(" AND ").map(|t| t.trim().to_lowercase()).collect(), true)
    } else if query.contains(" OR ") {
        (query.split(" OR ").map(|t| t.trim().to_lowercase()).collect(), false)
    } else {
        (vec![query.trim().to_lowercase()], true)
    }
}

/// A keyword evaluator over an in-memory document map. Scores documents by
/// the count of matched terms (substring match, case-insensitive).
pub struct InMemoryKeywordEvaluator {
    documents: HashMap<DatasetId, String>,
}

impl InMemoryKeywordEvaluator {
    pub fn new(documents: HashMap<DatasetId, String>) -> Self {
        InMemoryKeywordEvaluator { documents }
    }
}

impl KeywordEvaluator for InMemoryKeywordEvaluator {
    fn search(
        &self,
        query: &str,
        candidates: Option<&IdSet>,
        min_score: f64,
        max_results: usize,
    ) -> Result<KeywordHits, EvaluatorError> {
        let (terms, is_and) = parse_toy_query(query);
        let mut hits = KeywordHits::default();

        for (dataset, text) in &self.documents {
            if let Some(c) = candidates {
                if !c.contains(dataset.0) {
                    continue;
                }
            }
            let text_lower = text.to_lowercase();
            let matched = terms.iter().filter(|t| text_lower.contains(t.as_str())).count();
            let passes = if is_and { matched == terms.len() } else { matched > 0 };
            if !passes {
                continue;
            }
            let score = matched as f64;
            if score < min_score {
                continue;
            }
            hits.scores.insert(*dataset, score);
            hits.snippets.insert(*dataset, text.chars().take(80).collect());
        }

        if hits.scores.len() > max_results {
            let mut ranked: Vec<_> = hits.scores.iter().map(|(d, s)| (*d, *s)).collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
            ranked.truncate(max_results);
            let keep: std::collections::HashSet<DatasetId> = ranked.iter().map(|(d, _)| *d).collect();
            hits.scores.retain(|d, _| keep.contains(d));
            hits.snippets.retain(|d, _| keep.contains(d));
        }

        Ok(hits)
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for i in 1..=a.len() {
        let mut prev = row[0];
        row[0] = i;
        for j in 1..=b.len() {
            let tmp = row[j];
            row[j] = if a[i - 1] == b[j - 1] {
                prev
            } else {
                1 + prev.min(row[j]).min(row[j - 1])
            };
            prev = tmp;
        }
    }
    row[b.len()]
}

/// A column-name evaluator ranking by edit distance to the query string.
/// `k = 0` returns exact (distance-0) matches only (§8 "k=0 in NAME resolves
/// to exact match only").
pub struct InMemoryColumnNameEvaluator {
    columns: Vec<(ColumnId, String)>,
}

impl InMemoryColumnNameEvaluator {
    pub fn new(columns: Vec<(ColumnId, String)>) -> Self {
        InMemoryColumnNameEvaluator { columns }
    }
}

impl ColumnNameEvaluator for InMemoryColumnNameEvaluator {
    fn search(&self, name: &str, k: u32) -> Result<Vec<ColumnId>, EvaluatorError> {
        let query = name.to_lowercase();
        if k == 0 {
            return Ok(self
                .columns
                .iter()
                .filter(|(_, n)| n.to_lowercase() == query)
                .map(|(id, _)| *id)
                .collect());
        }

        let mut ranked: Vec<(ColumnId, usize)> =
            self.columns.iter().map(|(id, n)| (*id, levenshtein(&query, &n.to_lowercase()))).collect();
        ranked.sort_by_key(|(id, dist)| (*dist, id.0));
        ranked.truncate(k as usize);
        Ok(ranked.into_iter().map(|(id, _)| id).collect())
    }
}

fn percentile_value(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let idx = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = idx.floor() as usize;
            let hi = idx.ceil() as usize;
            if lo == hi {
                sorted[lo]
            } else {
                let frac = idx - lo as f64;
                sorted[lo] * (1.0 - frac) + sorted[hi] * frac
            }
        }
    }
}

fn satisfies(value: f64, comparator: Comparator, v: f64) -> bool {
    match comparator {
        Comparator::Ge => value >= v,
        Comparator::Gt => value > v,
        Comparator::Le => value <= v,
        Comparator::Lt => value < v,
    }
}

/// A percentile evaluator over per-histogram sample distributions. Computes
/// the value at percentile `p` by linear interpolation over sorted samples,
/// and tests it against `comparator v`.
pub struct InMemoryPercentileEvaluator {
    samples: HashMap<HistogramId, Vec<f64>>,
}

impl InMemoryPercentileEvaluator {
    pub fn new(mut samples: HashMap<HistogramId, Vec<f64>>) -> Self {
        for s in samples.values_mut() {
            s.sort_by(|a, b| a.total_cmp(b));
        }
        InMemoryPercentileEvaluator { samples }
    }
}

impl PercentileEvaluator for InMemoryPercentileEvaluator {
    fn search(
        &self,
        p: f64,
        comparator: Comparator,
        v: f64,
        candidates: Option<&IdSet>,
        _mode: FainderMode,
    ) -> Result<IdSet, EvaluatorError> {
        if !(0.0..=1.0).contains(&p) {
            return Err(EvaluatorError::Malformed(format!("percentile {p} outside [0,1]")));
        }
        let mut out = Vec::new();
        for (hist, sorted) in &self.samples {
            if let Some(c) = candidates {
                if !c.contains(hist.0) {
                    continue;
                }
            }
            let value = percentile_value(sorted, p);
            if satisfies(value, comparator, v) {
                out.push(hist.0);
            }
        }
        Ok(out.into_iter().collect())
    }
}

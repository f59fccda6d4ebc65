//! # Executors (§4.3-4.5)
//!
//! Three implementations of the same semantics (§8: "for every AST t and
//! executor mode m, `execute_mode(t, m) = eval(t)` as sets") trading
//! simplicity for performance: [`sequential`] (no candidate sets, easiest to
//! reason about and the reference for the other two), [`prefilter`] (single
//! threaded, candidate-set propagation through read/write groups), and
//! [`threaded`] (prefilter plus a bounded worker pool).

pub mod cancellation;
pub mod groups;
pub mod prefilter;
pub mod sequential;
pub mod threaded;

use crate::candidates::IdSet;
use crate::evaluators::{
    ColumnNameEvaluator, EvaluatorError, EvaluatorKind, FainderMode, KeywordEvaluator, PercentileEvaluator,
};
use crate::executor::cancellation::CancelReason;
use crate::ids::{DatasetId, MetaTables};
use crate::optimizer::OptimizedQuery;
use std::collections::HashMap;
use thiserror::Error;

/// Everything that can interrupt `Executor::execute` short of a clean
/// result (§7: these are the executor-local causes that the top-level
/// `EngineError` later classifies as `EvaluatorUnavailable` /
/// `EvaluatorMalformed` / `Cancelled` / `Timeout`).
#[derive(Debug, Clone, Error)]
pub enum ExecutorError {
    #[error("{which} evaluator error: {source}")]
    Evaluator { which: EvaluatorKind, source: EvaluatorError },
    #[error("query cancelled")]
    Cancelled,
    #[error("query exceeded its deadline")]
    TimedOut,
}

impl ExecutorError {
    pub fn evaluator(which: EvaluatorKind, source: EvaluatorError) -> Self {
        ExecutorError::Evaluator { which, source }
    }
}

impl From<CancelReason> for ExecutorError {
    fn from(r: CancelReason) -> Self {
        match r {
            CancelReason::Cancelled => ExecutorError::Cancelled,
            CancelReason::TimedOut => ExecutorError::TimedOut,
        }
    }
}

/// Which of the three executors to run (§6 `execute(query_string, mode,
/// fainder_mode)`, §4.6 cache key's "evaluator-mode" component).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorMode {
    Sequential,
    Prefilter,
    Threaded,
}

/// Which id space the traversal is currently producing results in:
/// dataset ids everywhere except inside a column scope (§3 "Column-scope
/// node").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdSpace {
    Dataset,
    Column,
}

impl IdSpace {
    pub fn universe_size(self, meta: &MetaTables) -> u32 {
        match self {
            IdSpace::Dataset => meta.num_datasets(),
            IdSpace::Column => meta.num_columns(),
        }
    }
}

/// One evaluation strategy for an already-optimized query (§4.3-4.5). All
/// three share the exact same semantics (§8: "for every AST t and executor
/// mode m, the result sets agree") — they differ only in how aggressively
/// they exploit read/write groups and worker parallelism.
pub trait Executor {
    fn execute(
        &self,
        query: &OptimizedQuery,
        evaluators: &Evaluators,
        meta: &MetaTables,
        params: &ExecutionParams,
        cancel: &cancellation::CancellationToken,
    ) -> Result<EvalResult, ExecutorError>;
}

/// The three evaluator back-ends bundled for one query (§5 "Index
/// snapshot": these are borrowed for the query's duration and never
/// mutated).
pub struct Evaluators<'a> {
    pub keyword: &'a dyn KeywordEvaluator,
    pub column_name: &'a dyn ColumnNameEvaluator,
    pub percentile: &'a dyn PercentileEvaluator,
}

/// Per-query knobs carried from `Config` (§6 "Configuration").
#[derive(Debug, Clone, Copy)]
pub struct ExecutionParams {
    pub keyword_min_score: f64,
    pub keyword_max_results: usize,
    pub fainder_mode: FainderMode,
}

/// The result of evaluating one AST node. Every combinator propagates
/// `ids`; `scores`/`snippets` only ever originate at a keyword leaf (§9
/// "Scoring: scores come only from the keyword evaluator") and are carried
/// up only through AND/OR/XOR, filtered to the ids that survive the set
/// operation. `Not` and `ColumnScope` clear them: a negated result has no
/// positive evidence to score by, and a column-scope result is a different
/// id space than any surviving scores were computed over.
#[derive(Debug, Clone, Default)]
pub struct EvalResult {
    pub ids: IdSet,
    pub scores: HashMap<DatasetId, f64>,
    pub snippets: HashMap<DatasetId, String>,
}

impl EvalResult {
    pub fn from_ids(ids: IdSet) -> Self {
        EvalResult { ids, scores: HashMap::new(), snippets: HashMap::new() }
    }

    /// The terminal scoring join (§3 "Result set"): if the AST contained a
    /// keyword leaf, `scores` is non-empty and ids carrying a score are
    /// ranked by descending score, ties broken by ascending id; any
    /// surviving id the keyword evaluator never scored (reached only
    /// through a non-keyword sibling of an OR) sorts after every scored id.
    /// With no keyword leaf at all, `scores` is empty and this is plain
    /// ascending-id order.
    pub fn ranked_ids(&self) -> Vec<DatasetId> {
        let mut ids: Vec<DatasetId> = self.ids.iter().map(DatasetId).collect();
        ids.sort_by(|a, b| match (self.scores.get(a), self.scores.get(b)) {
            (Some(x), Some(y)) => y.total_cmp(x).then_with(|| a.cmp(b)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.cmp(b),
        });
        ids
    }

    fn filtered_to(&self, ids: &IdSet) -> (HashMap<DatasetId, f64>, HashMap<DatasetId, String>) {
        let scores = self.scores.iter().filter(|(d, _)| ids.contains(d.0)).map(|(d, s)| (*d, *s)).collect();
        let snippets =
            self.snippets.iter().filter(|(d, _)| ids.contains(d.0)).map(|(d, s)| (d.clone(), s.clone())).collect();
        (scores, snippets)
    }
}

pub fn intersect_results(a: EvalResult, b: EvalResult) -> EvalResult {
    let ids = a.ids.intersection(&b.ids);
    let (mut scores, mut snippets) = a.filtered_to(&ids);
    let (bs, bn) = b.filtered_to(&ids);
    scores.extend(bs);
    snippets.extend(bn);
    EvalResult { ids, scores, snippets }
}

pub fn union_results(a: EvalResult, b: EvalResult) -> EvalResult {
    let ids = a.ids.union(&b.ids);
    let mut scores = a.scores;
    for (d, s) in b.scores {
        scores.entry(d).and_modify(|cur| *cur = cur.max(s)).or_insert(s);
    }
    let mut snippets = a.snippets;
    snippets.extend(b.snippets);
    EvalResult { ids, scores, snippets }
}

pub fn symmetric_difference_results(a: EvalResult, b: EvalResult) -> EvalResult {
    let ids = a.ids.symmetric_difference(&b.ids);
    let (scores, snippets) = {
        let mut scores = a.scores;
        let mut snippets = a.snippets;
        scores.extend(b.scores);
        snippets.extend(b.snippets);
        (scores, snippets)
    };
    let scores = scores.into_iter().filter(|(d, _)| ids.contains(d.0)).collect();
    let snippets = snippets.into_iter().filter(|(d, _)| ids.contains(d.0)).collect();
    EvalResult { ids, scores, snippets }
}

pub fn complement_result(a: &EvalResult, universe_size: u32) -> EvalResult {
    EvalResult::from_ids(a.ids.complement(universe_size))
}

/// Lifts a column-id result up through a column-scope boundary: a dataset
/// matches iff it has at least one column in `inner` (§3 "Column-scope
/// node"). Scores never cross this boundary (keyword leaves cannot appear
/// inside a column scope, §3 "invariants").
pub fn lift_column_result_to_datasets(inner: &IdSet, meta: &MetaTables) -> IdSet {
    inner.iter().map(|c| meta.column_to_dataset(crate::ids::ColumnId(c)).0).collect()
}

/// Expands a dataset-id candidate set to the column ids of those datasets,
/// for entering a column scope with candidates from above (§4.4).
pub fn expand_dataset_candidates_to_columns(datasets: &IdSet, meta: &MetaTables) -> IdSet {
    meta.datasets_to_columns(datasets.iter().map(DatasetId)).into_iter().map(|c| c.0).collect()
}

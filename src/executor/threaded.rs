//! Threaded-with-prefilter executor (§4.5): a bounded rayon worker pool
//! evaluates independent subtrees concurrently.
//!
//! `AND` children share one write group by construction (§4.2(d)), which
//! makes each later sibling a genuine consumer of an earlier one's result —
//! running them concurrently would race on which one "publishes first" and
//! silently forfeit the prefiltering benefit (still *correct*, since the
//! combinator re-intersects full result sets regardless, but pointless).
//! They are therefore evaluated left-to-right on the calling thread, same
//! as `prefilter`, with an added early exit (§4.5 "if any sibling under an
//! AND returns the empty set ... in-flight sibling computations may be
//! cancelled"): once the running intersection is empty, remaining siblings
//! are skipped outright rather than merely de-prioritized. `OR` and `XOR`
//! children each allocate a unique write group with no cross-sibling read
//! dependency, so they fan out across the pool via `par_iter`, grounded on
//! the teacher's rayon-based parallel-query pattern in `storage_engine`.

use super::groups::GroupStore;
use super::{
    complement_result, expand_dataset_candidates_to_columns, intersect_results, lift_column_result_to_datasets,
    symmetric_difference_results, union_results, EvalResult, ExecutionParams, Executor, ExecutorError, Evaluators,
    IdSpace,
};
use crate::candidates::IdSet;
use crate::evaluators::EvaluatorKind;
use crate::executor::cancellation::CancellationToken;
use crate::ids::{ColumnId, HistogramId, MetaTables};
use crate::optimizer::{Annotated, GroupId, Groups, OptimizedQuery};
use rayon::prelude::*;

pub struct ThreadedExecutor {
    pool: rayon::ThreadPool,
}

impl ThreadedExecutor {
    pub fn new(worker_pool_size: usize) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_pool_size.max(1))
            .build()
            .expect("worker pool construction should not fail for a positive thread count");
        ThreadedExecutor { pool }
    }
}

impl Executor for ThreadedExecutor {
    fn execute(
        &self,
        query: &OptimizedQuery,
        evaluators: &Evaluators,
        meta: &MetaTables,
        params: &ExecutionParams,
        cancel: &CancellationToken,
    ) -> Result<EvalResult, ExecutorError> {
        cancel.check()?;
        let store = GroupStore::new();
        self.pool
            .install(|| eval(&query.annotated, IdSpace::Dataset, &store, evaluators, meta, params, cancel))
    }
}

fn boundary_groups(g: &Groups) -> Vec<GroupId> {
    let mut ids = g.read.clone();
    ids.push(g.write);
    ids
}

fn eval(
    node: &Annotated,
    space: IdSpace,
    store: &GroupStore,
    evaluators: &Evaluators,
    meta: &MetaTables,
    params: &ExecutionParams,
    cancel: &CancellationToken,
) -> Result<EvalResult, ExecutorError> {
    cancel.check()?;
    match node {
        Annotated::Keyword(leaf, g) => {
            let candidate = store.candidate_for(&g.read, space);
            let result = if matches!(&candidate, Some(c) if c.is_empty()) {
                EvalResult::default()
            } else {
                let hits = evaluators
                    .keyword
                    .search(&leaf.query, candidate.as_ref(), params.keyword_min_score, params.keyword_max_results)
                    .map_err(|e| ExecutorError::evaluator(EvaluatorKind::Keyword, e))?;
                let ids = hits.ids();
                EvalResult { ids, scores: hits.scores, snippets: hits.snippets }
            };
            store.narrow(g.write, space, &result.ids);
            Ok(result)
        }
        Annotated::ColumnName(leaf, g) => {
            let candidate = store.candidate_for(&g.read, space);
            let ids = if matches!(&candidate, Some(c) if c.is_empty()) {
                IdSet::empty()
            } else {
                let raw = evaluators
                    .column_name
                    .search(&leaf.name, leaf.k)
                    .map_err(|e| ExecutorError::evaluator(EvaluatorKind::ColumnName, e))?;
                let raw_set: IdSet = raw.into_iter().map(|c| c.0).collect();
                match &candidate {
                    Some(c) => raw_set.intersection(c),
                    None => raw_set,
                }
            };
            store.narrow(g.write, space, &ids);
            Ok(EvalResult::from_ids(ids))
        }
        Annotated::Percentile(leaf, g) => {
            let candidate = store.candidate_for(&g.read, space);
            let ids = if matches!(&candidate, Some(c) if c.is_empty()) {
                IdSet::empty()
            } else {
                let histogram_candidate: Option<IdSet> = candidate
                    .as_ref()
                    .map(|c| meta.columns_to_histograms(c.iter().map(ColumnId)).into_iter().map(|h| h.0).collect());
                let histograms = evaluators
                    .percentile
                    .search(leaf.p, leaf.comparator, leaf.v, histogram_candidate.as_ref(), params.fainder_mode)
                    .map_err(|e| ExecutorError::evaluator(EvaluatorKind::Percentile, e))?;
                meta.histograms_to_columns(histograms.iter().map(HistogramId)).into_iter().map(|c| c.0).collect()
            };
            store.narrow(g.write, space, &ids);
            Ok(EvalResult::from_ids(ids))
        }
        Annotated::ColumnScope(inner, g) => {
            let outer_candidate = store.candidate_for(&g.read, IdSpace::Dataset);
            if matches!(&outer_candidate, Some(c) if c.is_empty()) {
                store.narrow(g.write, IdSpace::Dataset, &IdSet::empty());
                return Ok(EvalResult::default());
            }

            let inner_store = GroupStore::new();
            if let Some(ds_candidate) = &outer_candidate {
                let col_candidate = expand_dataset_candidates_to_columns(ds_candidate, meta);
                for group in boundary_groups(g) {
                    inner_store.narrow(group, IdSpace::Column, &col_candidate);
                }
            }

            let inner_result = eval(inner, IdSpace::Column, &inner_store, evaluators, meta, params, cancel)?;
            let dataset_ids = lift_column_result_to_datasets(&inner_result.ids, meta);
            store.narrow(g.write, IdSpace::Dataset, &dataset_ids);
            Ok(EvalResult::from_ids(dataset_ids))
        }
        Annotated::Not(inner) => {
            let inner_result = eval(inner, space, store, evaluators, meta, params, cancel)?;
            Ok(complement_result(&inner_result, space.universe_size(meta)))
        }
        Annotated::And(children) => {
            let mut iter = children.iter();
            let first = iter.next().expect("And always has at least two children");
            let mut acc = eval(first, space, store, evaluators, meta, params, cancel)?;
            for child in iter {
                if acc.ids.is_empty() {
                    break;
                }
                let next = eval(child, space, store, evaluators, meta, params, cancel)?;
                acc = intersect_results(acc, next);
            }
            Ok(acc)
        }
        Annotated::Or(children) => fold_parallel(children, space, store, evaluators, meta, params, cancel, union_results),
        Annotated::Xor(children) => {
            fold_parallel(children, space, store, evaluators, meta, params, cancel, symmetric_difference_results)
        }
    }
}

fn fold_parallel(
    children: &[Annotated],
    space: IdSpace,
    store: &GroupStore,
    evaluators: &Evaluators,
    meta: &MetaTables,
    params: &ExecutionParams,
    cancel: &CancellationToken,
    combine: fn(EvalResult, EvalResult) -> EvalResult,
) -> Result<EvalResult, ExecutorError> {
    let results: Vec<EvalResult> = children
        .par_iter()
        .map(|c| eval(c, space, store, evaluators, meta, params, cancel))
        .collect::<Result<Vec<_>, ExecutorError>>()?;
    let mut iter = results.into_iter();
    let first = iter.next().expect("Or/Xor always have at least two children");
    Ok(iter.fold(first, combine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::memory::{InMemoryColumnNameEvaluator, InMemoryKeywordEvaluator, InMemoryPercentileEvaluator};
    use crate::evaluators::FainderMode;
    use crate::ids::DatasetId;
    use crate::optimizer::{optimize, NoCostHints};
    use crate::parser::parse;
    use std::collections::HashMap;

    fn meta() -> MetaTables {
        MetaTables::new(vec![DatasetId(0), DatasetId(0), DatasetId(1)], vec![ColumnId(0)])
    }

    fn params() -> ExecutionParams {
        ExecutionParams { keyword_min_score: 0.0, keyword_max_results: 100, fainder_mode: FainderMode::Exact }
    }

    #[test]
    fn and_short_circuits_on_empty_sibling() {
        let kw = InMemoryKeywordEvaluator::new(HashMap::new());
        let name = InMemoryColumnNameEvaluator::new(vec![(ColumnId(0), "age".into())]);
        let pct = InMemoryPercentileEvaluator::new(HashMap::new());
        let evs = Evaluators { keyword: &kw, column_name: &name, percentile: &pct };

        let ast = parse("KW('nothing') AND COL(NAME('age';4))").unwrap();
        let optimized = optimize(ast, &NoCostHints);
        let exec = ThreadedExecutor::new(2);
        let result = exec.execute(&optimized, &evs, &meta(), &params(), &CancellationToken::unbounded()).unwrap();
        assert!(result.ids.is_empty());
    }

    #[test]
    fn or_fans_out_and_agrees_with_sequential() {
        let kw = InMemoryKeywordEvaluator::new(HashMap::from([(DatasetId(1), "weather".to_string())]));
        let name = InMemoryColumnNameEvaluator::new(vec![(ColumnId(0), "age".into())]);
        let pct = InMemoryPercentileEvaluator::new(HashMap::new());
        let evs = Evaluators { keyword: &kw, column_name: &name, percentile: &pct };

        let ast = parse("KW('weather') OR COL(NAME('age';4))").unwrap();
        let optimized = optimize(ast, &NoCostHints);
        let seq = super::super::sequential::SequentialExecutor
            .execute(&optimized, &evs, &meta(), &params(), &CancellationToken::unbounded())
            .unwrap();
        let threaded =
            ThreadedExecutor::new(4).execute(&optimized, &evs, &meta(), &params(), &CancellationToken::unbounded()).unwrap();
        let mut a: Vec<u32> = seq.ids.iter().collect();
        let mut b: Vec<u32> = threaded.ids.iter().collect();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }
}

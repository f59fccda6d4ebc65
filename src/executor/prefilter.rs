//! Prefilter executor (§4.4): single-threaded, candidate sets threaded
//! through the read/write groups allocated by `optimizer::groups`.

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

pub struct PrefilterExecutor;

impl Executor for PrefilterExecutor {
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
        eval(&query.annotated, IdSpace::Dataset, &store, evaluators, meta, params, cancel)
    }
}

/// Every group id a leaf directly beneath a column-scope boundary may read
/// or write: the scope's own `(write, read)` pair, which its immediate
/// inner subtree reuses unchanged (§4.2(d) "Column-scope child: inherits").
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
                // `colname.search` has no candidate parameter (§6); apply
                // the read-group restriction as a post-filter instead.
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

            // Fresh nested store: the inner subtree may reuse the same
            // numeric group ids as a sibling column scope elsewhere in the
            // tree, and those must not see each other's column-space
            // values (see module docs on `(GroupId, IdSpace)` keys).
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
        Annotated::And(children) => fold(children, space, store, evaluators, meta, params, cancel, intersect_results),
        Annotated::Or(children) => fold(children, space, store, evaluators, meta, params, cancel, union_results),
        Annotated::Xor(children) => {
            fold(children, space, store, evaluators, meta, params, cancel, symmetric_difference_results)
        }
    }
}

fn fold(
    children: &[Annotated],
    space: IdSpace,
    store: &GroupStore,
    evaluators: &Evaluators,
    meta: &MetaTables,
    params: &ExecutionParams,
    cancel: &CancellationToken,
    combine: fn(EvalResult, EvalResult) -> EvalResult,
) -> Result<EvalResult, ExecutorError> {
    let mut iter = children.iter();
    let first = iter.next().expect("And/Or/Xor always have at least two children");
    let mut acc = eval(first, space, store, evaluators, meta, params, cancel)?;
    for child in iter {
        let next = eval(child, space, store, evaluators, meta, params, cancel)?;
        acc = combine(acc, next);
    }
    Ok(acc)
}

//! Sequential executor (§4.3): post-order traversal, no candidate sets.
//! Reference implementation the other two executors are checked against
//! (§8).

use super::{
    complement_result, intersect_results, lift_column_result_to_datasets, symmetric_difference_results,
    union_results, EvalResult, ExecutionParams, Executor, ExecutorError, Evaluators, IdSpace,
};
use crate::evaluators::{EvaluatorKind, KeywordHits};
use crate::ids::MetaTables;
use crate::optimizer::{Annotated, OptimizedQuery};
use crate::executor::cancellation::CancellationToken;

pub struct SequentialExecutor;

impl Executor for SequentialExecutor {
    fn execute(
        &self,
        query: &OptimizedQuery,
        evaluators: &Evaluators,
        meta: &MetaTables,
        params: &ExecutionParams,
        cancel: &CancellationToken,
    ) -> Result<EvalResult, ExecutorError> {
        cancel.check()?;
        eval(&query.annotated, IdSpace::Dataset, evaluators, meta, params, cancel)
    }
}

fn eval(
    node: &Annotated,
    space: IdSpace,
    evaluators: &Evaluators,
    meta: &MetaTables,
    params: &ExecutionParams,
    cancel: &CancellationToken,
) -> Result<EvalResult, ExecutorError> {
    cancel.check()?;
    match node {
        Annotated::Keyword(leaf, _) => {
            let hits: KeywordHits = evaluators
                .keyword
                .search(&leaf.query, None, params.keyword_min_score, params.keyword_max_results)
                .map_err(|e| ExecutorError::evaluator(EvaluatorKind::Keyword, e))?;
            let ids = hits.ids();
            Ok(EvalResult { ids, scores: hits.scores, snippets: hits.snippets })
        }
        Annotated::ColumnName(leaf, _) => {
            let cols = evaluators
                .column_name
                .search(&leaf.name, leaf.k)
                .map_err(|e| ExecutorError::evaluator(EvaluatorKind::ColumnName, e))?;
            Ok(EvalResult::from_ids(cols.into_iter().map(|c| c.0).collect()))
        }
        Annotated::Percentile(leaf, _) => {
            let histograms = evaluators
                .percentile
                .search(leaf.p, leaf.comparator, leaf.v, None, params.fainder_mode)
                .map_err(|e| ExecutorError::evaluator(EvaluatorKind::Percentile, e))?;
            let columns = meta.histograms_to_columns(histograms.iter().map(crate::ids::HistogramId));
            Ok(EvalResult::from_ids(columns.into_iter().map(|c| c.0).collect()))
        }
        Annotated::ColumnScope(inner, _) => {
            let inner_result = eval(inner, IdSpace::Column, evaluators, meta, params, cancel)?;
            Ok(EvalResult::from_ids(lift_column_result_to_datasets(&inner_result.ids, meta)))
        }
        Annotated::Not(inner) => {
            let inner_result = eval(inner, space, evaluators, meta, params, cancel)?;
            Ok(complement_result(&inner_result, space.universe_size(meta)))
        }
        Annotated::And(children) => fold_children(children, space, evaluators, meta, params, cancel, intersect_results),
        Annotated::Or(children) => fold_children(children, space, evaluators, meta, params, cancel, union_results),
        Annotated::Xor(children) => {
            fold_children(children, space, evaluators, meta, params, cancel, symmetric_difference_results)
        }
    }
}

fn fold_children(
    children: &[Annotated],
    space: IdSpace,
    evaluators: &Evaluators,
    meta: &MetaTables,
    params: &ExecutionParams,
    cancel: &CancellationToken,
    combine: fn(EvalResult, EvalResult) -> EvalResult,
) -> Result<EvalResult, ExecutorError> {
    let mut iter = children.iter();
    let first = iter.next().expect("And/Or/Xor always have at least two children");
    let mut acc = eval(first, space, evaluators, meta, params, cancel)?;
    for child in iter {
        let next = eval(child, space, evaluators, meta, params, cancel)?;
        acc = combine(acc, next);
    }
    Ok(acc)
}

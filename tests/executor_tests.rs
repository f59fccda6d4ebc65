//! Executor semantic-agreement tests (§4.3-4.5, §8 "for every AST t and
//! executor mode m, the result sets agree").

use fainder_query::evaluators::memory::{InMemoryColumnNameEvaluator, InMemoryKeywordEvaluator, InMemoryPercentileEvaluator};
use fainder_query::evaluators::FainderMode;
use fainder_query::executor::cancellation::CancellationToken;
use fainder_query::executor::prefilter::PrefilterExecutor;
use fainder_query::executor::sequential::SequentialExecutor;
use fainder_query::executor::threaded::ThreadedExecutor;
use fainder_query::executor::{EvalResult, ExecutionParams, Evaluators, Executor};
use fainder_query::ids::{ColumnId, DatasetId, HistogramId, MetaTables};
use fainder_query::optimizer::{optimize, NoCostHints};
use fainder_query::parser::parse;
use std::collections::HashMap;

/// Three datasets (0,1,2), four columns (0,1 -> dataset 0; 2 -> dataset 1;
/// 3 -> dataset 2), two histograms (over columns 0 and 2).
fn meta() -> MetaTables {
    MetaTables::new(
        vec![DatasetId(0), DatasetId(0), DatasetId(1), DatasetId(2)],
        vec![ColumnId(0), ColumnId(2)],
    )
}

fn keyword_eval() -> InMemoryKeywordEvaluator {
    InMemoryKeywordEvaluator::new(HashMap::from([
        (DatasetId(0), "lung cancer incidence by county".to_string()),
        (DatasetId(1), "daily weather observations".to_string()),
        (DatasetId(2), "household income survey".to_string()),
    ]))
}

fn column_name_eval() -> InMemoryColumnNameEvaluator {
    InMemoryColumnNameEvaluator::new(vec![
        (ColumnId(0), "age".to_string()),
        (ColumnId(1), "county_fips".to_string()),
        (ColumnId(2), "temperature_celsius".to_string()),
        (ColumnId(3), "household_income".to_string()),
    ])
}

fn percentile_eval() -> InMemoryPercentileEvaluator {
    InMemoryPercentileEvaluator::new(HashMap::from([
        (HistogramId(0), vec![20.0, 35.0, 50.0, 65.0, 80.0]),
        (HistogramId(1), vec![-5.0, 10.0, 22.0, 31.0]),
    ]))
}

fn params() -> ExecutionParams {
    ExecutionParams { keyword_min_score: 0.0, keyword_max_results: 100, fainder_mode: FainderMode::FullPrecision }
}

fn run_all_modes(query: &str) -> (EvalResult, EvalResult, EvalResult) {
    let ast = parse(query).unwrap();
    let optimized = optimize(ast, &NoCostHints);
    let meta = meta();
    let keyword = keyword_eval();
    let column_name = column_name_eval();
    let percentile = percentile_eval();
    let evaluators = Evaluators { keyword: &keyword, column_name: &column_name, percentile: &percentile };
    let params = params();
    let cancel = CancellationToken::unbounded();

    let seq = SequentialExecutor.execute(&optimized, &evaluators, &meta, &params, &cancel).unwrap();
    let pre = PrefilterExecutor.execute(&optimized, &evaluators, &meta, &params, &cancel).unwrap();
    let threaded = ThreadedExecutor::new(2).execute(&optimized, &evaluators, &meta, &params, &cancel).unwrap();
    (seq, pre, threaded)
}

fn sorted(ids: &fainder_query::candidates::IdSet) -> Vec<u32> {
    let mut v: Vec<u32> = ids.iter().collect();
    v.sort_unstable();
    v
}

#[test]
fn a_bare_keyword_leaf_agrees_across_all_three_executors() {
    let (seq, pre, threaded) = run_all_modes("KW('cancer')");
    assert_eq!(sorted(&seq.ids), vec![0]);
    assert_eq!(sorted(&seq.ids), sorted(&pre.ids));
    assert_eq!(sorted(&seq.ids), sorted(&threaded.ids));
}

#[test]
fn an_and_of_keyword_and_percentile_agrees_across_all_three_executors() {
    let (seq, pre, threaded) = run_all_modes("KW('cancer') AND COL(PP(0.5;ge;40))");
    assert_eq!(sorted(&seq.ids), sorted(&pre.ids));
    assert_eq!(sorted(&seq.ids), sorted(&threaded.ids));
}

#[test]
fn an_or_of_two_keyword_leaves_agrees_across_all_three_executors() {
    let (seq, pre, threaded) = run_all_modes("KW('cancer') OR KW('weather')");
    assert_eq!(sorted(&seq.ids), vec![0, 1]);
    assert_eq!(sorted(&seq.ids), sorted(&pre.ids));
    assert_eq!(sorted(&seq.ids), sorted(&threaded.ids));
}

#[test]
fn a_negated_leaf_agrees_across_all_three_executors() {
    let (seq, pre, threaded) = run_all_modes("NOT KW('cancer')");
    assert_eq!(sorted(&seq.ids), vec![1, 2]);
    assert_eq!(sorted(&seq.ids), sorted(&pre.ids));
    assert_eq!(sorted(&seq.ids), sorted(&threaded.ids));
}

#[test]
fn a_column_scope_lifts_column_matches_back_to_dataset_ids() {
    let (seq, pre, threaded) = run_all_modes("COL(NAME('age';1))");
    // column 0 ("age") belongs to dataset 0.
    assert_eq!(sorted(&seq.ids), vec![0]);
    assert_eq!(sorted(&seq.ids), sorted(&pre.ids));
    assert_eq!(sorted(&seq.ids), sorted(&threaded.ids));
}

#[test]
fn scores_do_not_survive_a_column_scope_boundary() {
    let (seq, _, _) = run_all_modes("COL(NAME('age';1))");
    assert!(seq.scores.is_empty());
}

#[test]
fn ranked_ids_orders_a_multi_score_keyword_query_by_descending_score_then_ascending_id() {
    let meta = MetaTables::new(vec![DatasetId(0), DatasetId(1), DatasetId(2)], vec![]);
    let keyword = InMemoryKeywordEvaluator::new(HashMap::from([
        (DatasetId(0), "alpha beta gamma".to_string()),
        (DatasetId(1), "alpha".to_string()),
        (DatasetId(2), "gamma".to_string()),
    ]));
    let column_name = InMemoryColumnNameEvaluator::new(vec![]);
    let percentile = InMemoryPercentileEvaluator::new(HashMap::new());
    let evaluators = Evaluators { keyword: &keyword, column_name: &column_name, percentile: &percentile };

    // Sibling keyword leaves under OR are fused by the optimizer into one
    // leaf, so dataset 0 (all three terms) outscores datasets 1 and 2 (one
    // term each), which tie on score and must then break by ascending id.
    let ast = parse("KW('alpha') OR KW('beta') OR KW('gamma')").unwrap();
    let optimized = optimize(ast, &NoCostHints);
    let result = SequentialExecutor
        .execute(&optimized, &evaluators, &meta, &params(), &CancellationToken::unbounded())
        .unwrap();

    let ranked: Vec<u32> = result.ranked_ids().iter().map(|d| d.0).collect();
    assert_eq!(ranked, vec![0, 1, 2]);
}

#[test]
fn cancellation_is_observed_before_any_evaluator_call() {
    let ast = parse("KW('cancer')").unwrap();
    let optimized = optimize(ast, &NoCostHints);
    let meta = meta();
    let keyword = keyword_eval();
    let column_name = column_name_eval();
    let percentile = percentile_eval();
    let evaluators = Evaluators { keyword: &keyword, column_name: &column_name, percentile: &percentile };
    let cancel = CancellationToken::unbounded();
    cancel.cancel();
    let err = SequentialExecutor.execute(&optimized, &evaluators, &meta, &params(), &cancel).unwrap_err();
    assert!(matches!(err, fainder_query::executor::ExecutorError::Cancelled));
}

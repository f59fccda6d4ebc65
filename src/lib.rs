//! # Distribution-aware dataset search
//!
//! A DQL (dataset query language) parser, optimizer, and multi-evaluator
//! query executor. A query combines three kinds of leaf predicate —
//! keyword search, column-name nearest-neighbor search, and percentile
//! predicates over numeric-column histograms — under boolean connectives,
//! against three external index services the engine itself never owns.
//!
//! ## Pipeline
//!
//! ```text
//! DQL source
//!     -> [parser]     -> ast::Node
//!     -> [optimizer]   -> optimizer::OptimizedQuery (fingerprint + annotated tree)
//!     -> [executor]    -> executor::EvalResult { ids, scores, snippets }
//! ```
//!
//! `optimizer::optimize` runs normalization, keyword-leaf fusion, cost-based
//! sibling reordering, fingerprinting, and read/write-group annotation, in
//! that order (§4.2). The three executors in `executor::` implement the
//! exact same semantics at different points on the simplicity/performance
//! curve (§8); `Engine::execute` picks one per call and memoizes results in
//! `cache::QueryCache` keyed by `(fingerprint, executor mode, fainder
//! mode)`.
//!
//! ## Usage
//!
//! ```rust
//! use fainder_query::evaluators::memory::{
//!     InMemoryColumnNameEvaluator, InMemoryKeywordEvaluator, InMemoryPercentileEvaluator,
//! };
//! use fainder_query::ids::{ColumnId, DatasetId, MetaTables};
//! use fainder_query::{Config, Engine, IndexSnapshot};
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! let meta = MetaTables::new(vec![DatasetId(0)], vec![ColumnId(0)]);
//! let snapshot = IndexSnapshot {
//!     meta,
//!     keyword: Arc::new(InMemoryKeywordEvaluator::new(HashMap::from([(
//!         DatasetId(0),
//!         "lung cancer incidence".to_string(),
//!     )]))),
//!     column_name: Arc::new(InMemoryColumnNameEvaluator::new(vec![])),
//!     percentile: Arc::new(InMemoryPercentileEvaluator::new(HashMap::new())),
//! };
//! let engine = Engine::new(Config::default(), snapshot);
//! let result = engine.execute("KW('cancer')", None, None).unwrap();
//! assert!(result.ids.contains(0));
//! ```

pub mod ast;
pub mod cache;
pub mod candidates;
pub mod config;
pub mod error;
pub mod evaluators;
pub mod executor;
pub mod ids;
pub mod optimizer;
pub mod parser;

use cache::{CacheKey, QueryCache};
use error::EngineError;
use evaluators::{ColumnNameEvaluator, FainderMode, KeywordEvaluator, PercentileEvaluator};
use executor::cancellation::CancellationToken;
use executor::prefilter::PrefilterExecutor;
use executor::sequential::SequentialExecutor;
use executor::threaded::ThreadedExecutor;
use executor::{EvalResult, ExecutionParams, Executor, Evaluators, ExecutorMode};
use ids::MetaTables;
use optimizer::{CostHints, NoCostHints};

pub use config::Config;

/// A query's bound view of the three external indexes plus the id-space
/// metadata tables (§5 "Index snapshot"): held behind `ArcSwap` by
/// `Engine` so a concurrent index rebuild (out of scope here, owned by the
/// index-build subsystem) is only ever observed between queries, never
/// mid-query.
pub struct IndexSnapshot {
    pub meta: MetaTables,
    pub keyword: std::sync::Arc<dyn KeywordEvaluator>,
    pub column_name: std::sync::Arc<dyn ColumnNameEvaluator>,
    pub percentile: std::sync::Arc<dyn PercentileEvaluator>,
}

/// Facade bundling configuration, the bound index snapshot, the three
/// executors, and the query cache (§6 "Query entry point").
pub struct Engine {
    config: Config,
    snapshot: arc_swap::ArcSwap<IndexSnapshot>,
    cache: QueryCache,
    cost_hints: Box<dyn CostHints + Send + Sync>,
    sequential: SequentialExecutor,
    prefilter: PrefilterExecutor,
    threaded: ThreadedExecutor,
}

impl Engine {
    pub fn new(config: Config, snapshot: IndexSnapshot) -> Self {
        Self::with_cost_hints(config, snapshot, Box::new(NoCostHints))
    }

    /// Like [`Engine::new`], but with explicit percentile cardinality
    /// estimates for the cost-reordering pass (§4.2(c)) instead of the
    /// uninformative `NoCostHints` default.
    pub fn with_cost_hints(
        config: Config,
        snapshot: IndexSnapshot,
        cost_hints: Box<dyn CostHints + Send + Sync>,
    ) -> Self {
        let threaded = ThreadedExecutor::new(config.executor.worker_pool_size);
        let cache = QueryCache::new(config.cache.query_cache_size);
        Engine {
            config,
            snapshot: arc_swap::ArcSwap::from_pointee(snapshot),
            cache,
            cost_hints,
            sequential: SequentialExecutor,
            prefilter: PrefilterExecutor,
            threaded,
        }
    }

    /// Installs a new index snapshot, visible to every query started after
    /// this call returns (§5 "appear to the engine only between queries").
    pub fn swap_snapshot(&self, snapshot: IndexSnapshot) {
        self.snapshot.store(std::sync::Arc::new(snapshot));
    }

    /// Parses, optimizes, and evaluates `query_string`, consulting the
    /// query cache first (§6). `mode` and `fainder_mode` default to the
    /// configured values when `None`.
    #[tracing::instrument(skip(self), fields(mode = ?mode, fainder_mode = ?fainder_mode))]
    pub fn execute(
        &self,
        query_string: &str,
        mode: Option<ExecutorMode>,
        fainder_mode: Option<FainderMode>,
    ) -> Result<EvalResult, EngineError> {
        let mode = mode.unwrap_or(self.config.executor.default_executor_mode);
        let fainder_mode = fainder_mode.unwrap_or(self.config.evaluators.default_fainder_mode);

        let ast = parser::parse_with_max_k(query_string, self.config.evaluators.max_column_name_neighbors)?;
        let optimized = optimizer::optimize(ast, self.cost_hints.as_ref());

        let key = CacheKey { fingerprint: optimized.fingerprint, executor_mode: mode, fainder_mode };
        let snapshot = self.snapshot.load_full();
        let params = ExecutionParams {
            keyword_min_score: self.config.evaluators.keyword_min_score,
            keyword_max_results: self.config.evaluators.keyword_max_results,
            fainder_mode,
        };
        let cancel = CancellationToken::unbounded();

        let result = self.cache.get_or_compute(key, || {
            tracing::debug!(fingerprint = optimized.fingerprint, "evaluating query (cache miss)");
            let evaluators = Evaluators {
                keyword: snapshot.keyword.as_ref(),
                column_name: snapshot.column_name.as_ref(),
                percentile: snapshot.percentile.as_ref(),
            };
            match mode {
                ExecutorMode::Sequential => {
                    self.sequential.execute(&optimized, &evaluators, &snapshot.meta, &params, &cancel)
                }
                ExecutorMode::Prefilter => {
                    self.prefilter.execute(&optimized, &evaluators, &snapshot.meta, &params, &cancel)
                }
                ExecutorMode::Threaded => {
                    self.threaded.execute(&optimized, &evaluators, &snapshot.meta, &params, &cancel)
                }
            }
        })?;
        Ok(result)
    }

    /// Drains the query cache. Idempotent; safe to call before dropping the
    /// engine (§9 "Global state").
    pub fn shutdown(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::memory::{InMemoryColumnNameEvaluator, InMemoryKeywordEvaluator, InMemoryPercentileEvaluator};
    use crate::ids::{ColumnId, DatasetId};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn snapshot() -> IndexSnapshot {
        IndexSnapshot {
            meta: MetaTables::new(vec![DatasetId(0), DatasetId(1)], vec![ColumnId(0)]),
            keyword: Arc::new(InMemoryKeywordEvaluator::new(HashMap::from([
                (DatasetId(0), "lung cancer".to_string()),
                (DatasetId(1), "weather".to_string()),
            ]))),
            column_name: Arc::new(InMemoryColumnNameEvaluator::new(vec![(ColumnId(0), "age".into())])),
            percentile: Arc::new(InMemoryPercentileEvaluator::new(HashMap::new())),
        }
    }

    #[test]
    fn executes_a_simple_keyword_query() {
        let engine = Engine::new(Config::default(), snapshot());
        let result = engine.execute("KW('cancer')", None, None).unwrap();
        assert!(result.ids.contains(0));
        assert!(!result.ids.contains(1));
    }

    #[test]
    fn repeated_queries_hit_the_cache() {
        let engine = Engine::new(Config::default(), snapshot());
        let a = engine.execute("KW('weather')", None, None).unwrap();
        let b = engine.execute("KW('weather')", None, None).unwrap();
        assert_eq!(a.ids.iter().collect::<Vec<_>>(), b.ids.iter().collect::<Vec<_>>());
    }

    #[test]
    fn explicit_mode_overrides_the_configured_default() {
        let engine = Engine::new(Config::default(), snapshot());
        let seq = engine.execute("KW('cancer')", Some(ExecutorMode::Sequential), None).unwrap();
        let threaded = engine.execute("KW('cancer')", Some(ExecutorMode::Threaded), None).unwrap();
        assert_eq!(seq.ids.iter().collect::<Vec<_>>(), threaded.ids.iter().collect::<Vec<_>>());
    }

    #[test]
    fn syntax_errors_surface_as_engine_errors() {
        let engine = Engine::new(Config::default(), snapshot());
        let err = engine.execute("KW(", None, None).unwrap_err();
        assert!(matches!(err, EngineError::Syntax(_)));
    }

    #[test]
    fn shutdown_drains_the_cache() {
        let engine = Engine::new(Config::default(), snapshot());
        engine.execute("KW('cancer')", None, None).unwrap();
        engine.shutdown();
        assert!(engine.cache.is_empty());
    }
}

//! # External evaluator interfaces (§6)
//!
//! The three index back-ends the engine consults but never owns. Real
//! implementations live behind a network or on-disk index outside this
//! crate; [`memory`] provides small reference implementations good enough
//! for tests, the REPL, and documentation examples, and [`hnsw`] provides a
//! real approximate-nearest-neighbor `ColumnNameEvaluator`.

pub mod hnsw;
pub mod memory;

use crate::ast::Comparator;
use crate::candidates::IdSet;
use crate::ids::{ColumnId, DatasetId};
use std::collections::HashMap;
use thiserror::Error;

/// An evaluator-side failure (§7 `EvaluatorUnavailable` / `EvaluatorMalformed`
/// before the top-level `EngineError` classifies it).
#[derive(Debug, Clone, Error)]
pub enum EvaluatorError {
    #[error("evaluator unavailable: {0}")]
    Unavailable(String),
    #[error("evaluator returned malformed output: {0}")]
    Malformed(String),
}

/// Which of the three external evaluators raised an error (§6
/// `EvaluatorError{which, cause}`). Attached by each executor leaf at the
/// call site, since a bare `EvaluatorError` carries no such context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    Keyword,
    ColumnName,
    Percentile,
}

impl std::fmt::Display for EvaluatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EvaluatorKind::Keyword => "keyword",
            EvaluatorKind::ColumnName => "colname",
            EvaluatorKind::Percentile => "percentile",
        };
        write!(f, "{s}")
    }
}

/// `percentile.search`'s `mode` parameter: precision/recall tradeoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FainderMode {
    LowMemory,
    FullPrecision,
    FullRecall,
    Exact,
}

/// Result of one `keyword.search` call: per-dataset score (real-valued, >= 0)
/// and an optional highlighted snippet. Only the keyword evaluator
/// contributes scores (§9 "Scoring") — other leaves affect membership only.
#[derive(Debug, Clone, Default)]
pub struct KeywordHits {
    pub scores: HashMap<DatasetId, f64>,
    pub snippets: HashMap<DatasetId, String>,
}

impl KeywordHits {
    pub fn ids(&self) -> IdSet {
        self.scores.keys().map(|d| d.0).collect()
    }
}

/// `keyword.search` (§6). `candidates`, when present, restricts the search
/// to those dataset ids; `min_score` and `max_results` apply server-side.
pub trait KeywordEvaluator: Send + Sync {
    fn search(
        &self,
        query: &str,
        candidates: Option<&IdSet>,
        min_score: f64,
        max_results: usize,
    ) -> Result<KeywordHits, EvaluatorError>;
}

/// `colname.search` (§6). `k = 0` means exact match only. No candidate
/// parameter — the documented external interface has none; callers that
/// hold a candidate column set from a read group apply it as a post-filter
/// on the returned ids (see `executor::prefilter`).
pub trait ColumnNameEvaluator: Send + Sync {
    fn search(&self, name: &str, k: u32) -> Result<Vec<ColumnId>, EvaluatorError>;
}

/// `percentile.search` (§6). Returns histogram ids (not column ids — the
/// Fainder index works in histogram-id space, §3 "Histogram id"); the
/// caller maps back via `MetaTables::histogram_to_column`. Results are
/// monotone in the candidate set (narrower candidates never add ids).
pub trait PercentileEvaluator: Send + Sync {
    fn search(
        &self,
        p: f64,
        comparator: Comparator,
        v: f64,
        candidates: Option<&IdSet>,
        mode: FainderMode,
    ) -> Result<IdSet, EvaluatorError>;
}

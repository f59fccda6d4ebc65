//! Top-level error type (§7 "Error handling design"): the one enum that
//! crosses the `Engine::execute` boundary, unifying parser, evaluator, and
//! executor failures into the kinds §7 names.
//!
//! Grounded on `inputlayer::protocol::error::InputLayerError`: a flat
//! `thiserror` enum, `Serialize`/`Deserialize` for wire-level reporting (the
//! REPL prints these directly), with `From` conversions from each
//! lower-level error type rather than a catch-all `Internal(String)` for
//! everything.

use crate::evaluators::{EvaluatorError, EvaluatorKind};
use crate::executor::ExecutorError;
use crate::parser::error::{ParseError, SemanticConstraintError, SyntaxError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    SemanticConstraint(#[from] SemanticConstraintError),

    /// An external index is down or returned a transport-level failure;
    /// surfaced verbatim (§7 "EvaluatorUnavailable").
    #[error("evaluator unavailable: {which}: {cause}")]
    EvaluatorUnavailable { which: EvaluatorKind, cause: String },

    /// An external index returned output that violates its documented
    /// contract (out-of-range ids, negative scores); fatal for the request,
    /// logged (§7 "EvaluatorMalformed").
    #[error("evaluator {which} returned malformed output: {cause}")]
    EvaluatorMalformed { which: EvaluatorKind, cause: String },

    #[error("query cancelled")]
    Cancelled,

    #[error("query exceeded its deadline")]
    Timeout,

    /// An invariant the engine itself is responsible for was violated —
    /// never caused by caller input or evaluator misbehavior (§7
    /// "fatal for the process in debug builds, surfaced as 5xx-class in
    /// release").
    #[error("internal engine error: {0}")]
    Internal(String),
}

impl From<ParseError> for EngineError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Syntax(e) => EngineError::Syntax(e),
            ParseError::Semantic(e) => EngineError::SemanticConstraint(e),
        }
    }
}

impl From<ExecutorError> for EngineError {
    fn from(e: ExecutorError) -> Self {
        match e {
            ExecutorError::Evaluator { which, source } => evaluator_error(which, source),
            ExecutorError::Cancelled => EngineError::Cancelled,
            ExecutorError::TimedOut => EngineError::Timeout,
        }
    }
}

fn evaluator_error(which: EvaluatorKind, source: EvaluatorError) -> EngineError {
    match source {
        EvaluatorError::Unavailable(cause) => EngineError::EvaluatorUnavailable { which, cause },
        EvaluatorError::Malformed(cause) => EngineError::EvaluatorMalformed { which, cause },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::error::{SyntaxError, SyntaxErrorKind};

    #[test]
    fn syntax_error_converts_through_parse_error() {
        let parse_err = ParseError::Syntax(SyntaxError { kind: SyntaxErrorKind::UnbalancedParens, position: 3 });
        let engine_err: EngineError = parse_err.into();
        assert!(matches!(engine_err, EngineError::Syntax(_)));
    }

    #[test]
    fn cancellation_survives_the_executor_boundary() {
        let engine_err: EngineError = ExecutorError::Cancelled.into();
        assert!(matches!(engine_err, EngineError::Cancelled));
    }

    #[test]
    fn timeout_survives_the_executor_boundary() {
        let engine_err: EngineError = ExecutorError::TimedOut.into();
        assert!(matches!(engine_err, EngineError::Timeout));
    }

    #[test]
    fn evaluator_error_carries_which_through_the_executor_boundary() {
        let engine_err: EngineError =
            ExecutorError::evaluator(EvaluatorKind::ColumnName, EvaluatorError::Unavailable("down".into())).into();
        match engine_err {
            EngineError::EvaluatorUnavailable { which, .. } => assert_eq!(which, EvaluatorKind::ColumnName),
            other => panic!("expected EvaluatorUnavailable, got {other:?}"),
        }
    }
}

//! Parser error types (§4.1 "Failures", §7 "Syntax" / "SemanticConstraint").

use serde::{Deserialize, Serialize};
use std::fmt;

/// A grammar-level failure: the input does not match the DQL grammar at
/// all. Carries a byte position into the original query string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyntaxErrorKind {
    UnbalancedParens,
    UnknownOperator,
    MalformedNumber,
    Other(String),
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match &self.kind {
            SyntaxErrorKind::UnbalancedParens => "unbalanced parentheses".to_string(),
            SyntaxErrorKind::UnknownOperator => "unknown operator".to_string(),
            SyntaxErrorKind::MalformedNumber => "malformed number".to_string(),
            SyntaxErrorKind::Other(msg) => msg.clone(),
        };
        write!(f, "syntax error at byte {}: {}", self.position, msg)
    }
}

impl std::error::Error for SyntaxError {}

/// A rule violation discovered after the input parsed grammatically, but
/// before the AST is handed to the optimizer (§7 "a parse-time rule
/// violation").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticConstraintError {
    pub kind: SemanticConstraintKind,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SemanticConstraintKind {
    PercentileOutOfRange { p: f64 },
    NegativeK { k: i64 },
    KExceedsMax { k: u32, max: u32 },
}

impl fmt::Display for SemanticConstraintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match &self.kind {
            SemanticConstraintKind::PercentileOutOfRange { p } => {
                format!("percentile {p} is outside [0,1]")
            }
            SemanticConstraintKind::NegativeK { k } => format!("k must be non-negative, got {k}"),
            SemanticConstraintKind::KExceedsMax { k, max } => {
                format!("k={k} exceeds the configured maximum of {max}")
            }
        };
        write!(f, "semantic constraint violated at byte {}: {}", self.position, msg)
    }
}

impl std::error::Error for SemanticConstraintError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Syntax(SyntaxError),
    Semantic(SemanticConstraintError),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Syntax(e) => e.fmt(f),
            ParseError::Semantic(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<SyntaxError> for ParseError {
    fn from(e: SyntaxError) -> Self {
        ParseError::Syntax(e)
    }
}

impl From<SemanticConstraintError> for ParseError {
    fn from(e: SemanticConstraintError) -> Self {
        ParseError::Semantic(e)
    }
}

//! # DQL Abstract Syntax Tree
//!
//! The tagged-variant AST produced by the parser (§3 "AST node") and
//! consumed by the optimizer. Boolean connectives are n-ary from the start
//! (the grammar is binary-left-associative, but the parser folds runs of the
//! same operator into one node immediately, rather than leaving that to a
//! later normalization pass over binary trees).

use serde::{Deserialize, Serialize};

pub mod builders;
pub mod format;

/// Comparator for a percentile predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    Ge,
    Gt,
    Le,
    Lt,
}

impl Comparator {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ge" => Some(Comparator::Ge),
            "gt" => Some(Comparator::Gt),
            "le" => Some(Comparator::Le),
            "lt" => Some(Comparator::Lt),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Comparator::Ge => "ge",
            Comparator::Gt => "gt",
            Comparator::Le => "le",
            Comparator::Lt => "lt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordLeaf {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnNameLeaf {
    pub name: String,
    pub k: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileLeaf {
    pub p: f64,
    pub comparator: Comparator,
    pub v: f64,
}

/// A DQL AST node. `And`/`Or`/`Xor` are n-ary (>= 2 children); `Not` and
/// `ColumnScope` each wrap exactly one child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Keyword(KeywordLeaf),
    ColumnName(ColumnNameLeaf),
    Percentile(PercentileLeaf),
    /// A subtree interpreted in column-id space; its result lifts to
    /// dataset ids via exists-over-columns (§3, GLOSSARY "Column scope").
    ColumnScope(Box<Node>),
    And(Vec<Node>),
    Or(Vec<Node>),
    Xor(Vec<Node>),
    Not(Box<Node>),
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Keyword(_) | Node::ColumnName(_) | Node::Percentile(_))
    }

    /// True if this subtree contains a keyword leaf anywhere (used to reject
    /// keyword leaves under a column scope, and to decide final ordering).
    pub fn contains_keyword(&self) -> bool {
        match self {
            Node::Keyword(_) => true,
            Node::ColumnName(_) | Node::Percentile(_) => false,
            Node::ColumnScope(inner) => inner.contains_keyword(),
            Node::And(cs) | Node::Or(cs) | Node::Xor(cs) => cs.iter().any(Node::contains_keyword),
            Node::Not(inner) => inner.contains_keyword(),
        }
    }

    /// Depth-first, left-to-right iterator over every leaf in the subtree.
    pub fn leaves(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Node>) {
        match self {
            Node::Keyword(_) | Node::ColumnName(_) | Node::Percentile(_) => out.push(self),
            Node::ColumnScope(inner) | Node::Not(inner) => inner.collect_leaves(out),
            Node::And(cs) | Node::Or(cs) | Node::Xor(cs) => {
                for c in cs {
                    c.collect_leaves(out);
                }
            }
        }
    }
}

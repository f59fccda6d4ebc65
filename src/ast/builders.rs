//! Fluent constructors for AST nodes, particularly useful for tests.
//!
//! ## Example
//!
//! ```rust
//! use fainder_query::ast::builders::{and, col_scope, keyword, name, percentile};
//! use fainder_query::ast::Comparator;
//!
//! // KW('lung cancer') AND COL(NAME('age';4) AND PP(0.7;le;50))
//! let query = and(vec![
//!     keyword("lung cancer"),
//!     col_scope(and(vec![name("age", 4), percentile(0.7, Comparator::Le, 50.0)])),
//! ]);
//! ```

use super::{ColumnNameLeaf, Comparator, KeywordLeaf, Node, PercentileLeaf};

/// Collapse a singleton child list to the child itself; mirrors the smart
/// constructors `milli::search::query_tree::Operation::and`/`or` use to
/// avoid unary And/Or nodes.
pub(crate) fn collapse_or_wrap(mut children: Vec<Node>, wrap: impl FnOnce(Vec<Node>) -> Node) -> Node {
    if children.len() == 1 {
        children.pop().expect("checked len == 1")
    } else {
        wrap(children)
    }
}

pub fn keyword(query: impl Into<String>) -> Node {
    Node::Keyword(KeywordLeaf { query: query.into() })
}

pub fn name(name: impl Into<String>, k: u32) -> Node {
    Node::ColumnName(ColumnNameLeaf { name: name.into(), k })
}

pub fn percentile(p: f64, comparator: Comparator, v: f64) -> Node {
    Node::Percentile(PercentileLeaf { p, comparator, v })
}

pub fn col_scope(inner: Node) -> Node {
    Node::ColumnScope(Box::new(inner))
}

pub fn and(children: Vec<Node>) -> Node {
    collapse_or_wrap(children, Node::And)
}

pub fn or(children: Vec<Node>) -> Node {
    collapse_or_wrap(children, Node::Or)
}

pub fn xor(children: Vec<Node>) -> Node {
    collapse_or_wrap(children, Node::Xor)
}

pub fn not(child: Node) -> Node {
    Node::Not(Box::new(child))
}

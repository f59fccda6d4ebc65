//! Pass (b): keyword merging (§4.2(b)).
//!
//! Sibling keyword leaves under AND or OR are fused into a single leaf
//! whose query string expresses the same Boolean combination in the
//! external keyword language. One call to `keyword.search` is strictly
//! cheaper than N calls plus a set combination, and the external evaluator
//! natively supports AND/OR inside a single query. XOR has no such
//! equivalent in the keyword language and is left untouched.

use crate::ast::builders::collapse_or_wrap;
use crate::ast::{KeywordLeaf, Node};

pub fn merge_keywords(node: Node) -> Node {
    match node {
        Node::Keyword(_) | Node::ColumnName(_) | Node::Percentile(_) => node,
        Node::ColumnScope(inner) => Node::ColumnScope(Box::new(merge_keywords(*inner))),
        Node::Not(inner) => Node::Not(Box::new(merge_keywords(*inner))),
        Node::Xor(children) => Node::Xor(children.into_iter().map(merge_keywords).collect()),
        Node::And(children) => collapse_or_wrap(merge_siblings(children, "AND"), Node::And),
        Node::Or(children) => collapse_or_wrap(merge_siblings(children, "OR"), Node::Or),
    }
}

fn merge_siblings(children: Vec<Node>, op: &str) -> Vec<Node> {
    let children: Vec<Node> = children.into_iter().map(merge_keywords).collect();

    let mut keyword_queries = Vec::new();
    let mut rest = Vec::new();
    for child in children {
        match child {
            Node::Keyword(l) => keyword_queries.push(l.query),
            other => rest.push(other),
        }
    }

    if keyword_queries.len() >= 2 {
        let merged = keyword_queries.join(&format!(" {op} "));
        rest.push(Node::Keyword(KeywordLeaf { query: merged }));
    } else {
        rest.extend(keyword_queries.into_iter().map(|query| Node::Keyword(KeywordLeaf { query })));
    }
    rest
}

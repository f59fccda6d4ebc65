//! Canonical fingerprint for the query cache key (§4.6).
//!
//! Computed after optimization (normalization, keyword merging, cost
//! reordering) but *before* read/write-group annotation, and is
//! insensitive to sibling order for AND/OR (commutative hash) while XOR and
//! NOT remain positional, matching their non-commutative-under-pruning
//! semantics.

use crate::ast::Node;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub fn fingerprint(node: &Node) -> u64 {
    match node {
        Node::Keyword(l) => tagged(0, |h| l.query.hash(h)),
        Node::ColumnName(l) => tagged(1, |h| {
            l.name.hash(h);
            l.k.hash(h);
        }),
        Node::Percentile(l) => tagged(2, |h| {
            l.p.to_bits().hash(h);
            (l.comparator as u8).hash(h);
            l.v.to_bits().hash(h);
        }),
        Node::ColumnScope(inner) => tagged(3, |h| fingerprint(inner).hash(h)),
        Node::And(children) => commutative(4, children),
        Node::Or(children) => commutative(5, children),
        Node::Xor(children) => positional(6, children),
        Node::Not(inner) => tagged(7, |h| fingerprint(inner).hash(h)),
    }
}

fn tagged(tag: u8, body: impl FnOnce(&mut DefaultHasher)) -> u64 {
    let mut h = DefaultHasher::new();
    tag.hash(&mut h);
    body(&mut h);
    h.finish()
}

fn commutative(tag: u8, children: &[Node]) -> u64 {
    let mut child_hashes: Vec<u64> = children.iter().map(fingerprint).collect();
    child_hashes.sort_unstable();
    tagged(tag, |h| child_hashes.hash(h))
}

fn positional(tag: u8, children: &[Node]) -> u64 {
    let child_hashes: Vec<u64> = children.iter().map(fingerprint).collect();
    tagged(tag, |h| child_hashes.hash(h))
}

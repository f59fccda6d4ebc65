//! # Query optimizer
//!
//! Runs the four passes of §4.2 in order and produces an [`OptimizedQuery`]:
//! the cache fingerprint (computed between cost-reordering and group
//! annotation, per §4.6) paired with the group-annotated tree the executors
//! consume.

pub mod cost;
pub mod fingerprint;
pub mod groups;
pub mod keyword_merge;
pub mod normalize;

use crate::ast::Node;
pub use cost::{CostHints, NoCostHints};
pub use groups::{Annotated, GroupId, Groups};

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedQuery {
    pub fingerprint: u64,
    pub annotated: Annotated,
}

pub fn optimize(node: Node, hints: &dyn CostHints) -> OptimizedQuery {
    let node = normalize::normalize(node);
    let node = keyword_merge::merge_keywords(node);
    let node = cost::reorder(node, hints);
    let fp = fingerprint::fingerprint(&node);
    let annotated = groups::annotate(node);
    OptimizedQuery { fingerprint: fp, annotated }
}

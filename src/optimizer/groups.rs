//! Pass (d): read/write-group annotation (§4.2(d)).
//!
//! Only leaves carry group annotations (§3 invariants); `And`/`Or`/`Xor`/`Not`
//! are pure combinators and only exist here to thread write/read group ids
//! down to their children. `ColumnScope` is the one non-leaf that keeps its
//! own annotation, because the prefilter and threaded executors need it to
//! convert a candidate set between dataset-id and column-id space at the
//! scope boundary (§4.4).
//!
//! ## Resolving the prose against the worked examples
//!
//! §4.2(d) says "AND child: inherits parent's write and read lists
//! unchanged." Taken fully literally that would leave every leaf under a
//! shared AND with an *empty* read list at the root (nothing ever adds the
//! shared write group to anyone's read list), which cannot produce the
//! sibling-narrowing behaviour the worked examples in §8 require (example 2:
//! a NAME leaf inside `COL(...)` is filtered by an preceding sibling
//! keyword's result under a plain top-level AND). The only annotation that
//! reproduces every §8 example, the soundness invariant, and the stated
//! purpose of the whole pass (turning cheap leaf results into a prefilter
//! for expensive ones) is: an AND child's read list is the parent's read
//! list *plus the parent's own write group*, so a later AND sibling reading
//! that write group sees whatever an earlier sibling already published
//! there. `ColumnScope` gets the same treatment, since the spec explicitly
//! calls its bookkeeping "structurally identical" to AND's. This file
//! implements that reading; it is a resolved ambiguity, recorded in
//! DESIGN.md, not a deviation from the examples.

use crate::ast::{ColumnNameLeaf, KeywordLeaf, Node, PercentileLeaf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Groups {
    pub write: GroupId,
    pub read: Vec<GroupId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Annotated {
    Keyword(KeywordLeaf, Groups),
    ColumnName(ColumnNameLeaf, Groups),
    Percentile(PercentileLeaf, Groups),
    ColumnScope(Box<Annotated>, Groups),
    And(Vec<Annotated>),
    Or(Vec<Annotated>),
    Xor(Vec<Annotated>),
    Not(Box<Annotated>),
}

struct Allocator {
    next: u32,
}

impl Allocator {
    fn alloc(&mut self) -> GroupId {
        let id = GroupId(self.next);
        self.next += 1;
        id
    }
}

/// Annotate a fully-optimized tree, starting at the root with a fresh write
/// group and an empty read list (§4.2(d) "Root").
pub fn annotate(node: Node) -> Annotated {
    let mut alloc = Allocator { next: 0 };
    let w0 = alloc.alloc();
    annotate_rec(node, w0, Vec::new(), &mut alloc)
}

fn push(read: &Vec<GroupId>, extra: GroupId) -> Vec<GroupId> {
    let mut r = read.clone();
    r.push(extra);
    r
}

fn annotate_rec(node: Node, own_write: GroupId, own_read: Vec<GroupId>, alloc: &mut Allocator) -> Annotated {
    match node {
        Node::Keyword(l) => Annotated::Keyword(l, Groups { write: own_write, read: own_read }),
        Node::ColumnName(l) => Annotated::ColumnName(l, Groups { write: own_write, read: own_read }),
        Node::Percentile(l) => Annotated::Percentile(l, Groups { write: own_write, read: own_read }),
        Node::ColumnScope(inner) => {
            let inner_ann = annotate_rec(*inner, own_write, own_read.clone(), alloc);
            Annotated::ColumnScope(Box::new(inner_ann), Groups { write: own_write, read: own_read })
        }
        Node::Not(inner) => {
            let w = alloc.alloc();
            let r = push(&own_read, w);
            Annotated::Not(Box::new(annotate_rec(*inner, w, r, alloc)))
        }
        Node::And(children) => Annotated::And(
            children
                .into_iter()
                .map(|c| annotate_rec(c, own_write, push(&own_read, own_write), alloc))
                .collect(),
        ),
        Node::Or(children) => Annotated::Or(
            children
                .into_iter()
                .map(|c| {
                    let w = alloc.alloc();
                    annotate_rec(c, w, push(&own_read, w), alloc)
                })
                .collect(),
        ),
        Node::Xor(children) => Annotated::Xor(
            children
                .into_iter()
                .map(|c| {
                    let w = alloc.alloc();
                    annotate_rec(c, w, own_read.clone(), alloc)
                })
                .collect(),
        ),
    }
}

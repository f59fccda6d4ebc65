//! Pass (c): cost-based sibling reordering (§4.2(c)).
//!
//! Sorts the children of every associative connective ascending by
//! `(cost_class, tiebreak)` so cheap leaves (keyword search) run, and
//! narrow the candidate set, before expensive ones (percentile lookups).

use crate::ast::Node;

/// Supplies the expected cardinality of a percentile leaf from global
/// histogram statistics (§6 external tables). The optimizer has no opinion
/// on where these numbers come from; callers without real statistics (most
/// tests, and any deployment that hasn't warmed its histogram summary yet)
/// use `NoCostHints`, which makes every percentile leaf tiebreak to +inf —
/// stable but uninformative ordering.
pub trait CostHints {
    fn percentile_cardinality_estimate(&self, p: f64, v: f64) -> Option<f64>;
}

pub struct NoCostHints;

impl CostHints for NoCostHints {
    fn percentile_cardinality_estimate(&self, _p: f64, _v: f64) -> Option<f64> {
        None
    }
}

/// `(cost_class, tiebreak)`. Lower sorts first. `tiebreak` uses `f64::total_cmp`
/// so NaN never appears (estimates are finite or absent) and class 3 (Not)
/// never collides numerically with class 2 for an unrelated leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cost {
    class: u8,
    tiebreak: f64,
}

impl Cost {
    fn cmp(&self, other: &Cost) -> std::cmp::Ordering {
        self.class.cmp(&other.class).then_with(|| self.tiebreak.total_cmp(&other.tiebreak))
    }
}

fn estimate(node: &Node, hints: &dyn CostHints) -> Cost {
    match node {
        Node::Keyword(_) => Cost { class: 0, tiebreak: 0.0 },
        Node::ColumnName(l) => Cost { class: 1, tiebreak: f64::from(l.k) },
        Node::Percentile(l) => Cost {
            class: 2,
            tiebreak: hints.percentile_cardinality_estimate(l.p, l.v).unwrap_or(f64::INFINITY),
        },
        Node::ColumnScope(inner) => {
            let inner_cost = estimate(inner, hints);
            Cost { class: inner_cost.class, tiebreak: inner_cost.tiebreak }
        }
        Node::Not(inner) => {
            let inner_cost = estimate(inner, hints);
            // "tiebreak inverted toward the complement cardinality": without
            // a real complement-cardinality estimate, invert the sign so a
            // well-estimated inner leaf still sorts deterministically but
            // opposite to its un-negated form.
            Cost { class: inner_cost.class, tiebreak: -inner_cost.tiebreak }
        }
        Node::And(children) | Node::Or(children) | Node::Xor(children) => {
            children.iter().map(|c| estimate(c, hints)).fold(
                Cost { class: 0, tiebreak: 0.0 },
                |acc, c| if c.cmp(&acc) == std::cmp::Ordering::Greater { c } else { acc },
            )
        }
    }
}

pub fn reorder(node: Node, hints: &dyn CostHints) -> Node {
    match node {
        Node::Keyword(_) | Node::ColumnName(_) | Node::Percentile(_) => node,
        Node::ColumnScope(inner) => Node::ColumnScope(Box::new(reorder(*inner, hints))),
        Node::Not(inner) => Node::Not(Box::new(reorder(*inner, hints))),
        Node::And(children) => Node::And(reorder_children(children, hints)),
        Node::Or(children) => Node::Or(reorder_children(children, hints)),
        Node::Xor(children) => Node::Xor(reorder_children(children, hints)),
    }
}

fn reorder_children(children: Vec<Node>, hints: &dyn CostHints) -> Vec<Node> {
    let mut children: Vec<Node> = children.into_iter().map(|c| reorder(c, hints)).collect();
    children.sort_by(|a, b| estimate(a, hints).cmp(&estimate(b, hints)));
    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::*;
    use crate::ast::Comparator;

    #[test]
    fn keyword_sorts_before_column_name_and_percentile() {
        let tree = and(vec![
            percentile(0.5, Comparator::Ge, 1.0),
            name("age", 4),
            keyword("a"),
        ]);
        let got = reorder(tree, &NoCostHints);
        assert_eq!(got, and(vec![keyword("a"), name("age", 4), percentile(0.5, Comparator::Ge, 1.0)]));
    }

    #[test]
    fn column_name_ties_break_on_k() {
        let tree = and(vec![name("b", 10), name("a", 2)]);
        let got = reorder(tree, &NoCostHints);
        assert_eq!(got, and(vec![name("a", 2), name("b", 10)]));
    }

    #[test]
    fn percentile_with_no_hint_tiebreaks_to_infinity_but_is_stable() {
        let tree = and(vec![percentile(0.1, Comparator::Lt, 5.0), percentile(0.9, Comparator::Ge, 1.0)]);
        let got = reorder(tree, &NoCostHints);
        assert!(matches!(got, Node::And(ref cs) if cs.len() == 2));
    }

    #[test]
    fn cost_based_hints_order_percentile_leaves() {
        struct Hints;
        impl CostHints for Hints {
            fn percentile_cardinality_estimate(&self, p: f64, _v: f64) -> Option<f64> {
                Some(p)
            }
        }
        let tree = and(vec![percentile(0.9, Comparator::Ge, 1.0), percentile(0.1, Comparator::Lt, 5.0)]);
        let got = reorder(tree, &Hints);
        assert_eq!(got, and(vec![percentile(0.1, Comparator::Lt, 5.0), percentile(0.9, Comparator::Ge, 1.0)]));
    }

    #[test]
    fn reorders_recursively_inside_column_scope() {
        let tree = col_scope(and(vec![percentile(0.5, Comparator::Ge, 1.0), name("a", 1)]));
        let got = reorder(tree, &NoCostHints);
        assert_eq!(got, col_scope(and(vec![name("a", 1), percentile(0.5, Comparator::Ge, 1.0)])));
    }
}

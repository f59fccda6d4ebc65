//! Pass (a): normalization — flatten nested associative connectives and
//! eliminate double negation (§4.2(a)).

use crate::ast::builders::collapse_or_wrap;
use crate::ast::Node;

pub fn normalize(node: Node) -> Node {
    match node {
        Node::Keyword(_) | Node::ColumnName(_) | Node::Percentile(_) => node,
        Node::ColumnScope(inner) => Node::ColumnScope(Box::new(normalize(*inner))),
        Node::Not(inner) => {
            let inner = normalize(*inner);
            if let Node::Not(grandchild) = inner {
                *grandchild
            } else {
                Node::Not(Box::new(inner))
            }
        }
        Node::And(children) => {
            collapse_or_wrap(flatten_same_op(children, |n| matches!(n, Node::And(_))), Node::And)
        }
        Node::Or(children) => {
            collapse_or_wrap(flatten_same_op(children, |n| matches!(n, Node::Or(_))), Node::Or)
        }
        Node::Xor(children) => {
            collapse_or_wrap(flatten_same_op(children, |n| matches!(n, Node::Xor(_))), Node::Xor)
        }
    }
}

/// Normalize every child, then splice any child that is itself the same
/// connective directly into this node's child list (AND-AND-AND ->
/// one AND). Other connectives (e.g. an `Or` nested inside an `And`) are
/// left as a single child — only *same*-operator nesting is flattened.
fn flatten_same_op(children: Vec<Node>, is_same_op: impl Fn(&Node) -> bool) -> Vec<Node> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        let child = normalize(child);
        if is_same_op(&child) {
            match child {
                Node::And(cs) | Node::Or(cs) | Node::Xor(cs) => out.extend(cs),
                _ => unreachable!("is_same_op only matches And/Or/Xor"),
            }
        } else {
            out.push(child);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::*;

    #[test]
    fn flattens_nested_and() {
        let tree = and(vec![and(vec![keyword("a"), keyword("b")]), keyword("c")]);
        let got = normalize(tree);
        assert_eq!(got, and(vec![keyword("a"), keyword("b"), keyword("c")]));
    }

    #[test]
    fn flattens_nested_or_and_xor_independently() {
        let tree = or(vec![or(vec![keyword("a"), keyword("b")]), keyword("c")]);
        assert_eq!(normalize(tree), or(vec![keyword("a"), keyword("b"), keyword("c")]));

        let tree = xor(vec![xor(vec![keyword("a"), keyword("b")]), keyword("c")]);
        assert_eq!(normalize(tree), xor(vec![keyword("a"), keyword("b"), keyword("c")]));
    }

    #[test]
    fn does_not_flatten_across_different_operators() {
        let tree = and(vec![or(vec![keyword("a"), keyword("b")]), keyword("c")]);
        let got = normalize(tree.clone());
        assert_eq!(got, tree);
    }

    #[test]
    fn eliminates_double_negation() {
        let tree = not(not(keyword("a")));
        assert_eq!(normalize(tree), keyword("a"));
    }

    #[test]
    fn eliminates_quadruple_negation() {
        let tree = not(not(not(not(keyword("a")))));
        assert_eq!(normalize(tree), keyword("a"));
    }

    #[test]
    fn keeps_single_negation() {
        let tree = not(keyword("a"));
        assert_eq!(normalize(tree.clone()), tree);
    }

    #[test]
    fn normalizes_inside_column_scope() {
        let tree = col_scope(and(vec![and(vec![name("a", 1)]), name("b", 2)]));
        let got = normalize(tree);
        assert_eq!(got, col_scope(and(vec![name("a", 1), name("b", 2)])));
    }
}

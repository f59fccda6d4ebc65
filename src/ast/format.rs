//! Canonical DQL pretty-printer.
//!
//! Needed for the §8 round-trip property:
//! `format(parse(q)) == format(parse(format(parse(q))))`. Printing always
//! parenthesizes children whose connective binds looser than the parent
//! (OR < XOR < AND < NOT, per §4.1), so the printed form always reparses to
//! the same tree regardless of how the input was parenthesized.

use super::{Comparator, Node};

/// Relative binding strength; higher binds tighter. Matches §4.1 precedence
/// low->high: OR < XOR < AND < NOT.
fn precedence(node: &Node) -> u8 {
    match node {
        Node::Or(_) => 0,
        Node::Xor(_) => 1,
        Node::And(_) => 2,
        Node::Not(_) => 3,
        Node::Keyword(_) | Node::ColumnName(_) | Node::Percentile(_) | Node::ColumnScope(_) => 4,
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn fmt_num(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Format a query AST to canonical DQL text.
pub fn format(node: &Node) -> String {
    fmt_at(node, 0)
}

fn fmt_child_parenthesized(child: &Node, parent_precedence: u8) -> String {
    let s = fmt_at(child, precedence(child));
    if precedence(child) < parent_precedence {
        format!("({s})")
    } else {
        s
    }
}

fn fmt_at(node: &Node, _context_precedence: u8) -> String {
    match node {
        Node::Keyword(l) => format!("KW({})", quote(&l.query)),
        Node::ColumnName(l) => format!("NAME({};{})", quote(&l.name), l.k),
        Node::Percentile(l) => format!(
            "PP({};{};{})",
            fmt_num(l.p),
            comparator_str(l.comparator),
            fmt_num(l.v)
        ),
        Node::ColumnScope(inner) => format!("COL({})", fmt_at(inner, 0)),
        Node::Not(inner) => format!("NOT {}", fmt_child_parenthesized(inner, precedence(node))),
        Node::And(children) => join(children, "AND", precedence(node)),
        Node::Or(children) => join(children, "OR", precedence(node)),
        Node::Xor(children) => join(children, "XOR", precedence(node)),
    }
}

fn comparator_str(c: Comparator) -> &'static str {
    c.as_str()
}

fn join(children: &[Node], op: &str, own_precedence: u8) -> String {
    children
        .iter()
        .map(|c| fmt_child_parenthesized(c, own_precedence))
        .collect::<Vec<_>>()
        .join(&format!(" {op} "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::*;
    use crate::parser::parse;

    #[test]
    fn formats_simple_keyword() {
        assert_eq!(format(&keyword("lung cancer")), "KW(\"lung cancer\")");
    }

    #[test]
    fn round_trips_through_parser() {
        let q = "KW('a') AND (KW('b') OR KW('c'))";
        let parsed = parse(q).unwrap();
        let printed = format(&parsed);
        let reparsed = parse(&printed).unwrap();
        let printed_again = format(&reparsed);
        assert_eq!(printed, printed_again);
    }

    #[test]
    fn adds_parens_for_or_under_and() {
        let tree = and(vec![keyword("a"), or(vec![keyword("b"), keyword("c")])]);
        let printed = format(&tree);
        assert!(printed.contains('('));
        let reparsed = parse(&printed).unwrap();
        assert_eq!(reparsed, tree);
    }
}

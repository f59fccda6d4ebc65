//! # DQL Parser
//!
//! Turns a DQL string into an [`ast::Node`] using a `pest` grammar (§4.1).
//! Grounded on `inputlayer`'s `pest`/`pest_derive` dependency (there used
//! for Datalog-REPL syntax highlighting; here for the actual grammar, since
//! DQL is small enough for a direct PEG).

pub mod error;

use crate::ast::{ColumnNameLeaf, Comparator, KeywordLeaf, Node, PercentileLeaf};
use error::{ParseError, SemanticConstraintError, SemanticConstraintKind, SyntaxError, SyntaxErrorKind};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "parser/grammar.pest"]
struct DqlParser;

/// Default upper bound on `k` in `NAME(...)` when no explicit configuration
/// is threaded through (SPEC_FULL.md §D.3).
pub const DEFAULT_MAX_COLUMN_NAME_NEIGHBORS: u32 = 256;

/// Parse a DQL query string with the default `k` bound.
pub fn parse(input: &str) -> Result<Node, ParseError> {
    parse_with_max_k(input, DEFAULT_MAX_COLUMN_NAME_NEIGHBORS)
}

/// Parse a DQL query string, rejecting `NAME(...; k)` leaves whose `k`
/// exceeds `max_k`.
pub fn parse_with_max_k(input: &str, max_k: u32) -> Result<Node, ParseError> {
    let mut pairs = DqlParser::parse(Rule::query, input).map_err(|e| pest_error_to_syntax(&e))?;
    let query_pair = pairs.next().expect("query rule always produces exactly one pair");
    let or_expr = inner_one(query_pair);
    build_or(or_expr, max_k)
}

fn pest_error_to_syntax(e: &pest::error::Error<Rule>) -> ParseError {
    let position = match e.location {
        pest::error::InputLocation::Pos(p) => p,
        pest::error::InputLocation::Span((start, _)) => start,
    };
    let kind = match &e.variant {
        pest::error::ErrorVariant::ParsingError { positives, .. } => {
            if positives.iter().any(|r| matches!(r, Rule::query | Rule::atom)) {
                SyntaxErrorKind::UnbalancedParens
            } else {
                SyntaxErrorKind::UnknownOperator
            }
        }
        pest::error::ErrorVariant::CustomError { message } => SyntaxErrorKind::Other(message.clone()),
    };
    ParseError::Syntax(SyntaxError { kind, position })
}

/// A rule wrapping exactly one child pair (`query`, `atom`'s parenthesized
/// form, etc.) — unwrap to that child.
fn inner_one(pair: Pair<Rule>) -> Pair<Rule> {
    pair.into_inner().next().expect("non-empty production")
}

fn build_or(pair: Pair<Rule>, max_k: u32) -> Result<Node, ParseError> {
    debug_assert_eq!(pair.as_rule(), Rule::or_expr);
    build_assoc(pair, max_k, build_xor, crate::ast::builders::or)
}

fn build_xor(pair: Pair<Rule>, max_k: u32) -> Result<Node, ParseError> {
    debug_assert_eq!(pair.as_rule(), Rule::xor_expr);
    build_assoc(pair, max_k, build_and, crate::ast::builders::xor)
}

fn build_and(pair: Pair<Rule>, max_k: u32) -> Result<Node, ParseError> {
    debug_assert_eq!(pair.as_rule(), Rule::and_expr);
    build_assoc(pair, max_k, build_not, crate::ast::builders::and)
}

fn build_assoc(
    pair: Pair<Rule>,
    max_k: u32,
    mut build_child: impl FnMut(Pair<Rule>, u32) -> Result<Node, ParseError>,
    combine: impl FnOnce(Vec<Node>) -> Node,
) -> Result<Node, ParseError> {
    let children: Result<Vec<Node>, ParseError> =
        pair.into_inner().map(|p| build_child(p, max_k)).collect();
    Ok(combine(children?))
}

fn build_not(pair: Pair<Rule>, max_k: u32) -> Result<Node, ParseError> {
    debug_assert_eq!(pair.as_rule(), Rule::not_expr);
    let inner = pair.into_inner().next().expect("not_expr always has a child");
    match inner.as_rule() {
        Rule::not_expr => Ok(crate::ast::builders::not(build_not(inner, max_k)?)),
        Rule::atom => build_atom(inner, max_k),
        other => unreachable!("unexpected rule under not_expr: {other:?}"),
    }
}

fn build_atom(pair: Pair<Rule>, max_k: u32) -> Result<Node, ParseError> {
    debug_assert_eq!(pair.as_rule(), Rule::atom);
    let inner = pair.into_inner().next().expect("atom always has a child");
    match inner.as_rule() {
        Rule::or_expr => build_or(inner, max_k),
        Rule::kw_leaf => build_kw_leaf(inner),
        Rule::col_scope => build_col_scope(inner, max_k),
        other => unreachable!("unexpected rule under atom: {other:?}"),
    }
}

fn build_kw_leaf(pair: Pair<Rule>) -> Result<Node, ParseError> {
    let quoted = pair.into_inner().next().expect("kw_leaf always has a quoted_string");
    let query = unquote(quoted);
    Ok(Node::Keyword(KeywordLeaf { query }))
}

fn build_col_scope(pair: Pair<Rule>, max_k: u32) -> Result<Node, ParseError> {
    let col_or = pair.into_inner().next().expect("col_scope always has a col_or");
    let inner = build_col_or(col_or, max_k)?;
    Ok(Node::ColumnScope(Box::new(inner)))
}

fn build_col_or(pair: Pair<Rule>, max_k: u32) -> Result<Node, ParseError> {
    debug_assert_eq!(pair.as_rule(), Rule::col_or);
    build_assoc(pair, max_k, build_col_xor, crate::ast::builders::or)
}

fn build_col_xor(pair: Pair<Rule>, max_k: u32) -> Result<Node, ParseError> {
    debug_assert_eq!(pair.as_rule(), Rule::col_xor);
    build_assoc(pair, max_k, build_col_and, crate::ast::builders::xor)
}

fn build_col_and(pair: Pair<Rule>, max_k: u32) -> Result<Node, ParseError> {
    debug_assert_eq!(pair.as_rule(), Rule::col_and);
    build_assoc(pair, max_k, build_col_not, crate::ast::builders::and)
}

fn build_col_not(pair: Pair<Rule>, max_k: u32) -> Result<Node, ParseError> {
    debug_assert_eq!(pair.as_rule(), Rule::col_not);
    let inner = pair.into_inner().next().expect("col_not always has a child");
    match inner.as_rule() {
        Rule::col_not => Ok(crate::ast::builders::not(build_col_not(inner, max_k)?)),
        Rule::col_atom => build_col_atom(inner, max_k),
        other => unreachable!("unexpected rule under col_not: {other:?}"),
    }
}

fn build_col_atom(pair: Pair<Rule>, max_k: u32) -> Result<Node, ParseError> {
    debug_assert_eq!(pair.as_rule(), Rule::col_atom);
    let inner = pair.into_inner().next().expect("col_atom always has a child");
    match inner.as_rule() {
        Rule::col_or => build_col_or(inner, max_k),
        Rule::name_leaf => build_name_leaf(inner, max_k),
        Rule::pp_leaf => build_pp_leaf(inner),
        other => unreachable!("unexpected rule under col_atom: {other:?}"),
    }
}

fn build_name_leaf(pair: Pair<Rule>, max_k: u32) -> Result<Node, ParseError> {
    let position = pair.as_span().start();
    let mut inner = pair.into_inner();
    let name_pair = inner.next().expect("name_leaf has a name");
    let k_pair = inner.next().expect("name_leaf has a k");

    let name = unquote_or_bare(name_pair);
    let k_raw: i64 = k_pair
        .as_str()
        .parse()
        .map_err(|_| ParseError::Syntax(SyntaxError { kind: SyntaxErrorKind::MalformedNumber, position }))?;
    if k_raw < 0 {
        return Err(ParseError::Semantic(SemanticConstraintError {
            kind: SemanticConstraintKind::NegativeK { k: k_raw },
            position,
        }));
    }
    let k = k_raw as u32;
    if k > max_k {
        return Err(ParseError::Semantic(SemanticConstraintError {
            kind: SemanticConstraintKind::KExceedsMax { k, max: max_k },
            position,
        }));
    }
    Ok(Node::ColumnName(ColumnNameLeaf { name, k }))
}

fn build_pp_leaf(pair: Pair<Rule>) -> Result<Node, ParseError> {
    let position = pair.as_span().start();
    let mut inner = pair.into_inner();
    let p_pair = inner.next().expect("pp_leaf has p");
    let cmp_pair = inner.next().expect("pp_leaf has comparator");
    let v_pair = inner.next().expect("pp_leaf has v");

    let p: f64 = p_pair
        .as_str()
        .parse()
        .map_err(|_| ParseError::Syntax(SyntaxError { kind: SyntaxErrorKind::MalformedNumber, position }))?;
    let v: f64 = v_pair
        .as_str()
        .parse()
        .map_err(|_| ParseError::Syntax(SyntaxError { kind: SyntaxErrorKind::MalformedNumber, position }))?;
    let comparator = Comparator::parse(&cmp_pair.as_str().to_lowercase())
        .ok_or(ParseError::Syntax(SyntaxError { kind: SyntaxErrorKind::UnknownOperator, position }))?;

    if !(0.0..=1.0).contains(&p) {
        return Err(ParseError::Semantic(SemanticConstraintError {
            kind: SemanticConstraintKind::PercentileOutOfRange { p },
            position,
        }));
    }

    Ok(Node::Percentile(PercentileLeaf { p, comparator, v }))
}

fn unquote(pair: Pair<Rule>) -> String {
    let raw = pair.as_str();
    raw[1..raw.len() - 1].to_string()
}

fn unquote_or_bare(pair: Pair<Rule>) -> String {
    let raw = pair.as_str();
    if (raw.starts_with('\'') && raw.ends_with('\'')) || (raw.starts_with('"') && raw.ends_with('"')) {
        raw[1..raw.len() - 1].to_string()
    } else {
        raw.to_string()
    }
}

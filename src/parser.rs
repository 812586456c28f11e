//! Query language parser
//!
//! Parses tgrep query strings into the Pattern AST using a pest grammar.
//! Operators and regexes are validated here, so a query that parses will
//! never fail at match time because of a bad symbol or regex.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use thiserror::Error;

use crate::ops::{InvalidOperator, Operator};
use crate::pattern::{Anchor, Constraint, NodePattern, Pattern, TextRegex};

#[derive(Parser)]
#[grammar = "query.pest"]
struct QueryParser;

/// Error type for query parsing failures
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Query error: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),

    #[error("Query error: {0}")]
    InvalidOperator(#[from] InvalidOperator),

    #[error("Query error: invalid regex /{pattern}/: {error}")]
    Regex {
        pattern: String,
        #[source]
        error: regex::Error,
    },

    #[error("Query error: {0}")]
    Malformed(String),
}

fn malformed(message: &str) -> QueryError {
    QueryError::Malformed(message.to_string())
}

/// Parse a query string into a Pattern
pub fn parse_query(input: &str) -> Result<Pattern, QueryError> {
    let mut pairs = QueryParser::parse(Rule::query, input).map_err(Box::new)?;

    let Some(node) = pairs.next().and_then(|query| query.into_inner().next()) else {
        return Err(malformed("No query found"));
    };

    parse_node(node)
}

/// Parse a node pattern: anchor or group followed by constraints
fn parse_node(pair: Pair<Rule>) -> Result<Pattern, QueryError> {
    let mut inner = pair.into_inner();

    let Some(head) = inner.next() else {
        return Err(malformed("Expected anchor"));
    };
    let constraints = inner.map(parse_alternative).collect::<Result<Vec<_>, _>>()?;

    if head.as_rule() == Rule::group {
        // { ... } < X is read as * & { ... } < X
        let group = parse_group(head)?;
        return Ok(constraints
            .into_iter()
            .fold(group, |node, constraint| node.with_constraint(constraint)));
    }

    Ok(Pattern::Node(NodePattern {
        anchor: parse_anchor(head)?,
        constraints,
    }))
}

/// `{ node }` with an optional `=VAR` capture
fn parse_group(pair: Pair<Rule>) -> Result<Pattern, QueryError> {
    let mut inner = pair.into_inner();

    let Some(node) = inner.next() else {
        return Err(malformed("Empty group"));
    };
    let group = parse_node(node)?.group();

    match inner.next() {
        Some(capture) => Ok(group.capture(first_inner(capture)?.as_str())),
        None => Ok(group),
    }
}

/// Parse `a | b | c`, folding to the right
fn parse_alternative(pair: Pair<Rule>) -> Result<Pattern, QueryError> {
    let mut arms = pair
        .into_inner()
        .map(parse_unary)
        .collect::<Result<Vec<_>, _>>()?;

    let Some(mut folded) = arms.pop() else {
        return Err(malformed("Empty alternation"));
    };
    while let Some(lhs) = arms.pop() {
        folded = lhs.or(folded);
    }
    Ok(folded)
}

fn parse_unary(pair: Pair<Rule>) -> Result<Pattern, QueryError> {
    match pair.as_rule() {
        Rule::negation => Ok(parse_unary(first_inner(pair)?)?.negate()),
        Rule::reluctant => Ok(parse_unary(first_inner(pair)?)?.reluctant()),
        Rule::constraint_group => {
            let constraints = pair
                .into_inner()
                .map(parse_alternative)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Pattern::All(constraints))
        }
        Rule::group => parse_group(pair),
        Rule::relation => parse_relation(pair),
        rule => Err(QueryError::Malformed(format!(
            "Unexpected constraint: {rule:?}"
        ))),
    }
}

/// Parse `operator operand`
fn parse_relation(pair: Pair<Rule>) -> Result<Pattern, QueryError> {
    let mut inner = pair.into_inner();

    let Some(op_pair) = inner.next() else {
        return Err(malformed("Expected operator"));
    };
    let op: Operator = op_pair.as_str().parse()?;

    let Some(operand) = inner.next() else {
        return Err(malformed("Expected operand"));
    };
    let rhs = match operand.as_rule() {
        Rule::group => parse_group(operand)?,
        Rule::bare_node => Pattern::anchor(parse_anchor(first_inner(operand)?)?),
        rule => {
            return Err(QueryError::Malformed(format!(
                "Unexpected operand: {rule:?}"
            )));
        }
    };

    Ok(Pattern::Constraint(Constraint::new(op, rhs)))
}

/// Parse an anchor with its optional `=VAR` capture
fn parse_anchor(pair: Pair<Rule>) -> Result<Anchor, QueryError> {
    let mut inner = pair.into_inner();

    let Some(base) = inner.next() else {
        return Err(malformed("Expected anchor"));
    };
    let anchor = parse_base(base)?;

    match inner.next() {
        Some(capture) => {
            let var = first_inner(capture)?.as_str();
            Ok(anchor.capture(var))
        }
        None => Ok(anchor),
    }
}

fn parse_base(pair: Pair<Rule>) -> Result<Anchor, QueryError> {
    match pair.as_rule() {
        Rule::wildcard => Ok(Anchor::Wildcard),
        Rule::regex => Ok(Anchor::LabelRegex(parse_regex(pair)?)),
        Rule::quoted => Ok(Anchor::Label(unquote(pair)?)),
        Rule::bare => Ok(Anchor::label(pair.as_str())),
        Rule::same_as => Ok(Anchor::same_as(first_inner(pair)?.as_str())),
        Rule::different_from => Ok(Anchor::different_from(first_inner(pair)?.as_str())),
        Rule::lex_anchor => {
            let value = first_inner(pair)?;
            match value.as_rule() {
                Rule::regex => Ok(Anchor::LexRegex(parse_regex(value)?)),
                Rule::quoted => Ok(Anchor::Lex(unquote(value)?)),
                _ => Ok(Anchor::lex(value.as_str())),
            }
        }
        Rule::cat_anchor => {
            let value = first_inner(pair)?;
            match value.as_rule() {
                Rule::regex => Ok(Anchor::CategoryRegex(parse_regex(value)?)),
                Rule::quoted => Ok(Anchor::Category(unquote(value)?)),
                _ => Ok(Anchor::category(value.as_str())),
            }
        }
        rule => Err(QueryError::Malformed(format!("Unexpected anchor: {rule:?}"))),
    }
}

/// `/body/` or `/body/a`
fn parse_regex(pair: Pair<Rule>) -> Result<TextRegex, QueryError> {
    let mut inner = pair.into_inner();

    let Some(body) = inner.next() else {
        return Err(malformed("Expected regex body"));
    };
    let anchored = inner.next().is_none();
    let pattern = body.as_str().replace("\\/", "/");

    TextRegex::new(&pattern, anchored).map_err(|error| QueryError::Regex { pattern, error })
}

/// Contents of a quoted string with `\"` and `\\` unescaped
fn unquote(pair: Pair<Rule>) -> Result<String, QueryError> {
    let body = first_inner(pair)?.as_str();

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match (c, chars.clone().next()) {
            ('\\', Some(next @ ('"' | '\\'))) => {
                out.push(next);
                chars.next();
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}

fn first_inner(pair: Pair<Rule>) -> Result<Pair<Rule>, QueryError> {
    let rule = pair.as_rule();
    pair.into_inner()
        .next()
        .ok_or_else(|| QueryError::Malformed(format!("Empty {rule:?}")))
}

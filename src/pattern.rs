//! Pattern AST
//!
//! A compiled query is an immutable expression tree. The head of every node
//! pattern is an [`Anchor`] that tests a single tree node; the anchor is
//! followed by zero or more constraints, each relating the candidate node to
//! other nodes through an [`Operator`].
//!
//! Evaluation order is part of the contract: anchors before constraints,
//! constraints left to right, depth first. A backreference only sees
//! variables bound by parts of the pattern evaluated before it.

use crate::ops::{InvalidOperator, Operator};
use regex::Regex;
use std::fmt;

/// A regex over a node's label, lexical item or category string
#[derive(Clone)]
pub struct TextRegex {
    source: String,
    anchored: bool,
    regex: Regex,
}

impl TextRegex {
    /// Compile a regex that must match from the start of the text
    pub fn anchored(source: &str) -> Result<Self, regex::Error> {
        Self::new(source, true)
    }

    /// Compile a regex that may match anywhere in the text
    pub fn unanchored(source: &str) -> Result<Self, regex::Error> {
        Self::new(source, false)
    }

    pub fn new(source: &str, anchored: bool) -> Result<Self, regex::Error> {
        let regex = if anchored {
            Regex::new(&format!("^(?:{source})"))?
        } else {
            Regex::new(source)?
        };
        Ok(Self {
            source: source.to_string(),
            anchored,
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

// Manual Debug implementation
impl fmt::Debug for TextRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextRegex")
            .field("source", &self.source)
            .field("anchored", &self.anchored)
            .finish()
    }
}

// Manual PartialEq implementation (compare sources, not compiled regexes)
impl PartialEq for TextRegex {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.anchored == other.anchored
    }
}

impl fmt::Display for TextRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.source)?;
        if !self.anchored {
            f.write_str("a")?;
        }
        Ok(())
    }
}

/// A single-node matcher
#[derive(Debug, Clone, PartialEq)]
pub enum Anchor {
    /// `*`
    Wildcard,
    /// `X`: exact label
    Label(String),
    /// `/re/`
    LabelRegex(TextRegex),
    /// `^"s"`: exact lexical item of a leaf
    Lex(String),
    /// `^/re/`
    LexRegex(TextRegex),
    /// `@s`: exact category string
    Category(String),
    /// `@/re/`
    CategoryRegex(TextRegex),
    /// `=V`: same category as the node bound to `V`
    SameAs(String),
    /// `~V`: different category from the node bound to `V`
    DifferentFrom(String),
    /// `anchor=V`: bind `V` to the node when the inner anchor matches
    Capture(Box<Anchor>, String),
}

impl Anchor {
    pub fn label(label: &str) -> Self {
        Anchor::Label(label.to_string())
    }

    pub fn lex(lex: &str) -> Self {
        Anchor::Lex(lex.to_string())
    }

    pub fn category(category: &str) -> Self {
        Anchor::Category(category.to_string())
    }

    pub fn same_as(var: &str) -> Self {
        Anchor::SameAs(var.to_string())
    }

    pub fn different_from(var: &str) -> Self {
        Anchor::DifferentFrom(var.to_string())
    }

    /// Wrap this anchor so that a successful match binds `var`
    pub fn capture(self, var: &str) -> Self {
        Anchor::Capture(Box::new(self), var.to_string())
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anchor::Wildcard => f.write_str("*"),
            Anchor::Label(label) if is_bare(label) => f.write_str(label),
            Anchor::Label(label) => write!(f, "{label:?}"),
            Anchor::LabelRegex(re) => write!(f, "{re}"),
            Anchor::Lex(lex) => write!(f, "^{lex:?}"),
            Anchor::LexRegex(re) => write!(f, "^{re}"),
            Anchor::Category(cat) => write!(f, "@{cat:?}"),
            Anchor::CategoryRegex(re) => write!(f, "@{re}"),
            Anchor::SameAs(var) => write!(f, "={var}"),
            Anchor::DifferentFrom(var) => write!(f, "~{var}"),
            Anchor::Capture(inner, var) => write!(f, "{inner}={var}"),
        }
    }
}

/// Whether a label can be written unquoted in a query
fn is_bare(label: &str) -> bool {
    const RESERVED: &str = "$&#.*/^@\"?%";
    const STRUCTURAL: &str = "{}[]()!|=~<>";

    let Some(first) = label.chars().next() else {
        return false;
    };
    !RESERVED.contains(first)
        && !label
            .chars()
            .any(|c| c.is_whitespace() || STRUCTURAL.contains(c))
}

/// An operator applied to a nested pattern
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub op: Operator,
    pub rhs: Box<Pattern>,
}

impl Constraint {
    pub fn new(op: Operator, rhs: Pattern) -> Self {
        Self {
            op,
            rhs: Box::new(rhs),
        }
    }

    /// Build a constraint from an operator symbol such as `<<` or `#<3`.
    ///
    /// Unknown symbols are rejected here rather than at match time.
    pub fn from_symbol(symbol: &str, rhs: Pattern) -> Result<Self, InvalidOperator> {
        Ok(Self::new(symbol.parse()?, rhs))
    }
}

/// An anchor followed by its constraints
#[derive(Debug, Clone, PartialEq)]
pub struct NodePattern {
    pub anchor: Anchor,
    pub constraints: Vec<Pattern>,
}

impl NodePattern {
    pub fn new(anchor: Anchor) -> Self {
        Self {
            anchor,
            constraints: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Anchor plus constraints
    Node(NodePattern),
    /// Operator plus nested pattern
    Constraint(Constraint),
    /// `!p`: inverts the result; captures made by `p` still stand
    Not(Box<Pattern>),
    /// `p | q`: `q` is only tried when `p` fails
    Or(Box<Pattern>, Box<Pattern>),
    /// `{p}`: parenthesisation only
    Group(Box<Pattern>),
    /// `[p q ...]`: all of the constraints hold
    All(Vec<Pattern>),
    /// `?p`: always succeeds; `p` runs for its captures
    Reluctant(Box<Pattern>),
    /// `{p}=V`: binds `V` to the node when `p` matches it
    Capture(Box<Pattern>, String),
}

impl Pattern {
    /// A node pattern with no constraints
    pub fn anchor(anchor: Anchor) -> Self {
        Pattern::Node(NodePattern::new(anchor))
    }

    /// `*`
    pub fn wildcard() -> Self {
        Self::anchor(Anchor::Wildcard)
    }

    /// Append a constraint `op rhs` to a node pattern.
    ///
    /// Any other pattern is first wrapped as the rhs of `&`, so the result is
    /// always a node pattern that still means "self and the new constraint".
    pub fn with(self, op: Operator, rhs: Pattern) -> Self {
        self.with_constraint(Pattern::Constraint(Constraint::new(op, rhs)))
    }

    /// Append an arbitrary constraint-like pattern (negation, alternation...)
    pub fn with_constraint(self, constraint: Pattern) -> Self {
        match self {
            Pattern::Node(mut node) => {
                node.constraints.push(constraint);
                Pattern::Node(node)
            }
            other => Pattern::Node(NodePattern {
                anchor: Anchor::Wildcard,
                constraints: vec![
                    Pattern::Constraint(Constraint::new(Operator::And, other)),
                    constraint,
                ],
            }),
        }
    }

    pub fn relation(op: Operator, rhs: Pattern) -> Self {
        Pattern::Constraint(Constraint::new(op, rhs))
    }

    pub fn negate(self) -> Self {
        Pattern::Not(Box::new(self))
    }

    pub fn or(self, other: Pattern) -> Self {
        Pattern::Or(Box::new(self), Box::new(other))
    }

    pub fn group(self) -> Self {
        Pattern::Group(Box::new(self))
    }

    pub fn reluctant(self) -> Self {
        Pattern::Reluctant(Box::new(self))
    }

    /// Bind `var` to the node when this pattern matches it
    pub fn capture(self, var: &str) -> Self {
        Pattern::Capture(Box::new(self), var.to_string())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Node(node) => {
                write!(f, "{}", node.anchor)?;
                for constraint in &node.constraints {
                    write!(f, " {constraint}")?;
                }
                Ok(())
            }
            Pattern::Constraint(Constraint { op, rhs }) => match rhs.as_ref() {
                Pattern::Node(node) if node.constraints.is_empty() => {
                    write!(f, "{op} {}", node.anchor)
                }
                Pattern::Group(_) | Pattern::Capture(..) => write!(f, "{op} {rhs}"),
                other => write!(f, "{op} {{ {other} }}"),
            },
            Pattern::Not(inner) => write!(f, "! {inner}"),
            Pattern::Or(lhs, rhs) => write!(f, "{lhs} | {rhs}"),
            Pattern::Group(inner) => write!(f, "{{ {inner} }}"),
            Pattern::All(constraints) => {
                f.write_str("[")?;
                for constraint in constraints {
                    write!(f, " {constraint}")?;
                }
                f.write_str(" ]")
            }
            Pattern::Reluctant(inner) => write!(f, "? {inner}"),
            Pattern::Capture(inner, var) => match inner.as_ref() {
                Pattern::Group(_) => write!(f, "{inner}={var}"),
                other => write!(f, "{{ {other} }}={var}"),
            },
        }
    }
}

//! Pattern evaluation
//!
//! Decides whether a tree node satisfies a pattern. Evaluation is depth
//! first and strictly left to right: the anchor is tested first, then each
//! constraint in declared order, stopping at the first failure. Captures are
//! written into the context as they happen and are never rolled back, so
//! a capture inside a negation or inside the failed left arm of an
//! alternation still stands afterwards.

use crate::context::Context;
use crate::ops::Operator;
use crate::pattern::{Anchor, NodePattern, Pattern};
use crate::tree::{NodeId, Tree};
use thiserror::Error;

/// Errors raised while evaluating a pattern
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// A backreference named a variable that nothing earlier had bound
    #[error("no variable {0} exists in the context")]
    UnboundVariable(String),

    /// The operator is declared but has no implementation
    #[error("operator {0} is not supported")]
    UnsupportedOperator(Operator),
}

impl Pattern {
    /// Evaluate the pattern at `node`, recording captures in `ctx`.
    pub fn is_satisfied_by(
        &self,
        tree: &Tree,
        node: NodeId,
        ctx: &mut Context,
    ) -> Result<bool, MatchError> {
        match self {
            Pattern::Node(node_pattern) => node_pattern.is_satisfied_by(tree, node, ctx),
            Pattern::Constraint(constraint) => constraint.op.apply(&constraint.rhs, tree, node, ctx),
            Pattern::Not(inner) => Ok(!inner.is_satisfied_by(tree, node, ctx)?),
            Pattern::Or(lhs, rhs) => {
                if lhs.is_satisfied_by(tree, node, ctx)? {
                    return Ok(true);
                }
                rhs.is_satisfied_by(tree, node, ctx)
            }
            Pattern::Group(inner) => inner.is_satisfied_by(tree, node, ctx),
            Pattern::All(constraints) => all_satisfied(constraints, tree, node, ctx),
            Pattern::Reluctant(inner) => {
                inner.is_satisfied_by(tree, node, ctx)?;
                Ok(true)
            }
            Pattern::Capture(inner, var) => {
                let satisfied = inner.is_satisfied_by(tree, node, ctx)?;
                if satisfied {
                    ctx.bind(var, node);
                }
                Ok(satisfied)
            }
        }
    }

    /// Evaluate the pattern at `node` with a fresh context, returning the
    /// context on success.
    pub fn match_node(&self, tree: &Tree, node: NodeId) -> Result<Option<Context>, MatchError> {
        let mut ctx = Context::new();
        Ok(self
            .is_satisfied_by(tree, node, &mut ctx)?
            .then_some(ctx))
    }
}

impl NodePattern {
    pub fn is_satisfied_by(
        &self,
        tree: &Tree,
        node: NodeId,
        ctx: &mut Context,
    ) -> Result<bool, MatchError> {
        if !self.anchor.is_satisfied_by(tree, node, ctx)? {
            return Ok(false);
        }
        all_satisfied(&self.constraints, tree, node, ctx)
    }
}

fn all_satisfied(
    constraints: &[Pattern],
    tree: &Tree,
    node: NodeId,
    ctx: &mut Context,
) -> Result<bool, MatchError> {
    for constraint in constraints {
        if !constraint.is_satisfied_by(tree, node, ctx)? {
            return Ok(false);
        }
    }
    Ok(true)
}

impl Anchor {
    pub fn is_satisfied_by(
        &self,
        tree: &Tree,
        node: NodeId,
        ctx: &mut Context,
    ) -> Result<bool, MatchError> {
        let n = &tree[node];

        let satisfied = match self {
            Anchor::Wildcard => true,
            Anchor::Label(label) => n.label == *label,
            Anchor::LabelRegex(re) => re.is_match(&n.label),
            Anchor::Lex(lex) => leaf_lex(tree, node).is_some_and(|l| l == lex.as_str()),
            Anchor::LexRegex(re) => leaf_lex(tree, node).is_some_and(|l| re.is_match(l)),
            Anchor::Category(cat) => n
                .category
                .as_ref()
                .is_some_and(|c| c.to_string() == *cat),
            Anchor::CategoryRegex(re) => n
                .category
                .as_ref()
                .is_some_and(|c| re.is_match(&c.to_string())),
            Anchor::SameAs(var) => tree[ctx.get(var)?].same_category(n),
            Anchor::DifferentFrom(var) => !tree[ctx.get(var)?].same_category(n),
            Anchor::Capture(inner, var) => {
                let satisfied = inner.is_satisfied_by(tree, node, ctx)?;
                if satisfied {
                    ctx.bind(var, node);
                }
                satisfied
            }
        };

        Ok(satisfied)
    }
}

fn leaf_lex(tree: &Tree, node: NodeId) -> Option<&str> {
    if tree.is_leaf(node) {
        tree.lex(node)
    } else {
        None
    }
}

//! Relational operators
//!
//! Each operator relates a candidate node to other nodes of the same tree and
//! asks whether any (or, for `<%`, every) of them satisfies a nested pattern.
//! The symbol table is fixed: plain symbols are matched exactly, then the
//! parameterised forms `##N`, `#<N` and `<N` are tried in that order.

use crate::context::Context;
use crate::eval::MatchError;
use crate::pattern::Pattern;
use crate::tree::{NodeId, Tree};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An operator symbol that is not in the operator table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid operator {0:?}")]
pub struct InvalidOperator(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `<`
    IsParentOf,
    /// `<<`: some strict descendant
    Dominates,
    /// `<1`
    LeftChildOf,
    /// `<2`
    RightChildOf,
    /// `<N`, 1-indexed
    IsNthChildOf(usize),
    /// `<%`
    AllChildrenOf,
    /// `>`
    IsChildOf,
    /// `>>`: some strict ancestor
    IsDominatedBy,
    /// `.`
    ImmediatelyPrecedes,
    /// `..`
    Precedes,
    /// `$`
    IsSiblingOf,
    /// `$.`, not supported
    IsSiblingOfAndImmediatelyPrecedes,
    /// `$..`, not supported
    IsSiblingOfAndPrecedes,
    /// `&`
    And,
    /// `<#`
    ImmediatelyHeadedBy,
    /// `<<#`
    HeadedBy,
    /// `#<N`
    ChildCount(usize),
    /// `##N`
    HeadIndexIs(usize),
}

/// Parameterised operators, tried in order after the plain symbols
const PARAMETERIZED: &[(&str, fn(usize) -> Operator)] = &[
    ("##", Operator::HeadIndexIs),
    ("#<", Operator::ChildCount),
    ("<", Operator::IsNthChildOf),
];

impl FromStr for Operator {
    type Err = InvalidOperator;

    fn from_str(symbol: &str) -> Result<Self, Self::Err> {
        let op = match symbol {
            "<" => Operator::IsParentOf,
            "<<" => Operator::Dominates,
            "<1" => Operator::LeftChildOf,
            "<2" => Operator::RightChildOf,
            "<%" => Operator::AllChildrenOf,
            ">" => Operator::IsChildOf,
            ">>" => Operator::IsDominatedBy,
            "." => Operator::ImmediatelyPrecedes,
            ".." => Operator::Precedes,
            "$" => Operator::IsSiblingOf,
            "$." => Operator::IsSiblingOfAndImmediatelyPrecedes,
            "$.." => Operator::IsSiblingOfAndPrecedes,
            "&" => Operator::And,
            "<#" => Operator::ImmediatelyHeadedBy,
            "<<#" => Operator::HeadedBy,
            _ => {
                return parse_parameterized(symbol)
                    .ok_or_else(|| InvalidOperator(symbol.to_string()));
            }
        };
        Ok(op)
    }
}

fn parse_parameterized(symbol: &str) -> Option<Operator> {
    PARAMETERIZED.iter().find_map(|&(prefix, make)| {
        let digits = symbol.strip_prefix(prefix)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        atoi::atoi::<usize>(digits.as_bytes()).map(make)
    })
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::IsParentOf => f.write_str("<"),
            Operator::Dominates => f.write_str("<<"),
            Operator::LeftChildOf => f.write_str("<1"),
            Operator::RightChildOf => f.write_str("<2"),
            Operator::IsNthChildOf(n) => write!(f, "<{n}"),
            Operator::AllChildrenOf => f.write_str("<%"),
            Operator::IsChildOf => f.write_str(">"),
            Operator::IsDominatedBy => f.write_str(">>"),
            Operator::ImmediatelyPrecedes => f.write_str("."),
            Operator::Precedes => f.write_str(".."),
            Operator::IsSiblingOf => f.write_str("$"),
            Operator::IsSiblingOfAndImmediatelyPrecedes => f.write_str("$."),
            Operator::IsSiblingOfAndPrecedes => f.write_str("$.."),
            Operator::And => f.write_str("&"),
            Operator::ImmediatelyHeadedBy => f.write_str("<#"),
            Operator::HeadedBy => f.write_str("<<#"),
            Operator::ChildCount(n) => write!(f, "#<{n}"),
            Operator::HeadIndexIs(n) => write!(f, "##{n}"),
        }
    }
}

impl Operator {
    /// Whether `node` stands in this relation to some node satisfying `rhs`.
    ///
    /// `#<N` and `##N` test `node` alone and never evaluate `rhs`.
    pub fn apply(
        self,
        rhs: &Pattern,
        tree: &Tree,
        node: NodeId,
        ctx: &mut Context,
    ) -> Result<bool, MatchError> {
        let children = tree.children(node);

        match self {
            Operator::IsParentOf => any_satisfies(rhs, tree, ctx, children.iter().copied()),
            Operator::Dominates => {
                if tree.is_leaf(node) {
                    return Ok(false);
                }
                any_satisfies(rhs, tree, ctx, tree.preorder(node).skip(1))
            }
            Operator::LeftChildOf => any_satisfies(rhs, tree, ctx, children.first().copied()),
            Operator::RightChildOf => any_satisfies(rhs, tree, ctx, children.get(1).copied()),
            Operator::IsNthChildOf(n) => {
                let nth = n.checked_sub(1).and_then(|i| children.get(i)).copied();
                any_satisfies(rhs, tree, ctx, nth)
            }
            Operator::AllChildrenOf => {
                if children.is_empty() {
                    return Ok(false);
                }
                for &child in children {
                    if !rhs.is_satisfied_by(tree, child, ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Operator::IsChildOf => any_satisfies(rhs, tree, ctx, tree.parent(node)),
            Operator::IsDominatedBy => any_satisfies(rhs, tree, ctx, tree.ancestors(node)),
            Operator::ImmediatelyPrecedes => {
                if !tree.is_leaf(node) {
                    return Ok(false);
                }
                let mut later = later_leaves(tree, node);
                any_satisfies(rhs, tree, ctx, later.next())
            }
            Operator::Precedes => {
                if !tree.is_leaf(node) {
                    return Ok(false);
                }
                any_satisfies(rhs, tree, ctx, later_leaves(tree, node))
            }
            Operator::IsSiblingOf => {
                let Some(parent) = tree.parent(node) else {
                    return Ok(false);
                };
                let siblings = tree.children(parent).iter().copied().filter(|&s| s != node);
                any_satisfies(rhs, tree, ctx, siblings)
            }
            Operator::IsSiblingOfAndImmediatelyPrecedes | Operator::IsSiblingOfAndPrecedes => {
                Err(MatchError::UnsupportedOperator(self))
            }
            Operator::And => rhs.is_satisfied_by(tree, node, ctx),
            Operator::ImmediatelyHeadedBy => {
                any_satisfies(rhs, tree, ctx, tree.head_child(node))
            }
            Operator::HeadedBy => any_satisfies(rhs, tree, ctx, tree.head_chain(node)),
            Operator::ChildCount(n) => Ok(children.len() == n),
            Operator::HeadIndexIs(n) => {
                Ok(!tree.is_leaf(node) && tree[node].head_index == Some(n))
            }
        }
    }
}

/// Short-circuiting existential test over candidate nodes
fn any_satisfies(
    rhs: &Pattern,
    tree: &Tree,
    ctx: &mut Context,
    candidates: impl IntoIterator<Item = NodeId>,
) -> Result<bool, MatchError> {
    for candidate in candidates {
        if rhs.is_satisfied_by(tree, candidate, ctx)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Leaves after `leaf` in left-to-right order over its whole tree
fn later_leaves(tree: &Tree, leaf: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    let mut leaves = tree.leaves(tree.root_of(leaf));
    let _ = leaves.by_ref().find(|&l| l == leaf);
    leaves
}

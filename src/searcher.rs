//! Tree search driver
//!
//! Walks the nodes of a tree and tests each one against a pattern:
//! 1. Enumerate candidates from the start node (pre-order, or the start node
//!    alone for a non-recursive search)
//! 2. Evaluate the pattern at each candidate with a fresh context
//! 3. Yield the candidate and its captures on success
//!
//! A candidate that trips over an unbound backreference is treated as a
//! non-match. An unsupported operator ends the search.

use crate::context::Context;
use crate::eval::MatchError;
use crate::parser::{QueryError, parse_query};
use crate::pattern::Pattern;
use crate::tree::{NodeId, Tree};
use std::borrow::Cow;
use thiserror::Error;

/// Error during search
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Match error: {0}")]
    Match(#[from] MatchError),
}

/// Search options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Visit every node under the start node, not just the start node
    pub recursive: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { recursive: true }
    }
}

/// A node that satisfied the pattern, with the captures made on the way
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub node: NodeId,
    pub context: Context,
}

impl Match {
    /// The node bound to `var`, if any
    pub fn get(&self, var: &str) -> Option<NodeId> {
        self.context.lookup(var)
    }
}

/// Lazy iterator over the matches of a pattern
pub struct Matches<'a> {
    tree: &'a Tree,
    pattern: Cow<'a, Pattern>,
    candidates: Box<dyn Iterator<Item = NodeId> + 'a>,
    done: bool,
}

impl<'a> Matches<'a> {
    fn new(
        tree: &'a Tree,
        start: NodeId,
        pattern: Cow<'a, Pattern>,
        options: &SearchOptions,
    ) -> Self {
        let candidates: Box<dyn Iterator<Item = NodeId> + 'a> = if options.recursive {
            Box::new(tree.preorder(start))
        } else {
            Box::new(std::iter::once(start))
        };
        Self {
            tree,
            pattern,
            candidates,
            done: false,
        }
    }
}

impl Iterator for Matches<'_> {
    type Item = Result<Match, MatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        for node in self.candidates.by_ref() {
            match self.pattern.match_node(self.tree, node) {
                Ok(Some(context)) => {
                    tracing::trace!(node, label = self.tree.label(node), "match");
                    return Some(Ok(Match { node, context }));
                }
                Ok(None) => {}
                Err(MatchError::UnboundVariable(var)) => {
                    tracing::debug!(node, %var, "skipping candidate with unbound variable");
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        self.done = true;
        None
    }
}

/// First match at or under `start`, in pre-order
pub fn find_first(
    tree: &Tree,
    start: NodeId,
    pattern: &Pattern,
) -> Result<Option<Match>, MatchError> {
    find_first_with(tree, start, pattern, &SearchOptions::default())
}

pub fn find_first_with(
    tree: &Tree,
    start: NodeId,
    pattern: &Pattern,
    options: &SearchOptions,
) -> Result<Option<Match>, MatchError> {
    find_all_with(tree, start, pattern, options).next().transpose()
}

/// All matches at or under `start`, in pre-order
pub fn find_all<'a>(tree: &'a Tree, start: NodeId, pattern: &'a Pattern) -> Matches<'a> {
    find_all_with(tree, start, pattern, &SearchOptions::default())
}

pub fn find_all_with<'a>(
    tree: &'a Tree,
    start: NodeId,
    pattern: &'a Pattern,
    options: &SearchOptions,
) -> Matches<'a> {
    Matches::new(tree, start, Cow::Borrowed(pattern), options)
}

/// Search a whole tree with a query string
///
/// Parses the query and returns the matches from the root. A tree with no
/// root has no matches.
pub fn search_query<'a>(tree: &'a Tree, query: &str) -> Result<Matches<'a>, SearchError> {
    let pattern = parse_query(query)?;
    let mut matches = Matches::new(
        tree,
        tree.root_id.unwrap_or_default(),
        Cow::Owned(pattern),
        &SearchOptions::default(),
    );
    if tree.root_id.is_none() {
        matches.done = true;
    }
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Operator;
    use crate::pattern::Anchor;
    use crate::reader::parse_tree;

    fn label(l: &str) -> Pattern {
        Pattern::anchor(Anchor::label(l))
    }

    fn nodes(matches: Matches) -> Vec<NodeId> {
        matches.map(|m| m.unwrap().node).collect()
    }

    #[test]
    fn test_nested_capture() {
        // A(B(D, E), C)
        let tree = parse_tree("(A (B (D d) (E e)) (C c))").unwrap();
        let pattern = parse_query("A < { B=BB < D }").unwrap();

        let m = find_first(&tree, 0, &pattern).unwrap().unwrap();
        assert_eq!(m.node, 0);
        assert_eq!(m.get("BB"), Some(1));
        assert_eq!(m.context.len(), 1);
    }

    #[test]
    fn test_sibling_queries() {
        let tree = parse_tree("(A (B (D d) (E e)) (C c))").unwrap();

        let m = find_first(&tree, 0, &parse_query("B $ C").unwrap()).unwrap();
        assert_eq!(m.map(|m| m.node), Some(1));
        assert!(find_first(&tree, 0, &parse_query("B $ D").unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_precedence_queries() {
        let tree = parse_tree("(R (x x) (y y) (z z))").unwrap();

        for (query, expected) in [("x . y", true), ("x . z", false), ("x .. z", true)] {
            let pattern = parse_query(query).unwrap();
            assert_eq!(
                find_first(&tree, 0, &pattern).unwrap().is_some(),
                expected,
                "{query}"
            );
        }
    }

    #[test]
    fn test_wildcard_visits_every_node_once() {
        let tree = parse_tree("(S (NP (DT the) (NN dog)) (VP (VBD ran)))").unwrap();
        let found = nodes(find_all(&tree, 0, &Pattern::wildcard()));
        assert_eq!(found, [0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_search_from_subtree() {
        let tree = parse_tree("(S (NP (DT the) (NN dog)) (VP (VBD ran)))").unwrap();
        let found = nodes(find_all(&tree, 1, &Pattern::wildcard()));
        assert_eq!(found, [1, 2, 3]);
    }

    #[test]
    fn test_non_recursive_search() {
        let tree = parse_tree("(S (NP (DT the) (NN dog)) (VP (VBD ran)))").unwrap();
        let options = SearchOptions { recursive: false };

        let found: Vec<_> = find_all_with(&tree, 1, &Pattern::wildcard(), &options)
            .map(|m| m.unwrap().node)
            .collect();
        assert_eq!(found, [1]);

        let pattern = label("DT");
        assert!(find_first_with(&tree, 1, &pattern, &options).unwrap().is_none());
        assert!(find_first(&tree, 1, &pattern).unwrap().is_some());
    }

    #[test]
    fn test_fresh_context_per_candidate() {
        let tree = parse_tree("(A (B b) (B c))").unwrap();
        let pattern = parse_query("B=X").unwrap();

        let contexts: Vec<_> = find_all(&tree, 0, &pattern)
            .map(|m| m.unwrap().context)
            .collect();
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0].lookup("X"), Some(1));
        assert_eq!(contexts[1].lookup("X"), Some(2));
        assert!(contexts.iter().all(|ctx| ctx.len() == 1));
    }

    #[test]
    fn test_unbound_variable_skips_candidate() {
        // Only candidates with a child bind X before the backreference runs
        let tree = parse_tree("(A (B (C c)) (D d))").unwrap();
        let pattern = Pattern::wildcard()
            .with_constraint(
                Pattern::relation(Operator::IsParentOf, Pattern::anchor(Anchor::Wildcard.capture("X")))
                    .reluctant(),
            )
            .with(Operator::And, Pattern::anchor(Anchor::different_from("X")));

        let found = nodes(find_all(&tree, 0, &pattern));
        assert_eq!(found, [0, 1]);
    }

    #[test]
    fn test_unsupported_operator_ends_search() {
        let tree = parse_tree("(A (B b) (C c))").unwrap();
        let pattern = parse_query("* $.. *").unwrap();

        let results: Vec<_> = find_all(&tree, 0, &pattern).collect();
        // the root has no siblings but still evaluates the operator
        assert_eq!(
            results,
            [Err(MatchError::UnsupportedOperator(Operator::IsSiblingOfAndPrecedes))]
        );
        assert!(find_first(&tree, 0, &pattern).is_err());
    }

    #[test]
    fn test_requery_after_mutation() {
        let mut tree = parse_tree("(S (NP (DT the) (NN dog)) (VP (VBD ran)))").unwrap();
        let pattern = parse_query("NP < DT").unwrap();
        assert_eq!(nodes(find_all(&tree, 0, &pattern)), [1]);

        // Replace NP with a bare noun
        let noun = tree.add_leaf("NN", "dogs");
        assert!(tree.replace_child(0, 1, noun));

        assert!(find_first(&tree, 0, &pattern).unwrap().is_none());
        let found = nodes(find_all(&tree, 0, &label("NN")));
        assert_eq!(found, [noun]);
    }

    #[test]
    fn test_search_query() {
        let tree = parse_tree("(S (NP (DT the) (NN dog)) (VP (VBD ran)))").unwrap();

        let found: Vec<_> = search_query(&tree, "/^[NV]/ < *")
            .unwrap()
            .map(|m| m.unwrap().node)
            .collect();
        assert_eq!(found, [1, 4]);

        assert!(matches!(
            search_query(&tree, "NP <> DT"),
            Err(SearchError::Query(QueryError::InvalidOperator(_)))
        ));
    }

    #[test]
    fn test_search_query_collects_match_errors() {
        fn count(tree: &Tree, query: &str) -> Result<usize, SearchError> {
            let matches = search_query(tree, query)?.collect::<Result<Vec<_>, _>>()?;
            Ok(matches.len())
        }

        let tree = parse_tree("(A (B b) (C c))").unwrap();
        assert_eq!(count(&tree, "* $ *").unwrap(), 2);
        assert!(matches!(count(&tree, "* $. *"), Err(SearchError::Match(_))));
    }

    #[test]
    fn test_search_empty_tree() {
        let tree = Tree::new();
        assert_eq!(search_query(&tree, "*").unwrap().count(), 0);
    }
}

use proptest::prelude::*;
use proptest::sample::Index;
use tgrep::{
    Context, NodeId, Operator, Pattern, SearchOptions, Tree, find_all, find_first_with,
    parse_query,
};

const MAX_NODES: usize = 24;
const LABELS: &[&str] = &["A", "B", "C"];

/// Build a tree from a parent choice per non-root node.
///
/// Node `i` hangs under one of the nodes `0..i`, so node 0 is the root and
/// every node is reachable. Childless nodes become leaves.
fn build_tree(parents: &[Index], labels: &[usize], heads: &[Index]) -> Tree {
    let n = labels.len();
    let parent_of: Vec<NodeId> = (1..n).map(|i| parents[i - 1].index(i)).collect();

    let mut child_counts = vec![0usize; n];
    for &p in &parent_of {
        child_counts[p] += 1;
    }

    let mut tree = Tree::new();
    for (i, &l) in labels.iter().enumerate() {
        let label = LABELS[l];
        if child_counts[i] == 0 {
            tree.add_leaf(label, &label.to_lowercase());
        } else {
            tree.add_internal(label);
        }
    }
    for (i, &p) in parent_of.iter().enumerate() {
        tree.set_parent(i + 1, p);
    }
    for (i, &count) in child_counts.iter().enumerate() {
        if count > 0 {
            tree.set_head_index(i, Some(heads[i].index(count)));
        }
    }
    tree.set_root(0);
    tree
}

fn tree_strategy() -> impl Strategy<Value = Tree> {
    (1usize..=MAX_NODES)
        .prop_flat_map(|n| {
            (
                prop::collection::vec(any::<Index>(), n - 1),
                prop::collection::vec(0usize..LABELS.len(), n),
                prop::collection::vec(any::<Index>(), n),
            )
        })
        .prop_map(|(parents, labels, heads)| build_tree(&parents, &labels, &heads))
}

/// Relabel `a` as S and `b` as T on a copy of the tree
fn mark(tree: &Tree, a: NodeId, b: NodeId) -> Tree {
    let mut marked = tree.clone();
    marked.set_label(a, "S");
    marked.set_label(b, "T");
    marked
}

fn holds(tree: &Tree, node: NodeId, query: &str) -> bool {
    let pattern = parse_query(query).unwrap();
    pattern.match_node(tree, node).unwrap().is_some()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn wildcard_visits_every_reachable_node_once(tree in tree_strategy()) {
        let mut found: Vec<NodeId> = find_all(&tree, 0, &Pattern::wildcard())
            .map(|m| m.unwrap().node)
            .collect();
        prop_assert_eq!(found.len(), tree.nodes.len());
        found.sort_unstable();
        found.dedup();
        prop_assert_eq!(found.len(), tree.nodes.len());
    }

    #[test]
    fn driver_agrees_with_evaluator(tree in tree_strategy()) {
        let options = SearchOptions { recursive: false };
        for query in ["A < B", "* << C", "B $ *", "A .. B", "* <# B", "* <<# C", "*=X < { * $ =X }", "A !< *"] {
            let pattern = parse_query(query).unwrap();
            for node in tree.preorder(0) {
                let driven = find_first_with(&tree, node, &pattern, &options).unwrap();
                let direct = pattern.match_node(&tree, node).unwrap();
                prop_assert_eq!(driven.map(|m| m.context), direct, "{} at {}", query, node);
            }
        }
    }

    #[test]
    fn dominance_is_asymmetric(tree in tree_strategy()) {
        let n = tree.nodes.len();
        for a in 0..n {
            for b in 0..n {
                if a == b {
                    continue;
                }
                let marked = mark(&tree, a, b);
                let down = holds(&marked, a, "S << T");
                prop_assert!(!(down && holds(&marked, b, "T << S")));
                prop_assert_eq!(down, holds(&marked, b, "T >> S"));
            }
            prop_assert!(!holds(&mark(&tree, a, a), a, "T << T"));
        }
    }

    #[test]
    fn backreference_to_self(tree in tree_strategy()) {
        let same = parse_query("*=X & =X").unwrap();
        let different = parse_query("*=X & ~X").unwrap();
        prop_assert_eq!(find_all(&tree, 0, &same).count(), tree.nodes.len());
        prop_assert_eq!(find_all(&tree, 0, &different).count(), 0);
    }

    #[test]
    fn negation_keeps_captures(tree in tree_strategy()) {
        let pattern = parse_query("*=V").unwrap().negate();
        for node in tree.preorder(0) {
            let mut ctx = Context::new();
            prop_assert!(!pattern.is_satisfied_by(&tree, node, &mut ctx).unwrap());
            prop_assert_eq!(ctx.lookup("V"), Some(node));
        }
    }

    #[test]
    fn head_chain_matches_headed_by(tree in tree_strategy()) {
        let chain: Vec<Vec<NodeId>> = (0..tree.nodes.len())
            .map(|id| tree.head_chain(id).collect())
            .collect();
        for (a, reached) in chain.iter().enumerate() {
            prop_assert!(!reached.contains(&a));
            for b in 0..tree.nodes.len() {
                if a == b {
                    continue;
                }
                let marked = mark(&tree, a, b);
                let headed = Operator::HeadedBy
                    .apply(&parse_query("T").unwrap(), &marked, a, &mut Context::new())
                    .unwrap();
                prop_assert_eq!(headed, reached.contains(&b));
            }
        }
    }
}

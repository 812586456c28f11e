//! Arena-backed syntax trees
//!
//! Every node of a tree lives in one `Vec` owned by the `Tree`. Parent and
//! child links are `NodeId` indices into that arena, so nodes never own each
//! other. Rewrites may detach nodes; detached nodes stay in the arena but are
//! unreachable from the root and are never visited by traversals.

use crate::category::Category;
use std::fmt::Write as _;
use std::ops::Index;

/// Unique identifier for a node (its index in the arena)
pub type NodeId = usize;

/// A node in a constituency tree or CCG derivation
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// Tag or category label as it appeared in the source
    pub label: String,
    /// Lexical item, present on leaves only
    pub lex: Option<String>,
    /// Part-of-speech tag of a CCG leaf
    pub pos: Option<String>,
    /// CCG category, present on derivation nodes
    pub category: Option<Category>,
    /// Position of the head child, when known
    pub head_index: Option<usize>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    /// Create a leaf carrying a lexical item
    pub fn leaf(id: NodeId, label: &str, lex: &str) -> Self {
        Self {
            id,
            label: label.to_string(),
            lex: Some(lex.to_string()),
            pos: None,
            category: None,
            head_index: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Create an internal node with no children yet
    pub fn internal(id: NodeId, label: &str) -> Self {
        Self {
            id,
            label: label.to_string(),
            lex: None,
            pos: None,
            category: None,
            head_index: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Whether two nodes have the same category for backreference purposes.
    ///
    /// Nodes carrying categories compare structurally (features included).
    /// Nodes without categories fall back to comparing labels.
    pub fn same_category(&self, other: &Node) -> bool {
        match (&self.category, &other.category) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.label == other.label,
            _ => false,
        }
    }
}

/// A tree (one sentence or derivation)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree {
    pub nodes: Vec<Node>,
    pub root_id: Option<NodeId>,
}

impl Tree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a leaf to the arena and return its id
    pub fn add_leaf(&mut self, label: &str, lex: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::leaf(id, label, lex));
        id
    }

    /// Add an internal node to the arena and return its id
    pub fn add_internal(&mut self, label: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::internal(id, label));
        id
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Get a mutable reference to a node by ID
    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root_id = Some(id);
    }

    /// Append `child_id` to the children of `parent_id`
    pub fn set_parent(&mut self, child_id: NodeId, parent_id: NodeId) {
        if let Some(child) = self.get_node_mut(child_id) {
            child.parent = Some(parent_id);
        }
        if let Some(parent) = self.get_node_mut(parent_id) {
            parent.children.push(child_id);
        }
    }

    pub fn set_label(&mut self, id: NodeId, label: &str) {
        if let Some(node) = self.get_node_mut(id) {
            node.label = label.to_string();
        }
    }

    pub fn set_category(&mut self, id: NodeId, category: Option<Category>) {
        if let Some(node) = self.get_node_mut(id) {
            node.category = category;
        }
    }

    pub fn set_pos(&mut self, id: NodeId, pos: Option<&str>) {
        if let Some(node) = self.get_node_mut(id) {
            node.pos = pos.map(str::to_string);
        }
    }

    pub fn set_head_index(&mut self, id: NodeId, head_index: Option<usize>) {
        if let Some(node) = self.get_node_mut(id) {
            node.head_index = head_index;
        }
    }

    /// Put `new` in the slot `old` occupies under `parent`.
    ///
    /// `old` is left detached. Returns false if `old` is not a child of
    /// `parent`.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> bool {
        let Some(pos) = self
            .get_node(parent)
            .and_then(|p| p.children.iter().position(|&c| c == old))
        else {
            return false;
        };
        if let Some(prev) = self.parent(new) {
            self.remove_child(prev, new);
        }
        // removing `new` from the same parent may have shifted `old`
        let pos = self.nodes[parent]
            .children
            .iter()
            .position(|&c| c == old)
            .unwrap_or(pos);
        self.nodes[parent].children[pos] = new;
        self.nodes[new].parent = Some(parent);
        self.nodes[old].parent = None;
        true
    }

    /// Unlink a node from its parent. The node and its subtree stay in the
    /// arena.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            self.remove_child(parent, id);
        }
        if self.root_id == Some(id) {
            self.root_id = None;
        }
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent].children.retain(|&c| c != child);
        self.nodes[child].parent = None;
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self[id].is_leaf()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self[id].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id).and_then(|node| node.parent)
    }

    pub fn label(&self, id: NodeId) -> &str {
        &self[id].label
    }

    pub fn lex(&self, id: NodeId) -> Option<&str> {
        self[id].lex.as_deref()
    }

    pub fn pos(&self, id: NodeId) -> Option<&str> {
        self[id].pos.as_deref()
    }

    pub fn category(&self, id: NodeId) -> Option<&Category> {
        self[id].category.as_ref()
    }

    /// The head child, if the node has a head index that points at a child
    pub fn head_child(&self, id: NodeId) -> Option<NodeId> {
        let node = &self[id];
        node.head_index.and_then(|i| node.children.get(i).copied())
    }

    /// Walk parent links up to the topmost ancestor of `id`
    pub fn root_of(&self, mut id: NodeId) -> NodeId {
        while let Some(parent) = self.parent(id) {
            id = parent;
        }
        id
    }

    /// Nodes of the subtree at `start` in pre-order (root first, then
    /// children left to right)
    pub fn preorder(&self, start: NodeId) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![start],
        }
    }

    /// Leaves under `start`, left to right
    pub fn leaves(&self, start: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.preorder(start).filter(|&id| self.is_leaf(id))
    }

    /// Strict ancestors of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            current: self.parent(id),
        }
    }

    /// The head chain below `id`: its head child, that node's head child, and
    /// so on, stopping at a leaf or a node without a head index.
    pub fn head_chain(&self, id: NodeId) -> HeadChain<'_> {
        HeadChain {
            tree: self,
            current: self.head_child(id),
        }
    }

    /// Render the subtree at `id` in bracketed notation
    pub fn bracketed(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_bracketed(id, &mut out);
        out
    }

    fn write_bracketed(&self, id: NodeId, out: &mut String) {
        let node = &self[id];
        let _ = write!(out, "({}", node.label);
        if node.is_leaf()
            && let Some(lex) = &node.lex
        {
            let _ = write!(out, " {lex}");
        }
        for &child in &node.children {
            out.push(' ');
            self.write_bracketed(child, out);
        }
        out.push(')');
    }
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }
}

/// Pre-order iterator over a subtree
pub struct Preorder<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Preorder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

pub struct Ancestors<'a> {
    tree: &'a Tree,
    current: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.current?;
        self.current = self.tree.parent(id);
        Some(id)
    }
}

pub struct HeadChain<'a> {
    tree: &'a Tree,
    current: Option<NodeId>,
}

impl Iterator for HeadChain<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.current?;
        self.current = if self.tree.is_leaf(id) {
            None
        } else {
            self.tree.head_child(id)
        };
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A(B(D,E), C)
    fn sample_tree() -> Tree {
        let mut tree = Tree::new();
        let a = tree.add_internal("A");
        let b = tree.add_internal("B");
        let d = tree.add_leaf("D", "d");
        let e = tree.add_leaf("E", "e");
        let c = tree.add_leaf("C", "c");
        tree.set_parent(b, a);
        tree.set_parent(d, b);
        tree.set_parent(e, b);
        tree.set_parent(c, a);
        tree.set_root(a);
        tree
    }

    #[test]
    fn test_tree_creation() {
        let tree = sample_tree();

        assert_eq!(tree.nodes.len(), 5);
        assert_eq!(tree.parent(1), Some(0));
        assert_eq!(tree.children(0), &[1, 4]);
        assert!(tree.is_leaf(2));
        assert!(!tree.is_leaf(1));
        assert_eq!(tree.lex(2), Some("d"));
        assert_eq!(tree.lex(1), None);
    }

    #[test]
    fn test_preorder_and_leaves() {
        let tree = sample_tree();

        let order: Vec<_> = tree.preorder(0).map(|id| tree.label(id)).collect();
        assert_eq!(order, ["A", "B", "D", "E", "C"]);

        let leaves: Vec<_> = tree.leaves(0).map(|id| tree.label(id)).collect();
        assert_eq!(leaves, ["D", "E", "C"]);

        let sub: Vec<_> = tree.preorder(1).collect();
        assert_eq!(sub, [1, 2, 3]);
    }

    #[test]
    fn test_ancestors_and_root() {
        let tree = sample_tree();

        assert_eq!(tree.ancestors(3).collect::<Vec<_>>(), [1, 0]);
        assert_eq!(tree.ancestors(0).count(), 0);
        assert_eq!(tree.root_of(3), 0);
    }

    #[test]
    fn test_head_chain() {
        let mut tree = sample_tree();
        tree.set_head_index(0, Some(0));
        tree.set_head_index(1, Some(1));

        assert_eq!(tree.head_child(0), Some(1));
        assert_eq!(tree.head_chain(0).collect::<Vec<_>>(), [1, 3]);

        // chain stops at a node without a head index
        tree.set_head_index(1, None);
        assert_eq!(tree.head_chain(0).collect::<Vec<_>>(), [1]);

        // an out-of-range head index points nowhere
        tree.set_head_index(0, Some(7));
        assert_eq!(tree.head_child(0), None);
    }

    #[test]
    fn test_replace_child_and_detach() {
        let mut tree = sample_tree();
        let f = tree.add_leaf("F", "f");

        assert!(tree.replace_child(0, 4, f));
        assert_eq!(tree.children(0), &[1, f]);
        assert_eq!(tree.parent(f), Some(0));
        assert_eq!(tree.parent(4), None);
        assert!(!tree.replace_child(0, 4, f));

        tree.detach(1);
        assert_eq!(tree.children(0), &[f]);
        assert_eq!(tree.preorder(0).count(), 2);
    }

    #[test]
    fn test_bracketed() {
        let tree = sample_tree();
        assert_eq!(tree.bracketed(0), "(A (B (D d) (E e)) (C c))");
    }

    #[test]
    fn test_same_category_falls_back_to_label() {
        let tree = sample_tree();
        let mut other = tree[2].clone();
        assert!(tree[2].same_category(&other));
        other.label = "X".to_string();
        assert!(!tree[2].same_category(&other));
    }
}

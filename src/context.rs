//! Capture contexts
//!
//! A `Context` maps capture-variable names to the nodes they were bound to.
//! The driver creates an empty context for every candidate node; it lives for
//! one match attempt and is handed to the caller only when the attempt
//! succeeds. Binding the same name twice keeps the later node.

use crate::eval::MatchError;
use crate::tree::NodeId;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    bindings: FxHashMap<String, NodeId>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, var: &str, node: NodeId) {
        self.bindings.insert(var.to_string(), node);
    }

    /// The node bound to `var`, or `UnboundVariable`
    pub fn get(&self, var: &str) -> Result<NodeId, MatchError> {
        self.lookup(var)
            .ok_or_else(|| MatchError::UnboundVariable(var.to_string()))
    }

    /// The node bound to `var`, if any
    pub fn lookup(&self, var: &str) -> Option<NodeId> {
        self.bindings.get(var).copied()
    }

    pub fn contains(&self, var: &str) -> bool {
        self.bindings.contains_key(var)
    }

    /// Bound variable names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.bindings.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// (name, node) pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.bindings.iter().map(|(name, &id)| (name.as_str(), id))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_and_lookup() {
        let mut ctx = Context::new();
        assert!(ctx.is_empty());

        ctx.bind("NP", 3);
        ctx.bind("VP", 5);

        assert_eq!(ctx.get("NP").unwrap(), 3);
        assert_eq!(ctx.lookup("VP"), Some(5));
        assert!(ctx.contains("VP"));
        assert_eq!(ctx.names(), ["NP", "VP"]);
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_rebinding_keeps_latest() {
        let mut ctx = Context::new();
        ctx.bind("X", 1);
        ctx.bind("X", 2);
        assert_eq!(ctx.lookup("X"), Some(2));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_unbound_lookup() {
        let ctx = Context::new();
        assert_eq!(ctx.lookup("X"), None);
        assert!(matches!(ctx.get("X"), Err(MatchError::UnboundVariable(v)) if v == "X"));
    }
}

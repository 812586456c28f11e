//! tgrep: tree-pattern queries over Penn Treebank and CCGbank derivations
//!
//! A query names a node by its label, lexical item or CCG category and
//! constrains it through structural relations (dominance, precedence,
//! sisterhood, headedness). Matching nodes are returned together with the
//! nodes captured by named variables along the way.

pub mod category; // CCG categories
pub mod context; // Capture variable bindings
pub mod eval; // Pattern evaluation at a single node
pub mod ops; // Relational operators and the operator table
pub mod parser; // Query language parser
pub mod pattern; // Pattern AST
pub mod reader; // PTB / CCGbank bracketed tree reader
pub mod searcher; // Traversal driver
pub mod tree; // Arena tree
pub mod treebank; // Iteration over files of trees

// Re-exports for convenience
pub use category::{Category, CategoryError, Slash};
pub use context::Context;
pub use eval::MatchError;
pub use ops::{InvalidOperator, Operator};
pub use parser::{QueryError, parse_query};
pub use pattern::{Anchor, Constraint, NodePattern, Pattern, TextRegex};
pub use reader::{ReadError, TreeIterator, parse_tree};
pub use searcher::{
    Match, Matches, SearchError, SearchOptions, find_all, find_all_with, find_first,
    find_first_with, search_query,
};
pub use tree::{Node, NodeId, Tree};
pub use treebank::{MatchSet, Treebank};

//! Treebanks on disk or in memory, and searching across them
//!
//! A `Treebank` is an ordered list of inputs. Each input is either bracketed
//! text held in memory or a path to a `.mrg`/`.auto` file, gzipped or not.
//! Inputs that cannot be opened and trees that fail to parse are logged with
//! `tracing::warn!` and left out, so one bad file never ends a scan.

use crate::pattern::Pattern;
use crate::reader::{ReadError, TreeIterator};
use crate::searcher::{Match, find_all};
use crate::tree::Tree;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type Trees = Box<dyn Iterator<Item = Arc<Tree>>>;

#[derive(Debug, Clone)]
enum Input {
    Text(Arc<str>),
    Path(PathBuf),
}

impl Input {
    /// Every readable tree in this input
    fn trees(self) -> Trees {
        match self {
            Input::Text(text) => Box::new(logged(TreeIterator::from_str(&text), "<string>".into())),
            Input::Path(path) => match TreeIterator::from_file(&path) {
                Ok(reader) => Box::new(logged(reader, path.display().to_string())),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot open treebank file");
                    Box::new(std::iter::empty())
                }
            },
        }
    }
}

/// Drop trees that fail to read, noting where they came from
fn logged<I>(reader: I, origin: String) -> impl Iterator<Item = Arc<Tree>>
where
    I: Iterator<Item = Result<Tree, ReadError>>,
{
    reader.filter_map(move |result| match result {
        Ok(tree) => Some(Arc::new(tree)),
        Err(e) => {
            tracing::warn!(origin = %origin, line = ?e.line(), error = %e, "skipping tree");
            None
        }
    })
}

/// Trees read lazily, input by input, in the order the inputs were given.
///
/// ```no_run
/// use tgrep::Treebank;
///
/// for tree in &Treebank::from_file("wsj_0001.mrg") {
///     println!("{}", tree.bracketed(tree.root_id.unwrap_or_default()));
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Treebank {
    inputs: Vec<Input>,
}

impl Treebank {
    pub fn from_string(text: &str) -> Self {
        Self {
            inputs: vec![Input::Text(text.into())],
        }
    }

    /// A single file; `.gz` files are decompressed while reading
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self::from_paths(vec![path.as_ref().to_path_buf()])
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            inputs: paths.into_iter().map(Input::Path).collect(),
        }
    }

    pub fn iter(&self) -> Trees {
        Box::new(self.inputs.clone().into_iter().flat_map(Input::trees))
    }
}

impl IntoIterator for Treebank {
    type Item = Arc<Tree>;
    type IntoIter = Trees;

    fn into_iter(self) -> Trees {
        Box::new(self.inputs.into_iter().flat_map(Input::trees))
    }
}

impl IntoIterator for &Treebank {
    type Item = Arc<Tree>;
    type IntoIter = Trees;

    fn into_iter(self) -> Trees {
        self.iter()
    }
}

/// A pattern run over every node of every tree in a treebank.
///
/// Each item pairs the tree with one match in it. When evaluation fails on a
/// tree (an unsupported operator, say) the rest of that tree is skipped.
///
/// ```no_run
/// use tgrep::{MatchSet, Treebank, parse_query};
///
/// let pattern = parse_query("/NP/=NP < /PRP/").unwrap();
/// for (tree, m) in MatchSet::new(&Treebank::from_file("wsj_0001.mrg"), &pattern) {
///     println!("{}", tree.bracketed(m.node));
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MatchSet {
    treebank: Treebank,
    pattern: Arc<Pattern>,
}

impl MatchSet {
    pub fn new(treebank: &Treebank, pattern: &Pattern) -> Self {
        Self {
            treebank: treebank.clone(),
            pattern: Arc::new(pattern.clone()),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = (Arc<Tree>, Match)>> {
        self.clone().into_iter()
    }
}

impl IntoIterator for MatchSet {
    type Item = (Arc<Tree>, Match);
    type IntoIter = Box<dyn Iterator<Item = Self::Item>>;

    fn into_iter(self) -> Self::IntoIter {
        let pattern = self.pattern;
        Box::new(self.treebank.into_iter().flat_map(move |tree| {
            let found = matches_in(&tree, &pattern);
            found.into_iter().map(move |m| (Arc::clone(&tree), m))
        }))
    }
}

fn matches_in(tree: &Tree, pattern: &Pattern) -> Vec<Match> {
    let Some(root) = tree.root_id else {
        return Vec::new();
    };
    let mut found = Vec::new();
    for result in find_all(tree, root, pattern) {
        match result {
            Ok(m) => found.push(m),
            Err(e) => {
                tracing::warn!(error = %e, "abandoning tree");
                break;
            }
        }
    }
    found
}

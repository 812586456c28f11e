//! Bracketed tree parsing
//!
//! Reads Penn Treebank and CCGbank bracketed trees into arena `Tree`s.
//! Node ids are assigned in pre-order, so a parent always has a smaller id
//! than its children and the root is node 0.
//!
//! PTB:      `(S (NP (DT the) (NN dog)) (VP (VBD ran)))`
//! CCGbank:  `(<T S[dcl] 1 2> (<L NP NNP NNP John N>) (<L S[dcl]\NP VBD VBD ran S[dcl]\NP>))`

use crate::category::{Category, CategoryError};
use crate::tree::{NodeId, Tree};
use flate2::read::MultiGzDecoder;
use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest_derive::Parser;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "tree.pest"]
struct TreeParser;

/// Error while reading a bracketed tree
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Parse error at line {line}: {error}")]
    Syntax {
        line: usize,
        #[source]
        error: Box<pest::error::Error<Rule>>,
    },

    #[error("Parse error at line {line}: {error}")]
    Category {
        line: usize,
        #[source]
        error: CategoryError,
    },

    #[error("Parse error at line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReadError {
    /// Line where the offending tree began, if known
    pub fn line(&self) -> Option<usize> {
        match self {
            ReadError::Syntax { line, .. }
            | ReadError::Category { line, .. }
            | ReadError::Malformed { line, .. } => Some(*line),
            ReadError::Io(_) => None,
        }
    }
}

/// Parse a single bracketed tree
pub fn parse_tree(input: &str) -> Result<Tree, ReadError> {
    parse_tree_at(input, 1)
}

fn parse_tree_at(input: &str, line: usize) -> Result<Tree, ReadError> {
    let mut pairs = TreeParser::parse(Rule::tree, input).map_err(|error| ReadError::Syntax {
        line,
        error: Box::new(error),
    })?;

    let Some(root) = pairs.next().and_then(|tree| tree.into_inner().next()) else {
        return Err(ReadError::Malformed {
            line,
            message: "Empty tree".to_string(),
        });
    };

    let mut tree = Tree::new();
    let root_id = build_node(&mut tree, root, line)?;
    tree.set_root(root_id);
    Ok(tree)
}

/// Add `pair` and its subtree to the arena, parent before children
fn build_node(tree: &mut Tree, pair: Pair<Rule>, line: usize) -> Result<NodeId, ReadError> {
    let rule = pair.as_rule();
    let mut inner = pair.into_inner();

    match rule {
        Rule::ptb_leaf => {
            let label = next_str(&mut inner);
            let word = next_str(&mut inner);
            Ok(tree.add_leaf(label, word))
        }
        Rule::ccg_leaf => {
            let category = next_str(&mut inner);
            let pos = next_str(&mut inner);
            let _orig_pos = next_str(&mut inner);
            let word = next_str(&mut inner);

            let id = tree.add_leaf(category, word);
            tree.set_category(id, Some(parse_category(category, line)?));
            tree.set_pos(id, Some(pos));
            Ok(id)
        }
        Rule::ptb_node => {
            let mut children = inner.peekable();
            let label = match children.peek() {
                Some(first) if first.as_rule() == Rule::label => {
                    children.next().map(|p| p.as_str()).unwrap_or_default()
                }
                _ => "",
            };

            let id = tree.add_internal(label);
            for child in children {
                let child_id = build_node(tree, child, line)?;
                tree.set_parent(child_id, id);
            }
            Ok(id)
        }
        Rule::ccg_node => {
            let (Some(category), Some(head), Some(_arity)) = (inner.next(), inner.next(), inner.next())
            else {
                return Err(ReadError::Malformed {
                    line,
                    message: "Incomplete <T> header".to_string(),
                });
            };
            let head = atoi::atoi::<usize>(head.as_str().as_bytes()).ok_or_else(|| {
                ReadError::Malformed {
                    line,
                    message: format!("Invalid head index {:?}", head.as_str()),
                }
            })?;

            let id = tree.add_internal(category.as_str());
            tree.set_category(id, Some(parse_category(category.as_str(), line)?));
            tree.set_head_index(id, Some(head));
            for child in inner {
                let child_id = build_node(tree, child, line)?;
                tree.set_parent(child_id, id);
            }
            Ok(id)
        }
        other => Err(ReadError::Malformed {
            line,
            message: format!("Unexpected {other:?}"),
        }),
    }
}

fn next_str<'i>(pairs: &mut Pairs<'i, Rule>) -> &'i str {
    pairs.next().map(|p| p.as_str()).unwrap_or_default()
}

fn parse_category(text: &str, line: usize) -> Result<Category, ReadError> {
    text.parse()
        .map_err(|error| ReadError::Category { line, error })
}

/// Reader that splits a stream into top-level bracketed trees.
///
/// Blank lines and `ID=` header lines between trees are skipped. A tree may
/// span several lines and several trees may share a line. Stray text between
/// trees is reported once and reading resumes at the next `(`, even on the
/// same line.
pub struct TreeIterator<R: BufRead> {
    lines: Lines<R>,
    line_num: usize,
    scanner: Scanner,
    ready: VecDeque<Result<(usize, String), ReadError>>,
    done: bool,
}

impl TreeIterator<Box<dyn BufRead>> {
    /// Create a reader from a file path, decompressing `.gz` files
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let reader: Box<dyn BufRead> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(Self::new(reader))
    }
}

impl TreeIterator<BufReader<std::io::Cursor<String>>> {
    /// Create a reader from a string
    pub fn from_str(text: &str) -> Self {
        let cursor = std::io::Cursor::new(text.to_string());
        Self::new(BufReader::new(cursor))
    }
}

impl<R: BufRead> TreeIterator<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_num: 0,
            scanner: Scanner::default(),
            ready: VecDeque::new(),
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for TreeIterator<R> {
    type Item = Result<Tree, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(pending) = self.ready.pop_front() {
                return Some(pending.and_then(|(line, text)| parse_tree_at(&text, line)));
            }
            if self.done {
                return None;
            }

            self.line_num += 1;
            match self.lines.next() {
                None => {
                    self.done = true;
                    if let Some(start) = self.scanner.start {
                        return Some(Err(ReadError::Malformed {
                            line: start,
                            message: "Unbalanced brackets at end of input".to_string(),
                        }));
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(ReadError::Io(e)));
                }
                Some(Ok(line)) => {
                    if self.scanner.start.is_none() {
                        let trimmed = line.trim();
                        if trimmed.is_empty() || trimmed.starts_with("ID=") {
                            continue;
                        }
                    }
                    self.scanner.feed(&line, self.line_num, &mut self.ready);
                }
            }
        }
    }
}

/// Bracket depth tracking across lines.
///
/// Parentheses inside a CCGbank `<...>` header belong to categories and are
/// not counted.
#[derive(Debug, Default)]
struct Scanner {
    buffer: String,
    depth: usize,
    in_header: bool,
    /// Line where the current tree began
    start: Option<usize>,
}

impl Scanner {
    fn feed(
        &mut self,
        line: &str,
        line_num: usize,
        ready: &mut VecDeque<Result<(usize, String), ReadError>>,
    ) {
        let mut chars = line.chars().peekable();
        let mut in_junk = false;
        while let Some(c) = chars.next() {
            if self.start.is_none() {
                match c {
                    '(' => {
                        self.start = Some(line_num);
                        in_junk = false;
                    }
                    c if c.is_whitespace() => continue,
                    _ if in_junk => continue,
                    c => {
                        in_junk = true;
                        ready.push_back(Err(ReadError::Malformed {
                            line: line_num,
                            message: format!("Unexpected {c:?} between trees"),
                        }));
                        continue;
                    }
                }
            }

            self.buffer.push(c);
            if self.in_header {
                if c == '>' {
                    self.in_header = false;
                }
                continue;
            }

            match c {
                '(' => {
                    self.depth += 1;
                    if chars.peek() == Some(&'<') {
                        self.in_header = true;
                    }
                }
                ')' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        let start = self.start.take().unwrap_or(line_num);
                        ready.push_back(Ok((start, std::mem::take(&mut self.buffer))));
                    }
                }
                _ => {}
            }
        }
        if self.start.is_some() {
            self.buffer.push('\n');
        }
    }
}

//! CCG categories
//!
//! A category is either an atom (`NP`, `S[dcl]`) or a functor built from a
//! result, a slash and an argument (`(S[dcl]\NP)/NP`). Equality is
//! structural and includes features, so `S[dcl]` and `S[b]` differ.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "category.pest"]
struct CategoryParser;

/// Error for strings that are not well-formed categories
#[derive(Debug, Error)]
#[error("invalid category {input:?}: {message}")]
pub struct CategoryError {
    pub input: String,
    pub message: String,
}

/// Direction of a functor's argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slash {
    /// `/`: argument to the right
    Forward,
    /// `\`: argument to the left
    Backward,
    /// `|`: either direction
    Either,
}

impl Slash {
    pub fn symbol(self) -> char {
        match self {
            Slash::Forward => '/',
            Slash::Backward => '\\',
            Slash::Either => '|',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Atom {
        name: String,
        features: Vec<String>,
    },
    Complex {
        result: Box<Category>,
        slash: Slash,
        argument: Box<Category>,
    },
}

impl Category {
    pub fn atom(name: &str) -> Self {
        Category::Atom {
            name: name.to_string(),
            features: Vec::new(),
        }
    }

    /// An atom carrying one feature, e.g. `S[dcl]`
    pub fn atom_with_feature(name: &str, feature: &str) -> Self {
        Category::Atom {
            name: name.to_string(),
            features: vec![feature.to_string()],
        }
    }

    pub fn functor(result: Category, slash: Slash, argument: Category) -> Self {
        Category::Complex {
            result: Box::new(result),
            slash,
            argument: Box::new(argument),
        }
    }

    /// `result/argument`
    pub fn forward(result: Category, argument: Category) -> Self {
        Self::functor(result, Slash::Forward, argument)
    }

    /// `result\argument`
    pub fn backward(result: Category, argument: Category) -> Self {
        Self::functor(result, Slash::Backward, argument)
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Category::Complex { .. })
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_complex() {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Atom { name, features } => {
                f.write_str(name)?;
                for feature in features {
                    write!(f, "[{feature}]")?;
                }
                Ok(())
            }
            Category::Complex {
                result,
                slash,
                argument,
            } => {
                result.fmt_operand(f)?;
                write!(f, "{}", slash.symbol())?;
                argument.fmt_operand(f)
            }
        }
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let error = |message: String| CategoryError {
            input: input.to_string(),
            message,
        };

        let mut pairs =
            CategoryParser::parse(Rule::category, input).map_err(|e| error(e.to_string()))?;
        let cat = pairs
            .next()
            .and_then(|category| category.into_inner().next())
            .ok_or_else(|| error("empty category".to_string()))?;

        build_cat(cat).ok_or_else(|| error("malformed category".to_string()))
    }
}

/// Fold `operand (slash operand)*` to the left
fn build_cat(pair: Pair<Rule>) -> Option<Category> {
    let mut inner = pair.into_inner();
    let mut cat = build_operand(inner.next()?)?;

    while let Some(slash_pair) = inner.next() {
        let slash = match slash_pair.as_str() {
            "/" => Slash::Forward,
            "\\" => Slash::Backward,
            _ => Slash::Either,
        };
        let argument = build_operand(inner.next()?)?;
        cat = Category::functor(cat, slash, argument);
    }

    Some(cat)
}

fn build_operand(pair: Pair<Rule>) -> Option<Category> {
    match pair.as_rule() {
        Rule::cat => build_cat(pair),
        Rule::atom => {
            let mut inner = pair.into_inner();
            let name = inner.next()?.as_str().to_string();
            let features = inner
                .filter_map(|feature| feature.into_inner().next())
                .map(|name| name.as_str().to_string())
                .collect();
            Some(Category::Atom { name, features })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(s: &str) -> Category {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_atoms() {
        assert_eq!(cat("NP"), Category::atom("NP"));
        assert_eq!(cat("S[dcl]"), Category::atom_with_feature("S", "dcl"));
        assert_eq!(cat(","), Category::atom(","));
    }

    #[test]
    fn test_parse_functors() {
        let np = Category::atom("NP");
        let sdcl = Category::atom_with_feature("S", "dcl");

        assert_eq!(
            cat("(S[dcl]\\NP)/NP"),
            Category::forward(Category::backward(sdcl.clone(), np.clone()), np.clone())
        );
        // slashes associate to the left
        assert_eq!(cat("S[dcl]\\NP/NP"), cat("(S[dcl]\\NP)/NP"));
        assert_eq!(
            cat("S/(S\\NP)"),
            Category::forward(
                Category::atom("S"),
                Category::backward(Category::atom("S"), np)
            )
        );
    }

    #[test]
    fn test_display_is_canonical() {
        for s in ["NP", "S[dcl]", "(S[dcl]\\NP)/NP", "S/(S\\NP)", "(N/N)|(N/N)", "NP[nb]/N"] {
            assert_eq!(cat(s).to_string(), s);
        }
        assert_eq!(cat("S\\NP/NP").to_string(), "(S\\NP)/NP");
        assert_eq!(cat("((NP))").to_string(), "NP");
    }

    #[test]
    fn test_equality_includes_features() {
        assert_ne!(cat("S[dcl]"), cat("S[b]"));
        assert_ne!(cat("S[dcl]\\NP"), cat("S\\NP"));
        assert_eq!(cat("S[dcl]\\NP"), cat("(S[dcl])\\NP"));
    }

    #[test]
    fn test_invalid_categories() {
        for s in ["", "S/", "(NP", "NP)", "S[dcl", "/NP"] {
            assert!(s.parse::<Category>().is_err(), "{s:?} should not parse");
        }
    }
}

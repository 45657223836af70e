//! Term vocabulary and ID resolution
//!
//! The vocabulary is an FST mapping canonical terms to dense IDs. It is loaded
//! once at startup from a file with one term per line (line index = ID) and is
//! immutable afterwards.

mod resolved;

pub use resolved::{ResolvedExpr, ResolvedToken};

use std::io;
use std::path::Path;

use fst::Map;
use tracing::{debug, info, warn};

use crate::error::QuarryError;
use crate::query::{PostfixExpr, Token};
use crate::tokenizer::Normalize;
use crate::Result;

/// Immutable term → ID mapping
pub struct Vocabulary {
    fst: Map<Vec<u8>>,
}

impl Vocabulary {
    /// Build a vocabulary from terms in ID order.
    ///
    /// A term listed more than once keeps its first ID.
    pub fn from_terms<I, S>(terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries: Vec<(String, u64)> = terms
            .into_iter()
            .enumerate()
            .map(|(id, term)| (term.as_ref().to_string(), id as u64))
            .collect();

        // Stable sort keeps the lowest ID first among duplicates
        entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
        let before = entries.len();
        entries.dedup_by(|later, earlier| later.0 == earlier.0);
        if entries.len() != before {
            warn!(
                duplicates = before - entries.len(),
                "vocabulary contains duplicate terms, keeping first IDs"
            );
        }

        let fst = Map::from_iter(entries.iter().map(|(term, id)| (term.as_bytes(), *id)))
            .map_err(|e| {
                QuarryError::Io(io::Error::new(io::ErrorKind::InvalidData, e))
            })?;

        Ok(Self { fst })
    }

    /// Load a vocabulary file: UTF-8, one term per line, line index = ID
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let vocabulary = Self::from_terms(content.lines().map(|line| line.trim_end_matches('\r')))?;
        info!(path = %path.display(), terms = vocabulary.len(), "loaded vocabulary");
        Ok(vocabulary)
    }

    /// Look up a canonical term
    pub fn id(&self, term: &str) -> Option<u32> {
        self.fst.get(term.as_bytes()).map(|id| id as u32)
    }

    /// Check if a term exists
    pub fn contains(&self, term: &str) -> bool {
        self.fst.contains_key(term.as_bytes())
    }

    /// Get the number of distinct terms
    pub fn len(&self) -> usize {
        self.fst.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.fst.is_empty()
    }

    /// Resolve every leaf of a validated expression to vocabulary IDs.
    ///
    /// Resolution is all-or-nothing: a single unknown term (or phrase word)
    /// fails the whole expression with [`QuarryError::UnknownTerm`], since no
    /// document can match it.
    pub fn resolve(&self, expr: &PostfixExpr, normalizer: &dyn Normalize) -> Result<ResolvedExpr> {
        let mut tokens = Vec::with_capacity(expr.tokens().len());

        for token in expr.tokens() {
            let resolved = match token {
                Token::Term(term) => ResolvedToken::Id(self.lookup(term, normalizer)?),
                Token::Phrase { terms, distance } => ResolvedToken::Phrase {
                    ids: terms
                        .iter()
                        .map(|term| self.lookup(term, normalizer))
                        .collect::<Result<Vec<_>>>()?,
                    distance: *distance,
                },
                Token::And => ResolvedToken::And,
                Token::Or => ResolvedToken::Or,
                Token::Not => ResolvedToken::Not,
                Token::LeftParen | Token::RightParen => {
                    return Err(QuarryError::MalformedExpression(
                        "parenthesis in postfix expression".to_string(),
                    ))
                }
            };
            tokens.push(resolved);
        }

        let resolved = ResolvedExpr::new(tokens);
        debug!(wire = resolved.wire(), "resolved expression");
        Ok(resolved)
    }

    fn lookup(&self, term: &str, normalizer: &dyn Normalize) -> Result<u32> {
        let canonical = normalizer.normalize(term);
        self.id(&canonical)
            .ok_or(QuarryError::UnknownTerm(canonical))
    }
}

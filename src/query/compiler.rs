use tracing::debug;

use super::lexer::{Lexer, Token};
use super::postfix::PostfixExpr;
use crate::config::QueryConfig;
use crate::error::QuarryError;
use crate::Result;

/// A query that passed every local check and is ready for vocabulary resolution
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    source: String,
    expr: PostfixExpr,
}

impl CompiledQuery {
    /// The query text as typed
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &PostfixExpr {
        &self.expr
    }

    pub fn term_count(&self) -> usize {
        self.expr.term_count()
    }

    pub fn to_infix(&self) -> String {
        self.expr.to_infix()
    }

    /// Distinct leaf words in order of appearance, phrase words included.
    ///
    /// These are the words a snippet should cover; operators and phrase
    /// distances are not part of the list.
    pub fn plain_terms(&self) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        for leaf in self.expr.leaves() {
            let words: Vec<&String> = match leaf {
                Token::Term(term) => vec![term],
                Token::Phrase { terms, .. } => terms.iter().collect(),
                _ => Vec::new(),
            };
            for word in words {
                if !terms.contains(word) {
                    terms.push(word.clone());
                }
            }
        }
        terms
    }
}

/// Compiles raw query text into a validated postfix expression
#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    config: QueryConfig,
}

impl QueryCompiler {
    pub fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Compile a query string.
    ///
    /// Every failure here is detected before any backend exchange.
    pub fn compile(&self, input: &str) -> Result<CompiledQuery> {
        if input.trim().is_empty() {
            return Err(QuarryError::EmptyQuery);
        }

        let length = input.chars().count();
        if length > self.config.max_query_length {
            return Err(QuarryError::QueryTooLong {
                length,
                max: self.config.max_query_length,
            });
        }

        let tokens = Lexer::tokenize(input)?;
        let expr = PostfixExpr::from_tokens(tokens)?;

        if expr.term_count() > self.config.max_terms {
            return Err(QuarryError::TooManyTerms {
                count: expr.term_count(),
                max: self.config.max_terms,
            });
        }

        debug!(query = input, postfix = %expr, terms = expr.term_count(), "compiled query");

        Ok(CompiledQuery {
            source: input.to_string(),
            expr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(input: &str) -> Result<CompiledQuery> {
        QueryCompiler::default().compile(input)
    }

    #[test]
    fn test_empty_query() {
        assert!(matches!(compile(""), Err(QuarryError::EmptyQuery)));
        assert!(matches!(compile("   \t"), Err(QuarryError::EmptyQuery)));
    }

    #[test]
    fn test_query_too_long() {
        let input = "a ".repeat(600);
        assert!(matches!(
            compile(&input),
            Err(QuarryError::QueryTooLong { length: 1200, max: 1000 })
        ));
    }

    #[test]
    fn test_length_counts_characters() {
        let compiler = QueryCompiler::new(QueryConfig {
            max_query_length: 5,
            max_terms: 20,
        });
        assert!(compiler.compile("ёжик").is_ok());
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            compile("(a & b"),
            Err(QuarryError::MalformedExpression(_))
        ));
        assert!(matches!(
            compile("a & b)"),
            Err(QuarryError::MalformedExpression(_))
        ));
        assert!(matches!(
            compile("a &"),
            Err(QuarryError::MalformedExpression(_))
        ));
    }

    #[test]
    fn test_term_cap() {
        let twenty: Vec<String> = (0..20).map(|i| format!("t{}", i)).collect();
        assert_eq!(compile(&twenty.join(" ")).unwrap().term_count(), 20);

        let twenty_one: Vec<String> = (0..21).map(|i| format!("t{}", i)).collect();
        assert!(matches!(
            compile(&twenty_one.join(" | ")),
            Err(QuarryError::TooManyTerms { count: 21, max: 20 })
        ));
    }

    #[test]
    fn test_phrase_words_count_toward_cap() {
        let words: Vec<String> = (0..19).map(|i| format!("w{}", i)).collect();
        let input = format!("\"{}\" x y", words.join(" "));
        assert!(matches!(
            compile(&input),
            Err(QuarryError::TooManyTerms { count: 21, .. })
        ));
    }

    #[test]
    fn test_plain_terms() {
        let compiled = compile("Cat | (\"big dog\"/2 & !cat) bird").unwrap();
        assert_eq!(
            compiled.plain_terms(),
            vec!["Cat", "big", "dog", "cat", "bird"]
        );
    }

    #[test]
    fn test_recompile_is_stable() {
        let compiled = compile("a | b & !c \"d e\"").unwrap();
        let again = compile(&compiled.to_infix()).unwrap();
        assert_eq!(compiled.expr(), again.expr());
        assert_eq!(compiled.term_count(), again.term_count());
    }
}

//! Relevance snippets
//!
//! A snippet is built around the shortest stretch of the document that
//! contains every distinct query term. The context radius around that window
//! grows step by step; each round renders a plain excerpt and a trimmed one
//! that only keeps `radius` tokens after each hit, and the last candidate that
//! fits the length budget wins.

mod window;

pub use window::{min_covering_window, Occurrence, ScannedText, Window};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::config::SnippetConfig;
use crate::metrics::SearchMetrics;
use crate::persistence::DocumentStore;
use crate::tokenizer::Normalize;
use crate::Result;

const ELLIPSIS: &str = "...";

/// A rendered excerpt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub text: String,
    /// True when no query term was found and the document head was used
    pub fallback: bool,
}

pub struct SnippetEngine {
    config: SnippetConfig,
    normalizer: Arc<dyn Normalize>,
    metrics: Option<Arc<SearchMetrics>>,
}

impl SnippetEngine {
    pub fn new(config: SnippetConfig, normalizer: Arc<dyn Normalize>) -> Self {
        Self {
            config,
            normalizer,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<SearchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &SnippetConfig {
        &self.config
    }

    /// Snippet for a stored document. `terms` must already be normalized.
    pub fn snippet(&self, terms: &[String], doc_id: u32, store: &DocumentStore) -> Result<Snippet> {
        let started = Instant::now();
        let text = store.text(doc_id)?;
        let snippet = self.snippet_for_text(terms, &text);

        if snippet.fallback {
            debug!(doc_id, "no query term in document, using its head");
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_snippet(started.elapsed().as_secs_f64(), snippet.fallback);
        }
        Ok(snippet)
    }

    pub fn snippet_for_text(&self, terms: &[String], text: &str) -> Snippet {
        let scanned = ScannedText::scan(text, terms, self.normalizer.as_ref());

        let rendered = min_covering_window(&scanned.occurrences, scanned.distinct)
            .and_then(|window| self.render(&scanned, window, terms));

        match rendered {
            Some(text) => Snippet {
                text,
                fallback: false,
            },
            None => Snippet {
                text: self.fallback(&scanned.tokens),
                fallback: true,
            },
        }
    }

    fn render(&self, scanned: &ScannedText, window: Window, terms: &[String]) -> Option<String> {
        let query: HashSet<&str> = terms.iter().map(String::as_str).collect();
        let tokens = &scanned.tokens;
        let hits: Vec<bool> = tokens
            .iter()
            .map(|t| query.contains(self.normalizer.normalize(t).as_str()))
            .collect();

        let max_length = self.config.max_length;
        let stop_length = max_length.min(scanned.char_len());
        let mut radius = self.config.radius_init;
        let mut best: Option<Vec<&str>> = None;

        loop {
            let from = window.start.saturating_sub(radius);
            let to = (window.end + radius + 1).min(tokens.len());
            let leading = window.start > radius;
            let trailing = window.end + radius + 1 < tokens.len();

            let mut plain = Vec::with_capacity(to - from + 2);
            if leading {
                plain.push(ELLIPSIS);
            }
            plain.extend(tokens[from..to].iter().map(String::as_str));
            if trailing {
                plain.push(ELLIPSIS);
            }

            let mut trimmed = Vec::new();
            if leading {
                trimmed.push(ELLIPSIS);
            }
            let mut budget = radius;
            for i in from..to {
                if hits[i] {
                    budget = radius;
                    trimmed.push(tokens[i].as_str());
                } else if budget > 0 {
                    trimmed.push(tokens[i].as_str());
                    budget -= 1;
                    if budget == 0 {
                        trimmed.push(ELLIPSIS);
                    }
                }
            }

            let plain_len = char_len(&plain);
            let trimmed_len = char_len(&trimmed);
            if trimmed_len <= max_length {
                best = Some(trimmed);
            }
            if plain_len <= max_length {
                best = Some(plain);
            }

            // a radius wider than the whole text keeps every token
            if trimmed_len >= stop_length || radius > tokens.len() {
                break;
            }
            radius += self.config.radius_step.max(1);
        }

        best.map(|parts| parts.concat())
    }

    fn fallback(&self, tokens: &[String]) -> String {
        let mut parts: Vec<&str> = tokens
            .iter()
            .take(self.config.fallback_tokens)
            .map(String::as_str)
            .collect();
        parts.push(ELLIPSIS);
        parts.join(" ")
    }
}

fn char_len(parts: &[&str]) -> usize {
    parts.iter().map(|p| p.chars().count()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::TermNormalizer;

    fn engine(max_length: usize) -> SnippetEngine {
        let config = SnippetConfig {
            max_length,
            ..SnippetConfig::default()
        };
        SnippetEngine::new(config, Arc::new(TermNormalizer::default()))
    }

    fn terms(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_short_document_is_returned_whole() {
        let snippet = engine(300).snippet_for_text(&terms(&["fox"]), "The quick brown fox.");
        assert!(!snippet.fallback);
        assert_eq!(snippet.text, "The quick brown fox.");
    }

    #[test]
    fn test_snippet_respects_budget() {
        let filler = "lorem ipsum dolor sit amet ".repeat(40);
        let text = format!("{}needle in the haystack {}", filler, filler);
        let snippet = engine(80).snippet_for_text(&terms(&["needle", "haystack"]), &text);

        assert!(!snippet.fallback);
        assert!(snippet.text.chars().count() <= 80);
        assert!(snippet.text.contains("needle in the haystack"));
        assert!(snippet.text.starts_with("..."));
        assert!(snippet.text.ends_with("..."));
    }

    #[test]
    fn test_matching_is_normalized() {
        let snippet = engine(300).snippet_for_text(&terms(&["cafe"]), "Un Café noir");
        assert!(!snippet.fallback);
        assert!(snippet.text.contains("Café"));
    }

    #[test]
    fn test_fallback_without_matches() {
        let snippet = engine(300).snippet_for_text(&terms(&["absent"]), "Hello, world");
        assert!(snippet.fallback);
        assert_eq!(snippet.text, "Hello ,   world ...");
    }

    #[test]
    fn test_fallback_keeps_first_tokens() {
        let text = "w ".repeat(100);
        let snippet = engine(300).snippet_for_text(&terms(&["absent"]), &text);
        // 50 tokens: 25 words and 25 separators
        assert_eq!(snippet.text.matches('w').count(), 25);
        assert!(snippet.text.ends_with(" ..."));
    }

    #[test]
    fn test_trimmed_candidate_when_plain_is_too_long() {
        let text = "alpha one two three four five six seven eight nine ten beta";
        let snippet = engine(40).snippet_for_text(&terms(&["alpha", "beta"]), text);

        assert!(!snippet.fallback);
        assert!(snippet.text.chars().count() <= 40);
        assert!(snippet.text.starts_with("alpha"));
        assert!(snippet.text.ends_with("beta"));
    }

    #[test]
    fn test_budget_smaller_than_any_candidate_falls_back() {
        let text = "alpha one two three four five six seven eight nine ten beta";
        let snippet = engine(5).snippet_for_text(&terms(&["alpha", "beta"]), text);
        assert!(snippet.fallback);
    }
}

//! Search service
//!
//! Request-scoped pipeline behind the front end: compile the query, resolve
//! it against the vocabulary, fetch one page of document IDs through the
//! retrieval client and render a title, link and snippet per hit.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::client::RetrievalClient;
use crate::config::EngineConfig;
use crate::metrics::SearchMetrics;
use crate::persistence::DocumentStore;
use crate::query::{CompiledQuery, Lexer, QueryCompiler, Token};
use crate::snippet::SnippetEngine;
use crate::tokenizer::{Normalize, TermNormalizer};
use crate::vocabulary::Vocabulary;
use crate::Result;

/// Page numbers offered for navigation around the current page
pub const NAVIGATION_PAGES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: u32,
    pub title: String,
    pub link: Option<String>,
    pub snippet: String,
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage {
    /// The query as understood: normalized words and operators
    pub query: String,
    /// Zero-based page number
    pub page: usize,
    pub hits: Vec<SearchHit>,
    /// Zero-based page numbers for navigation
    pub pages: Vec<usize>,
}

pub struct SearchService {
    compiler: QueryCompiler,
    normalizer: Arc<dyn Normalize>,
    vocabulary: Arc<Vocabulary>,
    store: Arc<DocumentStore>,
    client: RetrievalClient,
    snippets: SnippetEngine,
    metrics: Option<Arc<SearchMetrics>>,
}

impl SearchService {
    pub fn new(
        config: &EngineConfig,
        vocabulary: Vocabulary,
        store: DocumentStore,
        client: RetrievalClient,
    ) -> Result<Self> {
        let normalizer: Arc<dyn Normalize> = Arc::new(TermNormalizer::new(&config.normalizer)?);
        Ok(Self {
            compiler: QueryCompiler::new(config.query.clone()),
            snippets: SnippetEngine::new(config.snippet.clone(), normalizer.clone()),
            normalizer,
            vocabulary: Arc::new(vocabulary),
            store: Arc::new(store),
            client,
            metrics: None,
        })
    }

    /// Load the vocabulary and document metadata and connect to the backend pipes
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let vocabulary = Vocabulary::load(&config.terms_path)?;
        let store = DocumentStore::load(&config.meta_path)?;
        let client = RetrievalClient::from_config(&config.client);
        info!(
            terms = vocabulary.len(),
            documents = store.len(),
            request_pipe = %config.client.request_pipe.display(),
            response_pipe = %config.client.response_pipe.display(),
            "search service ready"
        );
        Self::new(config, vocabulary, store, client)
    }

    pub fn with_metrics(mut self, metrics: Arc<SearchMetrics>) -> Self {
        self.client = self.client.with_metrics(metrics.clone());
        self.snippets = self.snippets.with_metrics(metrics.clone());
        self.metrics = Some(metrics);
        self
    }

    pub fn client(&self) -> &RetrievalClient {
        &self.client
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Run a query and render one zero-based page of hits
    pub fn search(&self, text: &str, page: usize) -> Result<SearchPage> {
        let started = Instant::now();
        let result = self.run(text, page);

        if let Some(metrics) = &self.metrics {
            match &result {
                Ok(_) => metrics.record_search(started.elapsed().as_secs_f64()),
                Err(e) => metrics.record_error(e.kind()),
            }
            metrics.set_registered_queries(self.client.query_count());
        }

        match &result {
            Ok(found) => debug!(page, hits = found.hits.len(), "search finished"),
            Err(e) => debug!(page, error = %e, "search failed"),
        }
        result
    }

    fn run(&self, text: &str, page: usize) -> Result<SearchPage> {
        let compiled = self.compiler.compile(text)?;
        let query = self.clear_text(&compiled)?;
        let resolved = self
            .vocabulary
            .resolve(compiled.expr(), self.normalizer.as_ref())?;

        let ids = self.client.fetch_page(&resolved, page)?;
        let terms = self.query_terms(&compiled);
        let hits = ids.into_iter().map(|id| self.hit(id, &terms)).collect();

        Ok(SearchPage {
            query,
            page,
            hits,
            pages: page_window(page, NAVIGATION_PAGES),
        })
    }

    fn hit(&self, doc_id: u32, terms: &[String]) -> SearchHit {
        let Some(record) = self.store.get(doc_id) else {
            warn!(doc_id, "backend returned a document without metadata");
            return SearchHit {
                doc_id,
                title: format!("#{}", doc_id),
                link: None,
                snippet: String::new(),
            };
        };

        let snippet = match self.snippets.snippet(terms, doc_id, &self.store) {
            Ok(snippet) => snippet.text,
            Err(e) => {
                warn!(doc_id, error = %e, "could not build snippet");
                String::new()
            }
        };

        SearchHit {
            doc_id,
            title: record.title.clone(),
            link: record.link.clone(),
            snippet,
        }
    }

    /// Distinct normalized words the snippets should cover
    fn query_terms(&self, compiled: &CompiledQuery) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        for word in compiled.plain_terms() {
            let canonical = self.normalizer.normalize(&word);
            if !terms.contains(&canonical) {
                terms.push(canonical);
            }
        }
        terms
    }

    fn clear_text(&self, compiled: &CompiledQuery) -> Result<String> {
        let tokens = Lexer::tokenize(compiled.source())?;
        let parts: Vec<String> = tokens
            .into_iter()
            .map(|token| match token {
                Token::Term(term) => self.normalizer.normalize(&term),
                Token::Phrase { terms, distance } => Token::Phrase {
                    terms: terms.iter().map(|t| self.normalizer.normalize(t)).collect(),
                    distance,
                }
                .to_string(),
                other => other.to_string(),
            })
            .collect();
        Ok(parts.join(" "))
    }
}

/// `count` consecutive zero-based page numbers, centered on `page` where possible
pub fn page_window(page: usize, count: usize) -> Vec<usize> {
    let start = page.saturating_sub(count / 2);
    (start..start + count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::error::QuarryError;
    use crate::persistence::DocumentRecord;
    use crate::testing::ScriptedBackend;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        service: SearchService,
        backend: ScriptedBackend,
    }

    fn fixture(results: Vec<(&str, Vec<u32>)>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let corpus = dir.path().join("wiki_00");
        std::fs::write(
            &corpus,
            "<doc id=\"a\" url=\"u\" title=\"Rust\">Rust is a systems programming language.</doc>\n\
             <doc id=\"b\" url=\"u\" title=\"Cargo\">Cargo is the Rust package manager.</doc>\n",
        )
        .unwrap();

        let store = DocumentStore::new(vec![
            record("a", "Rust", &corpus),
            record("b", "Cargo", &corpus),
        ]);
        let vocabulary =
            Vocabulary::from_terms(["rust", "cargo", "language", "package"]).unwrap();

        let mut backend = ScriptedBackend::new();
        for (wire, ids) in results {
            backend = backend.with_results(wire, ids);
        }
        let config = EngineConfig::default();
        let client_config = ClientConfig {
            retry_backoff_ms: 0,
            ..ClientConfig::default()
        };
        let client = RetrievalClient::new(backend.clone(), &client_config);
        let service = SearchService::new(&config, vocabulary, store, client).unwrap();

        Fixture {
            _dir: dir,
            service,
            backend,
        }
    }

    fn record(key: &str, title: &str, path: &PathBuf) -> DocumentRecord {
        DocumentRecord {
            key: key.to_string(),
            title: title.to_string(),
            link: Some(format!("https://example.org/{}", key)),
            path: path.clone(),
        }
    }

    #[test]
    fn test_search_renders_hits() {
        let f = fixture(vec![("0", vec![0, 1])]);
        let found = f.service.search("RUST", 0).unwrap();

        assert_eq!(found.query, "rust");
        assert_eq!(found.hits.len(), 2);
        assert_eq!(found.hits[0].title, "Rust");
        assert!(found.hits[0].snippet.contains("Rust"));
        assert_eq!(found.hits[1].link.as_deref(), Some("https://example.org/b"));
        assert_eq!(found.pages, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_clear_text_keeps_operators() {
        let f = fixture(vec![("0 1 & 3 |", vec![1])]);
        let found = f.service.search("Rust cargo || package", 0).unwrap();
        assert_eq!(found.query, "rust & cargo | package");
    }

    #[test]
    fn test_unknown_term_never_reaches_backend() {
        let f = fixture(vec![]);
        let err = f.service.search("rust serde", 0).unwrap_err();
        assert!(matches!(err, QuarryError::UnknownTerm(ref t) if t == "serde"));
        assert_eq!(err.user_message(), "Nothing found");
        assert!(f.backend.requests().is_empty());
    }

    #[test]
    fn test_local_errors() {
        let f = fixture(vec![]);
        assert!(matches!(f.service.search("   ", 0), Err(QuarryError::EmptyQuery)));
        assert!(matches!(
            f.service.search("rust &", 0),
            Err(QuarryError::MalformedExpression(_))
        ));
        assert!(matches!(
            f.service.search(&"x".repeat(1001), 0),
            Err(QuarryError::QueryTooLong { .. })
        ));
        assert!(f.backend.requests().is_empty());
    }

    #[test]
    fn test_missing_metadata_keeps_hit() {
        let f = fixture(vec![("1", vec![7])]);
        let found = f.service.search("cargo", 0).unwrap();
        assert_eq!(found.hits[0].title, "#7");
        assert!(found.hits[0].snippet.is_empty());
    }

    #[test]
    fn test_metrics_are_recorded() {
        let f = fixture(vec![("0", vec![0])]);
        let metrics = Arc::new(SearchMetrics::new().unwrap());
        let service = f.service.with_metrics(metrics.clone());

        service.search("rust", 0).unwrap();
        assert!(service.search("rust", 1).is_err());

        assert_eq!(metrics.queries_total.get(), 2.0);
        assert_eq!(
            metrics.query_errors.with_label_values(&["no_results"]).get(),
            1.0
        );
        assert_eq!(metrics.registered_queries.get(), 1);
    }

    #[test]
    fn test_page_window() {
        assert_eq!(page_window(0, 5), vec![0, 1, 2, 3, 4]);
        assert_eq!(page_window(1, 5), vec![0, 1, 2, 3, 4]);
        assert_eq!(page_window(7, 5), vec![5, 6, 7, 8, 9]);
    }
}

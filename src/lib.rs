//! quarry: boolean-query front-end for a full-text search engine
//!
//! Compiles user queries into postfix expressions over a term vocabulary,
//! pages document IDs out of a separate retrieval backend and renders
//! relevance snippets for the hits.

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod persistence;
pub mod query;
pub mod search;
pub mod snippet;
pub mod testing;
pub mod tokenizer;
pub mod vocabulary;

pub use client::{PipeTransport, RetrievalClient, Transport};
pub use config::{ClientConfig, EngineConfig, NormalizerConfig, QueryConfig, SnippetConfig};
pub use error::{QuarryError, Result};
pub use persistence::DocumentStore;
pub use query::{CompiledQuery, QueryCompiler};
pub use search::{SearchHit, SearchPage, SearchService};
pub use snippet::{Snippet, SnippetEngine};
pub use tokenizer::{Normalize, TermNormalizer};
pub use vocabulary::{ResolvedExpr, Vocabulary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

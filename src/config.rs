use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Term normalizer configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NormalizerConfig {
    pub lowercase: bool,
    pub strip_accents: bool,
    pub stem: bool,
    pub language: String,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            strip_accents: true,
            stem: false,
            language: "english".to_string(),
        }
    }
}

/// Query compiler limits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Maximum query length in characters
    pub max_query_length: usize,
    /// Maximum number of atomic terms (phrase words count individually)
    pub max_terms: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_query_length: 1000,
            max_terms: 20,
        }
    }
}

/// Retrieval client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Channel the client writes requests into
    pub request_pipe: PathBuf,
    /// Channel the client reads responses from
    pub response_pipe: PathBuf,
    /// Number of document IDs per backend page
    pub page_size: usize,
    /// Per-exchange timeout; 0 disables it
    pub timeout_ms: u64,
    /// Resends of a request that never reached the backend
    pub transport_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_pipe: PathBuf::from("../pipe_A"),
            response_pipe: PathBuf::from("../pipe_B"),
            page_size: 50,
            timeout_ms: 5000,
            transport_retries: 1,
            retry_backoff_ms: 50,
        }
    }
}

/// Snippet rendering configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnippetConfig {
    /// Maximum snippet length in characters
    pub max_length: usize,
    /// Initial context radius around the covering window
    pub radius_init: usize,
    /// Radius growth per rendering round
    pub radius_step: usize,
    /// Tokens kept by the fallback snippet
    pub fallback_tokens: usize,
}

impl Default for SnippetConfig {
    fn default() -> Self {
        Self {
            max_length: 300,
            radius_init: 1,
            radius_step: 5,
            fallback_tokens: 50,
        }
    }
}

/// Top-level configuration for a query front-end process
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Vocabulary file, one term per line
    pub terms_path: PathBuf,
    /// Document metadata file, one tab-separated record per line
    pub meta_path: PathBuf,
    pub normalizer: NormalizerConfig,
    pub query: QueryConfig,
    pub client: ClientConfig,
    pub snippet: SnippetConfig,
}

impl EngineConfig {
    /// Create a configuration pointing at the given index files
    pub fn new(terms_path: PathBuf, meta_path: PathBuf) -> Self {
        Self {
            terms_path,
            meta_path,
            ..Default::default()
        }
    }

    /// Set the backend channels
    pub fn with_pipes(mut self, request_pipe: PathBuf, response_pipe: PathBuf) -> Self {
        self.client.request_pipe = request_pipe;
        self.client.response_pipe = response_pipe;
        self
    }

    /// Set the backend exchange timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.client.timeout_ms = timeout_ms;
        self
    }

    /// Enable or disable stemming in the term normalizer
    pub fn with_stemming(mut self, stem: bool) -> Self {
        self.normalizer.stem = stem;
        self
    }

    /// Set the snippet character budget
    pub fn with_snippet_length(mut self, max_length: usize) -> Self {
        self.snippet.max_length = max_length;
        self
    }
}

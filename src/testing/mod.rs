//! Testing infrastructure
//!
//! Provides an in-memory retrieval backend that speaks the real wire
//! protocol, so the client, the search service and integration tests can run
//! without a backend process.
//!
//! # Quick Start
//!
//! ```rust
//! use quarry::client::RetrievalClient;
//! use quarry::config::ClientConfig;
//! use quarry::testing::ScriptedBackend;
//!
//! let backend = ScriptedBackend::new().with_results("0 1 &", vec![4, 8, 15]);
//! let client = RetrievalClient::new(backend.clone(), &ClientConfig::default());
//! // ... fetch pages, then inspect `backend.requests()`
//! ```

pub mod backend;

pub use backend::{RecordedRequest, ScriptedBackend};

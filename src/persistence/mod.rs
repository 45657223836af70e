//! Document store: metadata table plus lazily indexed corpus files.

mod doc_store;

pub use doc_store::{scan_documents, DocSpan, DocumentRecord, DocumentStore};

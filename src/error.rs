use thiserror::Error;

/// Main error type for quarry operations
#[derive(Error, Debug)]
pub enum QuarryError {
    #[error("Empty query")]
    EmptyQuery,

    #[error("Query too long: {length} characters, maximum is {max}")]
    QueryTooLong { length: usize, max: usize },

    #[error("Malformed expression: {0}")]
    MalformedExpression(String),

    #[error("Too many terms: {count}, maximum is {max}")]
    TooManyTerms { count: usize, max: usize },

    #[error("Unknown term: {0}")]
    UnknownTerm(String),

    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("No results for page {page}")]
    NoResults { page: usize },

    #[error("Document not found: {0}")]
    DocumentNotFound(u32),

    /// The request never reached the backend: opening or writing the request channel failed
    #[error("Request not delivered: {0}")]
    RequestNotDelivered(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for quarry operations
pub type Result<T> = std::result::Result<T, QuarryError>;

impl QuarryError {
    /// Check if the failed request can be sent again.
    ///
    /// Only requests that never reached the backend qualify. The protocol is not
    /// idempotent: a request the backend has read may already have registered a
    /// query or advanced a cursor, so any failure after delivery is final.
    pub fn is_retriable(&self) -> bool {
        matches!(self, QuarryError::RequestNotDelivered(_))
    }

    /// Errors detected while compiling the query, before any backend exchange.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            QuarryError::EmptyQuery
                | QuarryError::QueryTooLong { .. }
                | QuarryError::MalformedExpression(_)
                | QuarryError::TooManyTerms { .. }
        )
    }

    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            QuarryError::EmptyQuery => "empty_query",
            QuarryError::QueryTooLong { .. } => "query_too_long",
            QuarryError::MalformedExpression(_) => "malformed_expression",
            QuarryError::TooManyTerms { .. } => "too_many_terms",
            QuarryError::UnknownTerm(_) => "unknown_term",
            QuarryError::BackendError(_) => "backend_error",
            QuarryError::BackendUnavailable(_) => "backend_unavailable",
            QuarryError::NoResults { .. } => "no_results",
            QuarryError::DocumentNotFound(_) => "document_not_found",
            QuarryError::RequestNotDelivered(_) => "request_not_delivered",
            QuarryError::Io(_) => "io",
            QuarryError::Config(_) => "config",
        }
    }

    /// Message shown to the person who typed the query
    pub fn user_message(&self) -> String {
        match self {
            QuarryError::EmptyQuery => "Empty query".to_string(),
            QuarryError::QueryTooLong { max, .. } => {
                format!("Query exceeds the maximum length of {} characters", max)
            }
            QuarryError::MalformedExpression(_) => "Bad expression".to_string(),
            QuarryError::TooManyTerms { max, .. } => {
                format!("Too many words in the query (maximum {})", max)
            }
            QuarryError::UnknownTerm(_) | QuarryError::NoResults { .. } => {
                "Nothing found".to_string()
            }
            QuarryError::BackendError(_)
            | QuarryError::BackendUnavailable(_)
            | QuarryError::RequestNotDelivered(_)
            | QuarryError::Io(_) => "Search backend is not available, try again later".to_string(),
            QuarryError::DocumentNotFound(_) | QuarryError::Config(_) => {
                "Internal error".to_string()
            }
        }
    }
}

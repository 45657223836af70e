//! Retrieval backend client
//!
//! Each distinct resolved expression is a query key. The first fetch for a
//! key registers it with a "new query" request; later fetches send the
//! handle assigned at registration and receive one page of document IDs per
//! request. Fetched pages are cached per key and never evicted.

pub mod protocol;
mod session;
mod transport;

pub use protocol::{Request, Response};
pub use session::{CachedResults, QuerySession};
pub use transport::{PipeTransport, Transport};

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::QuarryError;
use crate::metrics::SearchMetrics;
use crate::vocabulary::ResolvedExpr;
use crate::Result;

struct ClientState {
    transport: Box<dyn Transport>,
    session: QuerySession,
}

/// Thread-safe retrieval client.
///
/// All exchanges, handle assignments and cache appends happen under one
/// lock, so concurrent callers can never assign two handles to the same key
/// or interleave page appends.
pub struct RetrievalClient {
    state: Mutex<ClientState>,
    page_size: usize,
    transport_retries: u32,
    retry_backoff: Duration,
    metrics: Option<Arc<SearchMetrics>>,
}

impl RetrievalClient {
    pub fn new(transport: impl Transport + 'static, config: &ClientConfig) -> Self {
        Self {
            state: Mutex::new(ClientState {
                transport: Box::new(transport),
                session: QuerySession::new(),
            }),
            page_size: config.page_size.max(1),
            transport_retries: config.transport_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            metrics: None,
        }
    }

    /// Client talking to the backend over the pipes named in `config`
    pub fn from_config(config: &ClientConfig) -> Self {
        let transport = PipeTransport::new(&config.request_pipe, &config.response_pipe)
            .with_timeout(Duration::from_millis(config.timeout_ms));
        Self::new(transport, config)
    }

    pub fn with_metrics(mut self, metrics: Arc<SearchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Handle assigned to an expression, if it has been registered
    pub fn handle(&self, expr: &ResolvedExpr) -> Option<u32> {
        self.state.lock().session.handle(expr.wire())
    }

    /// Number of IDs cached for an expression
    pub fn cached_len(&self, expr: &ResolvedExpr) -> usize {
        self.state
            .lock()
            .session
            .results(expr.wire())
            .map(CachedResults::len)
            .unwrap_or(0)
    }

    /// Number of distinct queries registered by this client
    pub fn query_count(&self) -> usize {
        self.state.lock().session.query_count()
    }

    /// Fetch one zero-based page of document IDs for an expression.
    ///
    /// Pages already cached are served without contacting the backend.
    /// Returns [`QuarryError::NoResults`] when the backend has no documents
    /// for that page. Pages fetched before an error stay cached.
    pub fn fetch_page(&self, expr: &ResolvedExpr, page: usize) -> Result<Vec<u32>> {
        let key = expr.wire();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let handle = match state.session.handle(key) {
            Some(handle) => handle,
            None => {
                let handle = state.session.register(key);
                info!(handle, expression = key, "registering new query");
                self.register(state, key)?;
                handle
            }
        };

        let page_size = self.page_size;
        let cached = state.session.results_mut(key);
        if let Some(ids) = cached.page(page, page_size) {
            self.record_cache_hit();
            return Ok(ids.to_vec());
        }

        if cached.is_exhausted(page_size) {
            debug!(handle, page, cached = cached.len(), "result list exhausted");
            return Err(QuarryError::NoResults { page });
        }

        let first_missing = cached.pages_covered(page_size);
        for next in first_missing..=page {
            let response = Self::send(
                &mut *state.transport,
                Request::Existing { handle },
                self.transport_retries,
                self.retry_backoff,
                self.metrics.as_deref(),
            )?;

            let ids = match response {
                Response::OkPayload(ids) => ids,
                Response::Ok => {
                    debug!(handle, page = next, "backend returned no payload");
                    break;
                }
                Response::Unrecognized(code) => {
                    warn!(handle, code, "unrecognized response code");
                    break;
                }
                Response::Bad => {
                    return Err(QuarryError::BackendError(format!(
                        "backend rejected page {} of query {}",
                        next, handle
                    )))
                }
            };

            if ids.is_empty() {
                break;
            }
            let short = ids.len() < page_size;
            let cached = state.session.results_mut(key);
            cached.extend(&ids);
            debug!(handle, page = next, fetched = ids.len(), total = cached.len(), "appended page");
            if short {
                break;
            }
        }

        state
            .session
            .results_mut(key)
            .page(page, page_size)
            .map(<[u32]>::to_vec)
            .ok_or(QuarryError::NoResults { page })
    }

    fn register(&self, state: &mut ClientState, key: &str) -> Result<()> {
        let response = Self::send(
            &mut *state.transport,
            Request::New { expression: key },
            self.transport_retries,
            self.retry_backoff,
            self.metrics.as_deref(),
        )?;

        match response {
            Response::Ok => {}
            Response::OkPayload(ids) => {
                warn!(ids = ids.len(), "payload in answer to a new query, ignoring it");
            }
            Response::Unrecognized(code) => {
                warn!(code, "unrecognized response code");
            }
            Response::Bad => {
                return Err(QuarryError::BackendError(
                    "backend rejected the query".to_string(),
                ))
            }
        }

        state.session.results_mut(key);
        Ok(())
    }

    /// Exchange one request, resending it only when it never reached the backend
    fn send(
        transport: &mut dyn Transport,
        request: Request<'_>,
        retries: u32,
        backoff: Duration,
        metrics: Option<&SearchMetrics>,
    ) -> Result<Response> {
        let bytes = request.encode()?;
        let mut attempt = 0;

        loop {
            if let Some(metrics) = metrics {
                metrics
                    .backend_requests
                    .with_label_values(&[request.kind()])
                    .inc();
            }

            match transport.exchange(&bytes) {
                Ok(raw) => return Response::decode(&raw),
                Err(e) if e.is_retriable() && attempt < retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, kind = request.kind(), "retrying backend exchange");
                    std::thread::sleep(backoff * attempt);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn record_cache_hit(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.cache_hits.inc();
        }
    }
}

use prometheus::{
    Counter, CounterVec, Encoder, Histogram, HistogramOpts, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Prometheus metrics for the query front-end
#[derive(Clone)]
pub struct SearchMetrics {
    // Counters
    pub queries_total: Counter,
    pub query_errors: CounterVec,
    pub backend_requests: CounterVec,
    pub cache_hits: Counter,
    pub snippets_fallback: Counter,

    // Gauges
    pub registered_queries: IntGauge,

    // Histograms
    pub search_latency: Histogram,
    pub snippet_latency: Histogram,

    // Registry
    registry: Arc<Registry>,
}

impl SearchMetrics {
    /// Create a new SearchMetrics instance
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Counters
        let queries_total = Counter::with_opts(Opts::new(
            "quarry_queries_total",
            "Total number of search requests",
        ))?;
        registry.register(Box::new(queries_total.clone()))?;

        let query_errors = CounterVec::new(
            Opts::new("quarry_query_errors_total", "Failed search requests by kind"),
            &["kind"],
        )?;
        registry.register(Box::new(query_errors.clone()))?;

        let backend_requests = CounterVec::new(
            Opts::new(
                "quarry_backend_requests_total",
                "Requests sent to the retrieval backend by type",
            ),
            &["type"],
        )?;
        registry.register(Box::new(backend_requests.clone()))?;

        let cache_hits = Counter::with_opts(Opts::new(
            "quarry_cache_hits_total",
            "Pages served from the result cache",
        ))?;
        registry.register(Box::new(cache_hits.clone()))?;

        let snippets_fallback = Counter::with_opts(Opts::new(
            "quarry_snippet_fallbacks_total",
            "Snippets that fell back to the document head",
        ))?;
        registry.register(Box::new(snippets_fallback.clone()))?;

        // Gauges
        let registered_queries = IntGauge::with_opts(Opts::new(
            "quarry_registered_queries",
            "Distinct queries registered with the backend",
        ))?;
        registry.register(Box::new(registered_queries.clone()))?;

        // Histograms
        let search_latency = Histogram::with_opts(
            HistogramOpts::new("quarry_search_latency_seconds", "End-to-end search latency")
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        )?;
        registry.register(Box::new(search_latency.clone()))?;

        let snippet_latency = Histogram::with_opts(
            HistogramOpts::new("quarry_snippet_latency_seconds", "Per-document snippet latency")
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]),
        )?;
        registry.register(Box::new(snippet_latency.clone()))?;

        Ok(Self {
            queries_total,
            query_errors,
            backend_requests,
            cache_hits,
            snippets_fallback,
            registered_queries,
            search_latency,
            snippet_latency,
            registry: Arc::new(registry),
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Record a completed search
    pub fn record_search(&self, duration_secs: f64) {
        self.queries_total.inc();
        self.search_latency.observe(duration_secs);
    }

    /// Record a failed search
    pub fn record_error(&self, kind: &str) {
        self.queries_total.inc();
        self.query_errors.with_label_values(&[kind]).inc();
    }

    pub fn record_snippet(&self, duration_secs: f64, fallback: bool) {
        self.snippet_latency.observe(duration_secs);
        if fallback {
            self.snippets_fallback.inc();
        }
    }

    pub fn set_registered_queries(&self, count: usize) {
        self.registered_queries.set(count as i64);
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

use std::collections::HashMap;

/// Document IDs fetched so far for one query, in backend order.
///
/// Append-only: pages are added as they are fetched and never removed.
#[derive(Debug, Clone, Default)]
pub struct CachedResults {
    ids: Vec<u32>,
}

impl CachedResults {
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of pages (full or partial) already fetched
    pub fn pages_covered(&self, page_size: usize) -> usize {
        self.ids.len().div_ceil(page_size)
    }

    /// A short last page means the backend has nothing more for this query
    pub fn is_exhausted(&self, page_size: usize) -> bool {
        self.ids.len() % page_size != 0
    }

    /// Slice of a cached page, if it has been fetched
    pub fn page(&self, page: usize, page_size: usize) -> Option<&[u32]> {
        let start = page.checked_mul(page_size)?;
        if start >= self.ids.len() {
            return None;
        }
        let end = (start + page_size).min(self.ids.len());
        Some(&self.ids[start..end])
    }

    pub(crate) fn extend(&mut self, ids: &[u32]) {
        self.ids.extend_from_slice(ids);
    }
}

/// Handle table and result cache for one client.
///
/// Handles are assigned sequentially from 0 the first time a query key is
/// seen and are never reused. Neither table is ever shrunk; a long-running
/// process grows them with every distinct query it serves.
#[derive(Debug, Default)]
pub struct QuerySession {
    handles: HashMap<String, u32>,
    next_handle: u32,
    results: HashMap<String, CachedResults>,
}

impl QuerySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self, key: &str) -> Option<u32> {
        self.handles.get(key).copied()
    }

    /// Assign the next handle to `key`, or return the one it already has
    pub fn register(&mut self, key: &str) -> u32 {
        if let Some(handle) = self.handles.get(key) {
            return *handle;
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        self.handles.insert(key.to_string(), handle);
        handle
    }

    pub fn results(&self, key: &str) -> Option<&CachedResults> {
        self.results.get(key)
    }

    pub(crate) fn results_mut(&mut self, key: &str) -> &mut CachedResults {
        self.results.entry(key.to_string()).or_default()
    }

    /// Number of distinct queries registered so far
    pub fn query_count(&self) -> usize {
        self.handles.len()
    }
}

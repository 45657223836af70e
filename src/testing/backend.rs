//! In-memory stand-in for the retrieval backend
//!
//! Behaves like the real backend process: a "new query" request registers a
//! cursor over the configured result list (handles are assigned in arrival
//! order) and answers `Ok`; each "existing query" request returns the next
//! page of IDs from that cursor, or `Bad` for an unknown handle.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;

use bytes::Buf;
use parking_lot::Mutex;

use crate::client::protocol::{EXISTING_REQUEST, NEW_REQUEST};
use crate::client::{Response, Transport};
use crate::error::QuarryError;
use crate::Result;

/// A request as the backend saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedRequest {
    New(String),
    Existing(u32),
    Invalid(Vec<u8>),
}

struct Cursor {
    ids: Vec<u32>,
    position: usize,
}

struct BackendState {
    page_size: usize,
    results: HashMap<String, Vec<u32>>,
    rejected: HashSet<String>,
    /// One slot per "new" request; `None` for rejected expressions
    cursors: Vec<Option<Cursor>>,
    requests: Vec<RecordedRequest>,
    raw_responses: HashMap<usize, Vec<u8>>,
    exchanges: usize,
    failures_left: u32,
    lost_responses_left: u32,
}

/// Scripted backend usable as a [`Transport`].
///
/// Clones share state, so a test can hand one clone to the client and keep
/// another to inspect the requests that were sent.
#[derive(Clone)]
pub struct ScriptedBackend {
    state: Arc<Mutex<BackendState>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BackendState {
                page_size: 50,
                results: HashMap::new(),
                rejected: HashSet::new(),
                cursors: Vec::new(),
                requests: Vec::new(),
                raw_responses: HashMap::new(),
                exchanges: 0,
                failures_left: 0,
                lost_responses_left: 0,
            })),
        }
    }

    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state.lock().page_size = page_size;
        self
    }

    /// Documents matched by an expression (in wire form)
    pub fn with_results(self, expression: &str, ids: Vec<u32>) -> Self {
        self.state.lock().results.insert(expression.to_string(), ids);
        self
    }

    /// Answer `Bad` when this expression is registered
    pub fn rejecting(self, expression: &str) -> Self {
        self.state.lock().rejected.insert(expression.to_string());
        self
    }

    /// Answer the exchange with this zero-based index with raw bytes
    pub fn with_raw_response(self, exchange: usize, bytes: Vec<u8>) -> Self {
        self.state.lock().raw_responses.insert(exchange, bytes);
        self
    }

    /// Fail the next `count` exchanges before the request is delivered
    pub fn fail_next_exchanges(&self, count: u32) {
        self.state.lock().failures_left = count;
    }

    /// Act on the next `count` requests but fail while the response is read back
    pub fn lose_next_responses(&self, count: u32) {
        self.state.lock().lost_responses_left = count;
    }

    /// Requests delivered so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    pub fn new_request_count(&self) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| matches!(r, RecordedRequest::New(_)))
            .count()
    }
}

impl Transport for ScriptedBackend {
    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        let mut state = self.state.lock();

        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(QuarryError::RequestNotDelivered(io::Error::new(
                io::ErrorKind::NotFound,
                "scripted transport failure",
            )));
        }

        let exchange = state.exchanges;
        state.exchanges += 1;

        let recorded = decode_request(request);
        state.requests.push(recorded.clone());

        let response = match recorded {
            RecordedRequest::New(expression) => {
                if state.rejected.contains(&expression) {
                    state.cursors.push(None);
                    Response::Bad
                } else {
                    let ids = state.results.get(&expression).cloned().unwrap_or_default();
                    state.cursors.push(Some(Cursor { ids, position: 0 }));
                    Response::Ok
                }
            }
            RecordedRequest::Existing(handle) => {
                let page_size = state.page_size;
                match state.cursors.get_mut(handle as usize) {
                    Some(Some(cursor)) => {
                        let end = (cursor.position + page_size).min(cursor.ids.len());
                        let page = cursor.ids[cursor.position..end].to_vec();
                        cursor.position = end;
                        Response::OkPayload(page)
                    }
                    _ => Response::Bad,
                }
            }
            RecordedRequest::Invalid(_) => Response::Bad,
        };

        if state.lost_responses_left > 0 {
            state.lost_responses_left -= 1;
            return Err(QuarryError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "scripted response failure",
            )));
        }
        if let Some(raw) = state.raw_responses.remove(&exchange) {
            return Ok(raw);
        }
        Ok(response.encode())
    }
}

fn decode_request(bytes: &[u8]) -> RecordedRequest {
    let mut buf = bytes;
    if buf.remaining() < 5 {
        return RecordedRequest::Invalid(bytes.to_vec());
    }
    match buf.get_u8() {
        NEW_REQUEST => {
            let len = buf.get_u32_le() as usize;
            if buf.remaining() < len {
                return RecordedRequest::Invalid(bytes.to_vec());
            }
            match std::str::from_utf8(&buf[..len]) {
                Ok(expression) => RecordedRequest::New(expression.to_string()),
                Err(_) => RecordedRequest::Invalid(bytes.to_vec()),
            }
        }
        EXISTING_REQUEST => RecordedRequest::Existing(buf.get_u32_le()),
        _ => RecordedRequest::Invalid(bytes.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Request;

    fn send(backend: &mut ScriptedBackend, request: Request<'_>) -> Response {
        let raw = backend.exchange(&request.encode().unwrap()).unwrap();
        Response::decode(&raw).unwrap()
    }

    #[test]
    fn test_cursor_pages() {
        let mut backend = ScriptedBackend::new()
            .with_page_size(2)
            .with_results("1", vec![5, 6, 7]);

        assert_eq!(send(&mut backend, Request::New { expression: "1" }), Response::Ok);
        assert_eq!(
            send(&mut backend, Request::Existing { handle: 0 }),
            Response::OkPayload(vec![5, 6])
        );
        assert_eq!(
            send(&mut backend, Request::Existing { handle: 0 }),
            Response::OkPayload(vec![7])
        );
        assert_eq!(
            send(&mut backend, Request::Existing { handle: 0 }),
            Response::OkPayload(vec![])
        );
    }

    #[test]
    fn test_lost_response_still_acts_on_request() {
        let mut backend = ScriptedBackend::new().with_results("1", vec![5]);
        backend.lose_next_responses(1);

        let request = Request::New { expression: "1" }.encode().unwrap();
        assert!(matches!(backend.exchange(&request), Err(QuarryError::Io(_))));
        assert_eq!(
            send(&mut backend, Request::Existing { handle: 0 }),
            Response::OkPayload(vec![5])
        );
    }

    #[test]
    fn test_unknown_handle_is_bad() {
        let mut backend = ScriptedBackend::new();
        assert_eq!(send(&mut backend, Request::Existing { handle: 3 }), Response::Bad);
    }

    #[test]
    fn test_rejected_expression_still_takes_a_slot() {
        let mut backend = ScriptedBackend::new()
            .rejecting("bad")
            .with_results("good", vec![1]);

        assert_eq!(send(&mut backend, Request::New { expression: "bad" }), Response::Bad);
        assert_eq!(send(&mut backend, Request::New { expression: "good" }), Response::Ok);
        assert_eq!(
            send(&mut backend, Request::Existing { handle: 1 }),
            Response::OkPayload(vec![1])
        );
        assert_eq!(backend.new_request_count(), 2);
    }
}

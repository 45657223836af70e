use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, TryRecvError};
use tracing::{debug, warn};

use crate::error::QuarryError;
use crate::Result;

/// One synchronous request/response exchange with the retrieval backend.
///
/// The caller hands over a fully encoded request and gets back the full
/// response bytes. Exactly one response is read per request.
///
/// Failures before the backend has the request must be reported as
/// [`QuarryError::RequestNotDelivered`]; only those are retried. Anything
/// that fails later is reported as another error.
pub trait Transport: Send {
    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        (**self).exchange(request)
    }
}

/// Transport over two one-directional channels (usually named pipes).
///
/// Each exchange opens the request channel, writes the whole request and
/// closes it, then opens the response channel and reads until EOF.
pub struct PipeTransport {
    request_path: PathBuf,
    response_path: PathBuf,
    timeout: Option<Duration>,
    /// Exchange that outlived its timeout and may still touch the channels
    stalled: Option<Receiver<Result<Vec<u8>>>>,
}

impl PipeTransport {
    pub fn new(request_path: impl Into<PathBuf>, response_path: impl Into<PathBuf>) -> Self {
        Self {
            request_path: request_path.into(),
            response_path: response_path.into(),
            timeout: None,
            stalled: None,
        }
    }

    /// Give up on an exchange after `timeout`; a zero duration disables the limit
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout.is_zero() { None } else { Some(timeout) };
        self
    }

    fn exchange_blocking(
        request_path: &Path,
        response_path: &Path,
        request: &[u8],
    ) -> Result<Vec<u8>> {
        Self::deliver(request_path, request).map_err(QuarryError::RequestNotDelivered)?;

        let mut input = File::open(response_path)?;
        let mut response = Vec::new();
        input.read_to_end(&mut response)?;
        Ok(response)
    }

    /// Write the whole request and close the channel
    fn deliver(request_path: &Path, request: &[u8]) -> std::io::Result<()> {
        let mut out = OpenOptions::new().write(true).open(request_path)?;
        out.write_all(request)?;
        out.flush()
    }

    /// Refuse to start a new exchange while a timed-out one is still in flight
    fn check_stalled(&mut self) -> Result<()> {
        let Some(rx) = &self.stalled else {
            return Ok(());
        };
        match rx.try_recv() {
            Ok(late) => {
                debug!(ok = late.is_ok(), "discarding late response of timed-out exchange");
                self.stalled = None;
                Ok(())
            }
            Err(TryRecvError::Disconnected) => {
                self.stalled = None;
                Ok(())
            }
            Err(TryRecvError::Empty) => Err(QuarryError::BackendUnavailable(
                "previous exchange is still pending".to_string(),
            )),
        }
    }
}

impl Transport for PipeTransport {
    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        let Some(timeout) = self.timeout else {
            return Self::exchange_blocking(&self.request_path, &self.response_path, request);
        };

        self.check_stalled()?;

        let (tx, rx) = channel::bounded(1);
        let request_path = self.request_path.clone();
        let response_path = self.response_path.clone();
        let payload = request.to_vec();
        std::thread::Builder::new()
            .name("quarry-exchange".to_string())
            .spawn(move || {
                let result = Self::exchange_blocking(&request_path, &response_path, &payload);
                let _ = tx.send(result);
            })
            .map_err(QuarryError::RequestNotDelivered)?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(?timeout, "backend exchange timed out");
                self.stalled = Some(rx);
                Err(QuarryError::BackendUnavailable(format!(
                    "no response within {} ms",
                    timeout.as_millis()
                )))
            }
            Err(RecvTimeoutError::Disconnected) => Err(QuarryError::BackendUnavailable(
                "exchange thread terminated".to_string(),
            )),
        }
    }
}

//! Wire format for the retrieval backend.
//!
//! Requests:
//! - new query:      `u8 0` + `u32 LE` length + UTF-8 expression bytes
//! - existing query: `u8 1` + `u32 LE` handle
//!
//! Responses:
//! - `u8 0` ok, no payload
//! - `u8 1` ok with payload: `u32 LE` count + count × `u32 LE` document IDs
//! - `u8 2` bad request
//!
//! All integers are little endian; there is no framing beyond these fields.

use bytes::{Buf, BufMut};

use crate::error::QuarryError;
use crate::Result;

pub const NEW_REQUEST: u8 = 0;
pub const EXISTING_REQUEST: u8 = 1;

pub const RESPONSE_OK: u8 = 0;
pub const RESPONSE_OK_PAYLOAD: u8 = 1;
pub const RESPONSE_BAD: u8 = 2;

/// Request sent to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request<'a> {
    /// Register a new query expression
    New { expression: &'a str },
    /// Fetch the next page of a registered query
    Existing { handle: u32 },
}

impl Request<'_> {
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Request::New { expression } => {
                let len = u32::try_from(expression.len()).map_err(|_| {
                    QuarryError::MalformedExpression(format!(
                        "expression of {} bytes does not fit the wire format",
                        expression.len()
                    ))
                })?;
                let mut buf = Vec::with_capacity(5 + expression.len());
                buf.put_u8(NEW_REQUEST);
                buf.put_u32_le(len);
                buf.put_slice(expression.as_bytes());
                Ok(buf)
            }
            Request::Existing { handle } => {
                let mut buf = Vec::with_capacity(5);
                buf.put_u8(EXISTING_REQUEST);
                buf.put_u32_le(*handle);
                Ok(buf)
            }
        }
    }

    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Request::New { .. } => "new",
            Request::Existing { .. } => "existing",
        }
    }
}

/// Response read back from the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Query registered, nothing fetched yet
    Ok,
    /// Up to one page of document IDs
    OkPayload(Vec<u32>),
    /// The backend rejected the request
    Bad,
    /// Any other leading byte
    Unrecognized(u8),
}

impl Response {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut buf = bytes;
        if !buf.has_remaining() {
            return Err(QuarryError::BackendError("empty response".to_string()));
        }

        match buf.get_u8() {
            RESPONSE_OK => Ok(Response::Ok),
            RESPONSE_BAD => Ok(Response::Bad),
            RESPONSE_OK_PAYLOAD => {
                if buf.remaining() < 4 {
                    return Err(QuarryError::BackendError(
                        "truncated payload header".to_string(),
                    ));
                }
                let count = buf.get_u32_le() as usize;
                if buf.remaining() / 4 < count {
                    return Err(QuarryError::BackendError(format!(
                        "truncated payload: expected {} ids, got {} bytes",
                        count,
                        buf.remaining()
                    )));
                }
                let ids = (0..count).map(|_| buf.get_u32_le()).collect();
                Ok(Response::OkPayload(ids))
            }
            code => Ok(Response::Unrecognized(code)),
        }
    }

    /// Encode a response the way the backend writes it
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Response::Ok => vec![RESPONSE_OK],
            Response::Bad => vec![RESPONSE_BAD],
            Response::Unrecognized(code) => vec![*code],
            Response::OkPayload(ids) => {
                let mut buf = Vec::with_capacity(5 + ids.len() * 4);
                buf.put_u8(RESPONSE_OK_PAYLOAD);
                buf.put_u32_le(ids.len() as u32);
                for id in ids {
                    buf.put_u32_le(*id);
                }
                buf
            }
        }
    }
}

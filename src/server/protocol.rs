//! Wire Protocol
//!
//! Requests travel on the shared server FIFO as fixed-size frames: the
//! `bincode` encoding of [`Request`] zero-padded to [`FRAME_SIZE`]. Frames are
//! below `PIPE_BUF`, so concurrent clients never interleave their writes.
//!
//! `Request::data` carries the operation payload followed by a space and the
//! path of the client's private reply FIFO. Replies are UTF-8 text terminated
//! by a single NUL byte.

use super::types::ServerError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const FRAME_SIZE: usize = 1024;
pub const MAX_RESPONSE_SIZE: usize = 16 * 1024;
pub const REPLY_TERMINATOR: u8 = 0;
pub const DEFAULT_SERVER_PIPE: &str = "/tmp/server_pipe";
pub const CLIENT_PIPE_PREFIX: &str = "docindex_client_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RequestKind {
    Add = 0,
    Consult = 1,
    Delete = 2,
    CountLines = 3,
    Search = 4,
    ParallelSearch = 5,
    Shutdown = 6,
}

impl RequestKind {
    /// Kinds that change the catalog and therefore run on the broker itself.
    pub fn is_mutating(self) -> bool {
        matches!(self, Self::Add | Self::Delete | Self::Shutdown)
    }
}

impl TryFrom<u32> for RequestKind {
    type Error = ServerError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Add,
            1 => Self::Consult,
            2 => Self::Delete,
            3 => Self::CountLines,
            4 => Self::Search,
            5 => Self::ParallelSearch,
            6 => Self::Shutdown,
            other => return Err(ServerError::UnknownKind(other)),
        })
    }
}

/// One request frame as it travels on the wire.
///
/// `kind` stays a raw integer so that an unknown kind still decodes and the
/// broker can reply with an error instead of dropping the frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub kind: u32,
    pub data: String,
}

impl Request {
    pub fn new(kind: RequestKind, payload: &str, reply_to: &Path) -> Self {
        Self {
            kind: kind as u32,
            data: format!("{} {}", payload, reply_to.display()),
        }
    }

    pub fn kind(&self) -> Result<RequestKind, ServerError> {
        RequestKind::try_from(self.kind)
    }

    /// Splits `data` into the payload and the reply FIFO path after the last space.
    pub fn split_reply_path(&self) -> (&str, Option<&str>) {
        match self.data.rsplit_once(' ') {
            Some((payload, path)) if !path.is_empty() => (payload, Some(path)),
            Some((payload, _)) => (payload, None),
            None => (self.data.as_str(), None),
        }
    }
}

pub fn encode_frame(request: &Request) -> Result<Vec<u8>, ServerError> {
    let mut frame =
        bincode::serialize(request).map_err(|e| ServerError::Protocol(e.to_string()))?;

    if frame.len() > FRAME_SIZE {
        return Err(ServerError::Protocol(format!(
            "request of {} bytes does not fit a {} byte frame",
            frame.len(),
            FRAME_SIZE
        )));
    }

    frame.resize(FRAME_SIZE, 0);
    Ok(frame)
}

pub fn decode_frame(frame: &[u8]) -> Result<Request, ServerError> {
    if frame.len() != FRAME_SIZE {
        return Err(ServerError::Protocol(format!(
            "frame is {} bytes, expected {}",
            frame.len(),
            FRAME_SIZE
        )));
    }

    let request: Request =
        bincode::deserialize(frame).map_err(|e| ServerError::Protocol(e.to_string()))?;
    let used = bincode::serialized_size(&request)
        .map_err(|e| ServerError::Protocol(e.to_string()))? as usize;

    // Anything but zero padding means the stream is out of step with frame boundaries.
    if frame[used..].iter().any(|b| *b != 0) {
        return Err(ServerError::Protocol(format!(
            "{} bytes after the request are not padding",
            FRAME_SIZE - used
        )));
    }
    Ok(request)
}

/// Cuts a response down to what fits in one reply, terminator included.
pub fn truncate_response(mut response: String) -> String {
    let limit = MAX_RESPONSE_SIZE - 1;
    if response.len() > limit {
        let mut end = limit;
        while !response.is_char_boundary(end) {
            end -= 1;
        }
        response.truncate(end);
    }
    response
}

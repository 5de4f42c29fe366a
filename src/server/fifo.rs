//! Named pipe helpers shared by the broker and the client stub.

use super::protocol::REPLY_TERMINATOR;
use super::types::ServerError;

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::pipe;

/// Creates a FIFO at `path`, replacing any stale file left behind.
pub fn create(path: &Path) -> Result<(), ServerError> {
    remove(path);

    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|e| {
        ServerError::channel(path, io::Error::new(io::ErrorKind::InvalidInput, e))
    })?;

    // SAFETY: `c_path` is a valid NUL-terminated string that outlives the call.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o666) };
    if rc == -1 {
        return Err(ServerError::channel(path, io::Error::last_os_error()));
    }
    Ok(())
}

pub fn remove(path: &Path) {
    if let Err(e) = std::fs::remove_file(path)
        && e.kind() != io::ErrorKind::NotFound
    {
        tracing::warn!("Failed to remove {}: {}", path.display(), e);
    }
}

/// Opens the read end of a FIFO.
///
/// The pipe is opened read-write so that it always has a writer: reads wait
/// for the next client instead of hitting EOF whenever the last one leaves.
pub fn open_reader(path: &Path) -> Result<pipe::Receiver, ServerError> {
    pipe::OpenOptions::new()
        .read_write(true)
        .open_receiver(path)
        .map_err(|e| ServerError::channel(path, e))
}

/// Opens the write end of a FIFO. Fails if nobody has it open for reading.
pub fn open_writer(path: &Path) -> Result<pipe::Sender, ServerError> {
    pipe::OpenOptions::new()
        .open_sender(path)
        .map_err(|e| ServerError::channel(path, e))
}

/// Writes one NUL-terminated reply and closes the pipe.
pub async fn send_reply(path: &Path, response: &str) -> Result<(), ServerError> {
    let mut writer = open_writer(path)?;

    let mut message = Vec::with_capacity(response.len() + 1);
    message.extend_from_slice(response.as_bytes());
    message.push(REPLY_TERMINATOR);

    writer
        .write_all(&message)
        .await
        .map_err(|e| ServerError::channel(path, e))?;
    writer
        .flush()
        .await
        .map_err(|e| ServerError::channel(path, e))
}

/// Reads until the reply terminator (or EOF) and returns the text before it.
pub async fn read_reply(
    reader: &mut pipe::Receiver,
    path: &Path,
) -> Result<String, ServerError> {
    let mut reply = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = reader
            .read(&mut chunk)
            .await
            .map_err(|e| ServerError::channel(path, e))?;
        if n == 0 {
            break;
        }
        if let Some(end) = chunk[..n].iter().position(|b| *b == REPLY_TERMINATOR) {
            reply.extend_from_slice(&chunk[..end]);
            break;
        }
        reply.extend_from_slice(&chunk[..n]);
    }

    String::from_utf8(reply).map_err(|e| ServerError::Protocol(e.to_string()))
}

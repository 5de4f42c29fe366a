//! Client Stub
//!
//! Builds a request, opens a private reply FIFO, sends the frame to the shared
//! server FIFO and waits for the answer. Each request gets a fresh reply FIFO
//! named after a random UUID, removed again once the reply is read.

use crate::server::fifo;
use crate::server::protocol::{
    self, CLIENT_PIPE_PREFIX, DEFAULT_SERVER_PIPE, Request, RequestKind,
};
use crate::server::ServerError;

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// How long a shutdown request waits for its acknowledgement.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Reported when a shutdown goes unacknowledged.
pub const SHUTDOWN_TIMEOUT_REPLY: &str = "Server is shutting down (timeout)";

#[derive(Debug, Clone)]
pub struct Client {
    server_pipe: PathBuf,
    reply_dir: PathBuf,
    shutdown_timeout: Duration,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_PIPE)
    }
}

/// Removes the reply FIFO on every exit path.
struct ReplyChannel {
    path: PathBuf,
}

impl ReplyChannel {
    fn create(dir: &Path) -> Result<Self, ServerError> {
        let path = dir.join(format!("{}{}", CLIENT_PIPE_PREFIX, uuid::Uuid::new_v4()));
        fifo::create(&path)?;
        Ok(Self { path })
    }
}

impl Drop for ReplyChannel {
    fn drop(&mut self) {
        fifo::remove(&self.path);
    }
}

impl Client {
    pub fn new(server_pipe: impl Into<PathBuf>) -> Self {
        Self {
            server_pipe: server_pipe.into(),
            reply_dir: std::env::temp_dir(),
            shutdown_timeout: SHUTDOWN_TIMEOUT,
        }
    }

    /// Directory where reply FIFOs are created.
    pub fn with_reply_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reply_dir = dir.into();
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sends a request and blocks until the reply arrives.
    pub async fn send(&self, kind: RequestKind, payload: &str) -> Result<String, ServerError> {
        let channel = ReplyChannel::create(&self.reply_dir)?;
        // Open our end first so the server can always open it for writing.
        let mut reader = fifo::open_reader(&channel.path)?;

        self.transmit(kind, payload, &channel.path).await?;
        fifo::read_reply(&mut reader, &channel.path).await
    }

    /// Like [`Client::send`], but gives up after `timeout` and returns `None`.
    pub async fn send_with_timeout(
        &self,
        kind: RequestKind,
        payload: &str,
        timeout: Duration,
    ) -> Result<Option<String>, ServerError> {
        let channel = ReplyChannel::create(&self.reply_dir)?;
        let mut reader = fifo::open_reader(&channel.path)?;

        self.transmit(kind, payload, &channel.path).await?;
        match tokio::time::timeout(timeout, fifo::read_reply(&mut reader, &channel.path)).await {
            Ok(reply) => reply.map(Some),
            Err(_) => Ok(None),
        }
    }

    async fn transmit(
        &self,
        kind: RequestKind,
        payload: &str,
        reply_to: &Path,
    ) -> Result<(), ServerError> {
        let frame = protocol::encode_frame(&Request::new(kind, payload, reply_to))?;

        let mut writer = fifo::open_writer(&self.server_pipe)?;
        writer
            .write_all(&frame)
            .await
            .map_err(|e| ServerError::channel(&self.server_pipe, e))?;

        tracing::debug!("Sent {:?} request, waiting on {}", kind, reply_to.display());
        Ok(())
    }

    pub async fn add(
        &self,
        title: &str,
        authors: &str,
        year: &str,
        path: &str,
    ) -> Result<String, ServerError> {
        let payload = format!("{};{};{};{}", title, authors, year, path);
        self.send(RequestKind::Add, &payload).await
    }

    pub async fn consult(&self, key: u32) -> Result<String, ServerError> {
        self.send(RequestKind::Consult, &key.to_string()).await
    }

    pub async fn delete(&self, key: u32) -> Result<String, ServerError> {
        self.send(RequestKind::Delete, &key.to_string()).await
    }

    pub async fn count_lines(&self, key: u32, keyword: &str) -> Result<String, ServerError> {
        self.send(RequestKind::CountLines, &format!("{};{}", key, keyword))
            .await
    }

    /// Serial search when `workers` is 0, parallel search otherwise.
    pub async fn search(&self, keyword: &str, workers: usize) -> Result<String, ServerError> {
        if workers > 0 {
            self.send(RequestKind::ParallelSearch, &format!("{};{}", keyword, workers))
                .await
        } else {
            self.send(RequestKind::Search, keyword).await
        }
    }

    /// Asks the server to stop. A missing acknowledgement within the shutdown
    /// timeout ([`SHUTDOWN_TIMEOUT`] by default) is taken as success.
    pub async fn shutdown(&self) -> Result<String, ServerError> {
        let reply = self
            .send_with_timeout(RequestKind::Shutdown, "", self.shutdown_timeout)
            .await?;
        Ok(reply.unwrap_or_else(|| {
            tracing::warn!("No shutdown acknowledgement within {:?}", self.shutdown_timeout);
            SHUTDOWN_TIMEOUT_REPLY.to_string()
        }))
    }
}

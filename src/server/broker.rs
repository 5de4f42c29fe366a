//! Request Broker
//!
//! Owns the shared inbound FIFO and the server state, and serves one request
//! at a time:
//!
//! 1. **Receive**: read one fixed-size frame from the inbound FIFO.
//! 2. **Decode**: split the reply FIFO path off the payload. A frame that does
//!    not decode is dropped and the queued input drained to realign frames.
//! 3. **Route**: mutating kinds (add, delete, shutdown) run inline on the
//!    state; read-only kinds copy what they need and run in a delegated worker
//!    that the broker waits for.
//! 4. **Reply**: write the response to the client's FIFO and close it.
//!
//! Handler failures become `Error: ...` replies. Channel failures are logged
//! and the loop moves on to the next frame.

use super::fifo;
use super::handlers;
use super::protocol::{self, FRAME_SIZE, RequestKind};
use super::types::{ServerConfig, ServerError, ServerState};
use super::worker;

use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::unix::pipe;

/// How long a drain waits for more queued bytes before declaring the pipe empty.
const RESYNC_GRACE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Shutdown,
}

pub struct Broker {
    config: ServerConfig,
    state: ServerState,
    inbound: pipe::Receiver,
}

impl Broker {
    /// Loads the index and opens the inbound FIFO.
    ///
    /// Must be called inside a tokio runtime. A corrupt index fails here.
    pub fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let state = ServerState::load(&config)?;

        fifo::create(&config.server_pipe)?;
        let inbound = fifo::open_reader(&config.server_pipe)?;

        tracing::info!(
            "Server started on {}. Document folder: {}, cache size: {}",
            config.server_pipe.display(),
            config.document_root.display(),
            config.cache_capacity
        );

        Ok(Self {
            config,
            state,
            inbound,
        })
    }

    pub fn state(&self) -> &ServerState {
        &self.state
    }

    /// Serves requests until a shutdown request arrives.
    pub async fn run(mut self) -> Result<(), ServerError> {
        let mut frame = vec![0u8; FRAME_SIZE];

        loop {
            if let Err(e) = self.inbound.read_exact(&mut frame).await {
                tracing::error!(
                    "Failed to read request from {}: {}",
                    self.config.server_pipe.display(),
                    e
                );
                self.inbound = fifo::open_reader(&self.config.server_pipe)?;
                continue;
            }

            if self.serve_frame(&frame).await == Flow::Shutdown {
                break;
            }
        }

        self.state.persist();
        fifo::remove(&self.config.server_pipe);
        tracing::info!("Server stopped");
        Ok(())
    }

    async fn serve_frame(&mut self, frame: &[u8]) -> Flow {
        let request = match protocol::decode_frame(frame) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Dropping undecodable frame: {}", e);
                self.resync().await;
                return Flow::Continue;
            }
        };

        let (payload, reply_to) = request.split_reply_path();

        let (response, flow) = match request.kind() {
            Ok(kind) => route(&mut self.state, kind, payload).await,
            Err(e) => {
                tracing::warn!("{}", e);
                (format!("Error: {}", e), Flow::Continue)
            }
        };

        match reply_to {
            Some(path) => {
                let response = protocol::truncate_response(response);
                if let Err(e) = fifo::send_reply(Path::new(path), &response).await {
                    tracing::warn!("Failed to send reply: {}", e);
                }
            }
            None => tracing::warn!("Request carries no reply channel, response dropped"),
        }

        flow
    }

    /// Discards whatever is already queued on the inbound FIFO.
    ///
    /// After a bad frame the stream can no longer be trusted to sit on a frame
    /// boundary. Clients write each frame in one atomic write, so once the pipe
    /// is empty the next read starts on a fresh frame again.
    async fn resync(&mut self) {
        let mut scratch = vec![0u8; FRAME_SIZE];
        let mut dropped = 0usize;

        loop {
            match tokio::time::timeout(RESYNC_GRACE, self.inbound.read(&mut scratch)).await {
                Ok(Ok(0)) | Err(_) => break,
                Ok(Ok(n)) => dropped += n,
                Ok(Err(e)) => {
                    tracing::warn!("Failed to drain {}: {}", self.config.server_pipe.display(), e);
                    break;
                }
            }
        }

        if dropped > 0 {
            tracing::warn!("Discarded {} queued bytes to realign request frames", dropped);
        }
    }
}

/// Executes one decoded request against the state and returns the reply text.
pub async fn route(state: &mut ServerState, kind: RequestKind, payload: &str) -> (String, Flow) {
    tracing::debug!(
        "Routing {:?} request ({})",
        kind,
        if kind.is_mutating() { "inline" } else { "delegated" }
    );

    let result = match kind {
        RequestKind::Add => handlers::add(state, payload),
        RequestKind::Delete => handlers::delete(state, payload),
        RequestKind::Shutdown => return (handlers::shutdown(state), Flow::Shutdown),
        // The cache lookup stays on the broker so usage counts outlive the request.
        RequestKind::Consult => match handlers::resolve_consult(state, payload) {
            Ok(document) => {
                worker::delegate("consult", async move {
                    Ok(handlers::render_document(&document))
                })
                .await
            }
            Err(e) => Err(e),
        },
        RequestKind::CountLines => match handlers::prepare_count(state, payload) {
            Ok(job) => worker::delegate("count-lines", job.run()).await,
            Err(e) => Err(e),
        },
        RequestKind::Search => {
            let job = handlers::prepare_search(state, payload);
            worker::delegate("search", job.run()).await
        }
        RequestKind::ParallelSearch => match handlers::prepare_parallel_search(state, payload) {
            Ok(job) => worker::delegate("parallel search", job.run()).await,
            Err(e) => Err(e),
        },
    };

    let response = result.unwrap_or_else(|e| {
        tracing::debug!("{:?} request failed: {}", kind, e);
        format!("Error: {}", e)
    });

    (response, Flow::Continue)
}

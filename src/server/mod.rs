//! Index Server Module
//!
//! The request broker of the document index and everything it needs to talk
//! to clients.
//!
//! ## Architecture Overview
//! Clients write fixed-size request frames to one shared FIFO. The broker
//! reads them one at a time, routes each to a handler and answers on the
//! private FIFO named in the request. Catalog mutations run on the broker
//! itself; read-only work runs in a disposable worker task that the broker
//! waits for before reading the next frame.
//!
//! ## Submodules
//! - **`broker`**: The accept loop and request routing.
//! - **`handlers`**: Payload parsing and reply formatting per request kind.
//! - **`worker`**: Isolated execution of delegated read-only jobs.
//! - **`protocol`**: Frame layout, request kinds and reply limits.
//! - **`fifo`**: Named pipe creation and reply I/O.
//! - **`types`**: Server state, configuration and errors.

pub mod broker;
pub mod fifo;
pub mod handlers;
pub mod protocol;
pub mod types;
pub mod worker;

pub use broker::{Broker, Flow, route};
pub use protocol::{Request, RequestKind};
pub use types::{ServerConfig, ServerError, ServerState};

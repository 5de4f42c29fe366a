//! Document Index Server Library
//!
//! This library crate defines the modules behind the `dserver` and `dclient`
//! binaries.
//!
//! ## Architecture Modules
//! The system is composed of four subsystems:
//!
//! - **`storage`**: The document catalog with its monotonic key allocator, the LFU
//!   lookup cache, and the fixed-record index file that persists the catalog.
//! - **`search`**: Keyword search over the indexed files. Line counting runs in an
//!   external grep child process; parallel search fans a catalog snapshot out over
//!   worker tasks and merges their results in worker order.
//! - **`server`**: The request broker. It reads fixed-size frames from a shared FIFO,
//!   runs mutations inline, delegates read-only work to isolated workers, and replies
//!   on each client's private FIFO.
//! - **`client`**: The client stub used by `dclient` and the integration tests.

pub mod client;
pub mod search;
pub mod server;
pub mod storage;

//! Document Storage Module
//!
//! Owns the document metadata of the index server.
//!
//! ## Core Concepts
//! - **Catalog**: The authoritative list of documents plus the key allocator. Keys are never reused.
//! - **Cache**: A small LFU mirror of catalog documents that serves repeated lookups.
//! - **Persistence**: A fixed-record binary file holding the whole catalog, rewritten after every mutation.
//! - **Partitioning**: Contiguous slicing of a catalog snapshot for parallel search workers.

pub mod cache;
pub mod catalog;
pub mod partitioner;
pub mod persistence;
pub mod types;

pub use cache::LfuCache;
pub use catalog::Catalog;
pub use types::{Document, DocumentFields, StorageError};

#[cfg(test)]
mod tests;

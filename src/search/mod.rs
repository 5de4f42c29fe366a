//! Search Service Module
//!
//! Answers keyword queries over the files referenced by the catalog.
//!
//! ## Overview
//! A document matches a keyword when at least one line of its backing file
//! contains the keyword as a plain substring. Line counting is delegated to an
//! external grep-compatible helper run as a short-lived child process.
//!
//! ## Submodules
//! - **`engine`**: The line counter, serial search and result formatting.
//! - **`parallel`**: Fan-out search across worker tasks with ordered fan-in.
//! - **`types`**: Error and result types.

pub mod engine;
pub mod parallel;
pub mod types;

pub use engine::{LineCounter, format_keys, search};
pub use parallel::ParallelSearch;
pub use types::{ParallelOutcome, SearchError};

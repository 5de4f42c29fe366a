use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// On-disk widths of the text fields, terminator included.
pub const TITLE_WIDTH: usize = 200;
pub const AUTHORS_WIDTH: usize = 200;
pub const YEAR_WIDTH: usize = 5;
pub const PATH_WIDTH: usize = 64;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file {path} does not exist")]
    FileNotFound { path: String },

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("index I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt index: {0}")]
    Corrupt(String),
}

/// Metadata of one indexed file.
///
/// `path` is relative to the document root the server was started with.
/// Documents never change after the catalog issues their key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub key: u32,
    pub title: String,
    pub authors: String,
    pub year: String,
    pub path: String,
}

impl Document {
    pub fn resolve(&self, root: &Path) -> PathBuf {
        resolve(root, &self.path)
    }
}

/// The user-supplied part of a document, before a key is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFields {
    pub title: String,
    pub authors: String,
    pub year: String,
    pub path: String,
}

impl DocumentFields {
    pub fn new(
        title: impl Into<String>,
        authors: impl Into<String>,
        year: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            authors: authors.into(),
            year: year.into(),
            path: path.into(),
        }
    }

    /// Checks every field against the fixed record widths so that anything
    /// accepted here can be written to the index without truncation.
    pub fn validate(&self) -> Result<(), StorageError> {
        check_text("title", &self.title, TITLE_WIDTH)?;
        check_text("authors", &self.authors, AUTHORS_WIDTH)?;
        check_text("year", &self.year, YEAR_WIDTH)?;
        check_text("path", &self.path, PATH_WIDTH)?;

        if !self.year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StorageError::InvalidField {
                field: "year",
                reason: format!("'{}' is not a number", self.year),
            });
        }

        Ok(())
    }

    pub(crate) fn into_document(self, key: u32) -> Document {
        Document {
            key,
            title: self.title,
            authors: self.authors,
            year: self.year,
            path: self.path,
        }
    }
}

/// Joins a document path onto the root. A leading `/` does not escape the root.
pub fn resolve(root: &Path, relative: &str) -> PathBuf {
    root.join(relative.trim_start_matches('/'))
}

fn check_text(field: &'static str, value: &str, width: usize) -> Result<(), StorageError> {
    if value.is_empty() {
        return Err(StorageError::InvalidField {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    if value.len() >= width {
        return Err(StorageError::InvalidField {
            field,
            reason: format!("{} bytes exceeds the limit of {}", value.len(), width - 1),
        });
    }
    if value.as_bytes().contains(&0) {
        return Err(StorageError::InvalidField {
            field,
            reason: "contains a NUL byte".to_string(),
        });
    }
    Ok(())
}

use super::types::SearchError;
use crate::storage::Document;

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

pub const DEFAULT_LINE_COUNTER: &str = "grep";

/// Counts matching lines by running a grep-compatible helper as a child
/// process and reading its stdout through a pipe.
///
/// The keyword is a fixed string, never a pattern.
#[derive(Debug, Clone)]
pub struct LineCounter {
    program: String,
}

impl Default for LineCounter {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_COUNTER)
    }
}

impl LineCounter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Number of lines in `path` containing `keyword`.
    ///
    /// grep exits with 1 when nothing matched, which still counts as success.
    /// Launch failures and any other exit status are errors, never zero.
    pub async fn count(&self, path: &Path, keyword: &str) -> Result<u64, SearchError> {
        let output = Command::new(&self.program)
            .arg("-c")
            .arg("-F")
            .arg("-e")
            .arg(keyword)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| SearchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        match output.status.code() {
            Some(0) | Some(1) => {}
            _ => {
                return Err(SearchError::Helper {
                    status: output.status.to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .trim()
            .parse::<u64>()
            .map_err(|_| SearchError::Output(stdout.trim().to_string()))
    }
}

/// Keys of the documents whose file contains `keyword`, in the order given.
pub async fn search(
    counter: &LineCounter,
    root: &Path,
    documents: &[Document],
    keyword: &str,
) -> Result<Vec<u32>, SearchError> {
    let mut keys = Vec::new();

    for document in documents {
        let count = counter.count(&document.resolve(root), keyword).await?;
        tracing::trace!("Document {} has {} matching lines", document.key, count);
        if count > 0 {
            keys.push(document.key);
        }
    }

    Ok(keys)
}

/// Renders keys as `[1, 2, 3]`.
pub fn format_keys(keys: &[u32]) -> String {
    let joined = keys
        .iter()
        .map(|key| key.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", joined)
}

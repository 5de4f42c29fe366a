use super::types::{Document, DocumentFields, StorageError, resolve};

use std::collections::HashSet;
use std::path::Path;

/// Authoritative in-memory collection of document metadata.
///
/// Keys come from `next_key`, which only ever grows. Deleting a document does
/// not give its key back, so a key identifies at most one document for the
/// lifetime of the index.
#[derive(Debug, Clone)]
pub struct Catalog {
    documents: Vec<Document>,
    next_key: u32,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            documents: Vec::new(),
            next_key: 1,
        }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a catalog from persisted state.
    ///
    /// Rejects anything that would break key uniqueness or let `next_key`
    /// hand out a key that is already taken.
    pub fn from_parts(documents: Vec<Document>, next_key: u32) -> Result<Self, StorageError> {
        if next_key == 0 {
            return Err(StorageError::Corrupt("next_key must be positive".to_string()));
        }

        let mut seen = HashSet::with_capacity(documents.len());
        for doc in &documents {
            if doc.key == 0 {
                return Err(StorageError::Corrupt("document with key 0".to_string()));
            }
            if !seen.insert(doc.key) {
                return Err(StorageError::Corrupt(format!("duplicate key {}", doc.key)));
            }
            if doc.key >= next_key {
                return Err(StorageError::Corrupt(format!(
                    "key {} is not below next_key {}",
                    doc.key, next_key
                )));
            }
        }

        Ok(Self {
            documents,
            next_key,
        })
    }

    /// Stores a new document and returns its key.
    ///
    /// Only field bounds are checked; see [`Catalog::insert_checked`] for the
    /// variant that also requires the backing file to exist.
    pub fn insert(&mut self, fields: DocumentFields) -> Result<u32, StorageError> {
        fields.validate()?;

        let key = self.next_key;
        let next_key = key.checked_add(1).ok_or_else(|| StorageError::InvalidField {
            field: "key",
            reason: "key space exhausted".to_string(),
        })?;

        self.documents.push(fields.into_document(key));
        self.next_key = next_key;

        tracing::debug!("Indexed document {} ({} total)", key, self.documents.len());
        Ok(key)
    }

    pub fn insert_checked(
        &mut self,
        root: &Path,
        fields: DocumentFields,
    ) -> Result<u32, StorageError> {
        fields.validate()?;

        if !resolve(root, &fields.path).exists() {
            return Err(StorageError::FileNotFound { path: fields.path });
        }

        self.insert(fields)
    }

    pub fn lookup(&self, key: u32) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.key == key)
    }

    /// Removes a document. The last document takes the freed slot, so
    /// enumeration order is not stable across deletes.
    pub fn delete(&mut self, key: u32) -> Option<Document> {
        let position = self.documents.iter().position(|doc| doc.key == key)?;
        Some(self.documents.swap_remove(position))
    }

    pub fn all(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn next_key(&self) -> u32 {
        self.next_key
    }
}

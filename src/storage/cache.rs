//! Bounded lookup cache with least-frequently-used eviction.
//!
//! Entries are copies of catalog documents plus a usage counter. When the
//! cache is full, a new document overwrites the slot with the lowest counter
//! (the first such slot in scan order) and starts again at 1. Counters never
//! decay. Capacity is small and fixed at startup, so every operation is a
//! linear scan.

use super::types::Document;

#[derive(Debug, Clone)]
struct CacheEntry {
    document: Document,
    usage: u64,
}

#[derive(Debug)]
pub struct LfuCache {
    entries: Vec<CacheEntry>,
    capacity: usize,
}

impl LfuCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns the cached copy and counts the hit.
    pub fn get(&mut self, key: u32) -> Option<&Document> {
        let entry = self.entries.iter_mut().find(|e| e.document.key == key)?;
        entry.usage += 1;
        Some(&entry.document)
    }

    pub fn put(&mut self, document: Document) {
        if self.capacity == 0 {
            return;
        }

        // Documents are immutable, so a re-put only refreshes the copy.
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.document.key == document.key)
        {
            entry.document = document;
            return;
        }

        let entry = CacheEntry { document, usage: 1 };

        if self.entries.len() < self.capacity {
            self.entries.push(entry);
            return;
        }

        let mut victim = 0;
        for (index, candidate) in self.entries.iter().enumerate().skip(1) {
            if candidate.usage < self.entries[victim].usage {
                victim = index;
            }
        }

        tracing::debug!(
            "Cache full, evicting document {} (usage {})",
            self.entries[victim].document.key,
            self.entries[victim].usage
        );
        self.entries[victim] = entry;
    }

    /// Drops the entry for `key`, if cached. Returns whether anything was removed.
    pub fn invalidate(&mut self, key: u32) -> bool {
        match self.entries.iter().position(|e| e.document.key == key) {
            Some(position) => {
                self.entries.swap_remove(position);
                true
            }
            None => false,
        }
    }

    /// Resets the cache to the first `capacity` documents of `documents`.
    pub fn warm<'a>(&mut self, documents: impl IntoIterator<Item = &'a Document>) {
        self.entries.clear();
        for document in documents.into_iter().take(self.capacity) {
            self.put(document.clone());
        }
    }

    /// Usage counter of a cached document, without counting as a hit.
    pub fn usage(&self, key: u32) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.document.key == key)
            .map(|e| e.usage)
    }

    pub fn contains(&self, key: u32) -> bool {
        self.usage(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

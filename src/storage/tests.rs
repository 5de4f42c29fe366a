//! Storage Module Tests
//!
//! Validates the catalog, the LFU cache and the index file format.
//!
//! ## Test Scopes
//! - **Catalog**: Key allocation, file checks and deletion semantics.
//! - **Cache**: Capacity bound and the first-found minimum eviction rule.
//! - **Persistence**: Save/load round trips and rejection of damaged files.

#[cfg(test)]
mod tests {
    use crate::storage::cache::LfuCache;
    use crate::storage::catalog::Catalog;
    use crate::storage::persistence::{self, HEADER_SIZE, RECORD_SIZE};
    use crate::storage::types::{Document, DocumentFields, StorageError};
    use std::fs;
    use tempfile::TempDir;

    fn fields(title: &str, path: &str) -> DocumentFields {
        DocumentFields::new(title, "Some Author", "2020", path)
    }

    fn doc(key: u32) -> Document {
        Document {
            key,
            title: format!("Title {}", key),
            authors: "A".to_string(),
            year: "2001".to_string(),
            path: format!("doc{}.txt", key),
        }
    }

    // ============================================================
    // CATALOG TESTS
    // ============================================================

    #[test]
    fn test_keys_increase_and_are_never_reused() {
        let mut catalog = Catalog::new();

        let k1 = catalog.insert(fields("one", "a.txt")).unwrap();
        let k2 = catalog.insert(fields("two", "b.txt")).unwrap();
        assert_eq!((k1, k2), (1, 2));

        assert!(catalog.delete(k2).is_some());
        let k3 = catalog.insert(fields("three", "c.txt")).unwrap();
        assert_eq!(k3, 3, "Deleted keys must not be handed out again");

        assert!(catalog.delete(k1).is_some());
        assert!(catalog.delete(k3).is_some());
        assert!(catalog.is_empty());

        let k4 = catalog.insert(fields("four", "d.txt")).unwrap();
        assert_eq!(k4, 4);
        assert_eq!(catalog.next_key(), 5);
    }

    #[test]
    fn test_insert_checked_missing_file_changes_nothing() {
        let root = TempDir::new().unwrap();
        let mut catalog = Catalog::new();

        let result = catalog.insert_checked(root.path(), fields("ghost", "missing.txt"));

        assert!(matches!(result, Err(StorageError::FileNotFound { .. })));
        assert_eq!(catalog.len(), 0);
        assert_eq!(catalog.next_key(), 1);
    }

    #[test]
    fn test_insert_checked_existing_file() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("doc.txt"), "hello\n").unwrap();
        let mut catalog = Catalog::new();

        let key = catalog
            .insert_checked(root.path(), fields("T", "doc.txt"))
            .unwrap();

        let stored = catalog.lookup(key).unwrap();
        assert_eq!(stored.title, "T");
        assert_eq!(stored.path, "doc.txt");
    }

    #[test]
    fn test_insert_rejects_oversized_and_bad_fields() {
        let mut catalog = Catalog::new();

        let long_title = "x".repeat(200);
        assert!(catalog.insert(fields(&long_title, "a.txt")).is_err());
        assert!(catalog.insert(fields(&"x".repeat(199), "a.txt")).is_ok());

        let bad_year = DocumentFields::new("T", "A", "20x0", "a.txt");
        assert!(matches!(
            catalog.insert(bad_year),
            Err(StorageError::InvalidField { field: "year", .. })
        ));

        let long_year = DocumentFields::new("T", "A", "20201", "a.txt");
        assert!(catalog.insert(long_year).is_err());

        let empty_authors = DocumentFields::new("T", "", "2020", "a.txt");
        assert!(catalog.insert(empty_authors).is_err());

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.next_key(), 2);
    }

    #[test]
    fn test_delete_unknown_key() {
        let mut catalog = Catalog::new();
        catalog.insert(fields("one", "a.txt")).unwrap();

        assert!(catalog.delete(42).is_none());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_delete_moves_last_into_gap() {
        let mut catalog = Catalog::new();
        for i in 0..4 {
            catalog.insert(fields(&format!("d{}", i), "a.txt")).unwrap();
        }

        catalog.delete(2).unwrap();

        let keys: Vec<u32> = catalog.all().iter().map(|d| d.key).collect();
        assert_eq!(keys, vec![1, 4, 3]);
    }

    #[test]
    fn test_from_parts_validation() {
        assert!(Catalog::from_parts(vec![doc(1), doc(2)], 3).is_ok());

        assert!(matches!(
            Catalog::from_parts(vec![doc(1), doc(1)], 3),
            Err(StorageError::Corrupt(_))
        ));
        assert!(Catalog::from_parts(vec![doc(5)], 5).is_err());
        assert!(Catalog::from_parts(vec![], 0).is_err());
        assert!(Catalog::from_parts(vec![doc(0)], 3).is_err());
    }

    // ============================================================
    // CACHE TESTS
    // ============================================================

    #[test]
    fn test_cache_hit_increments_usage() {
        let mut cache = LfuCache::new(2);
        cache.put(doc(1));

        assert_eq!(cache.usage(1), Some(1));
        assert_eq!(cache.get(1).map(|d| d.key), Some(1));
        assert_eq!(cache.get(1).map(|d| d.key), Some(1));
        assert_eq!(cache.usage(1), Some(3));

        assert!(cache.get(9).is_none());
    }

    #[test]
    fn test_cache_never_exceeds_capacity() {
        let mut cache = LfuCache::new(3);
        for key in 1..=10 {
            cache.put(doc(key));
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_cache_tie_evicts_first_found() {
        let mut cache = LfuCache::new(2);
        cache.put(doc(1));
        cache.put(doc(2));

        cache.put(doc(3));

        assert!(!cache.contains(1), "K1 is the first minimum in scan order");
        assert!(cache.contains(2));
        assert!(cache.contains(3));
    }

    #[test]
    fn test_cache_evicts_least_used() {
        let mut cache = LfuCache::new(3);
        cache.put(doc(1));
        cache.put(doc(2));
        cache.put(doc(3));

        cache.get(1);
        cache.get(1);
        cache.get(3);

        cache.put(doc(4));

        assert!(cache.contains(1));
        assert!(!cache.contains(2));
        assert!(cache.contains(3));
        assert_eq!(cache.usage(4), Some(1), "Replacement starts from scratch");
    }

    #[test]
    fn test_cache_new_entry_can_be_evicted_next() {
        let mut cache = LfuCache::new(2);
        cache.put(doc(1));
        cache.put(doc(2));
        cache.get(1);
        cache.get(2);

        cache.put(doc(3));
        // 3 now has the lowest count and loses to the next insert.
        cache.put(doc(4));

        assert!(!cache.contains(3));
        assert!(cache.contains(4));
    }

    #[test]
    fn test_cache_invalidate() {
        let mut cache = LfuCache::new(3);
        cache.put(doc(1));
        cache.put(doc(2));
        cache.put(doc(3));

        assert!(cache.invalidate(1));
        assert!(!cache.invalidate(1));
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(2));
        assert!(cache.contains(3));

        // Freed slot is reused without eviction.
        cache.put(doc(4));
        assert_eq!(cache.len(), 3);
        assert!(cache.contains(2));
    }

    #[test]
    fn test_cache_zero_capacity() {
        let mut cache = LfuCache::new(0);
        cache.put(doc(1));
        assert!(cache.is_empty());
        assert!(cache.get(1).is_none());
    }

    #[test]
    fn test_cache_warm_takes_prefix() {
        let mut cache = LfuCache::new(2);
        cache.put(doc(9));

        let docs = vec![doc(1), doc(2), doc(3)];
        cache.warm(&docs);

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(1));
        assert!(cache.contains(2));
        assert!(!cache.contains(9));
    }

    // ============================================================
    // PERSISTENCE TESTS
    // ============================================================

    #[test]
    fn test_record_size_matches_c_layout() {
        assert_eq!(RECORD_SIZE, 476);
    }

    #[test]
    fn test_load_missing_index_is_empty() {
        let root = TempDir::new().unwrap();
        let catalog = persistence::load(root.path()).unwrap();

        assert!(catalog.is_empty());
        assert_eq!(catalog.next_key(), 1);
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let root = TempDir::new().unwrap();
        let mut catalog = Catalog::new();
        catalog
            .insert(DocumentFields::new("Os Lusíadas", "Luís de Camões", "1572", "lusiadas.txt"))
            .unwrap();
        catalog
            .insert(DocumentFields::new("Mensagem", "Fernando Pessoa", "1934", "sub/mensagem.txt"))
            .unwrap();
        catalog
            .insert(DocumentFields::new("Dropped", "Nobody", "1", "x.txt"))
            .unwrap();
        catalog.delete(3);

        persistence::save(root.path(), &catalog).unwrap();

        let bytes = fs::read(persistence::index_path(root.path())).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + 2 * RECORD_SIZE);

        let loaded = persistence::load(root.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.next_key(), 4);
        assert_eq!(loaded.all(), catalog.all());
    }

    #[test]
    fn test_save_overwrites_previous_index() {
        let root = TempDir::new().unwrap();
        let mut catalog = Catalog::new();
        catalog.insert(fields("one", "a.txt")).unwrap();
        catalog.insert(fields("two", "b.txt")).unwrap();
        persistence::save(root.path(), &catalog).unwrap();

        catalog.delete(1);
        persistence::save(root.path(), &catalog).unwrap();

        let loaded = persistence::load(root.path()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.lookup(2).unwrap().title, "two");
        assert!(!root.path().join("index.dat.tmp").exists());
    }

    #[test]
    fn test_failed_save_removes_temp_file() {
        let root = TempDir::new().unwrap();
        let mut catalog = Catalog::new();
        catalog.insert(fields("one", "a.txt")).unwrap();

        // A directory in place of the index makes the final rename fail.
        fs::create_dir(persistence::index_path(root.path())).unwrap();
        fs::write(persistence::index_path(root.path()).join("keep"), b"x").unwrap();

        let result = persistence::save(root.path(), &catalog);

        assert!(matches!(result, Err(StorageError::Io(_))));
        assert!(!root.path().join("index.dat.tmp").exists());
    }

    #[test]
    fn test_load_rejects_truncated_header() {
        let root = TempDir::new().unwrap();
        fs::write(persistence::index_path(root.path()), [1u8, 0, 0]).unwrap();

        assert!(matches!(
            persistence::load(root.path()),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn test_load_rejects_short_records() {
        let root = TempDir::new().unwrap();
        let mut catalog = Catalog::new();
        catalog.insert(fields("one", "a.txt")).unwrap();
        persistence::save(root.path(), &catalog).unwrap();

        let path = persistence::index_path(root.path());
        let mut bytes = fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 10);
        fs::write(&path, bytes).unwrap();

        let err = persistence::load(root.path()).unwrap_err();
        assert!(err.to_string().contains("short read"), "got: {}", err);
    }

    #[test]
    fn test_load_rejects_trailing_bytes_and_negative_count() {
        let root = TempDir::new().unwrap();
        let path = persistence::index_path(root.path());

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(b"junk");
        fs::write(&path, &bytes).unwrap();
        assert!(persistence::load(root.path()).is_err());

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(-1i32).to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes());
        fs::write(&path, &bytes).unwrap();
        assert!(persistence::load(root.path()).is_err());
    }

    #[test]
    fn test_record_layout_offsets() {
        let record = persistence::encode_record(&doc(7)).unwrap();

        assert_eq!(&record[0..4], &7i32.to_le_bytes());
        assert_eq!(&record[4..11], b"Title 7");
        assert_eq!(record[11], 0);
        assert_eq!(&record[404..408], b"2001");
        assert_eq!(&record[409..417], b"doc7.txt");
        assert_eq!(&record[473..476], &[0, 0, 0]);

        assert_eq!(persistence::decode_record(&record).unwrap(), doc(7));
    }
}

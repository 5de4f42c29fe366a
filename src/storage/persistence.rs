//! Index file format and whole-catalog load/save.
//!
//! ```text
//! [i32 document_count][i32 next_key][document_count x record]
//!
//! record (476 bytes):
//!   0    i32 key
//!   4    title    [200]
//!   204  authors  [200]
//!   404  year     [5]
//!   409  path     [64]
//!   473  padding  [3]
//! ```
//!
//! Integers are little-endian, text fields are UTF-8 padded with NUL bytes.
//! Records mirror the layout of the C `Document` struct on LP64 targets, so
//! index files written by the older server load unchanged.

use super::catalog::Catalog;
use super::types::{AUTHORS_WIDTH, Document, PATH_WIDTH, StorageError, TITLE_WIDTH, YEAR_WIDTH};

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

pub const INDEX_FILE: &str = "index.dat";
pub const HEADER_SIZE: usize = 8;

const KEY_OFFSET: usize = 0;
const TITLE_OFFSET: usize = KEY_OFFSET + 4;
const AUTHORS_OFFSET: usize = TITLE_OFFSET + TITLE_WIDTH;
const YEAR_OFFSET: usize = AUTHORS_OFFSET + AUTHORS_WIDTH;
const PATH_OFFSET: usize = YEAR_OFFSET + YEAR_WIDTH;
const PADDING: usize = 3;

pub const RECORD_SIZE: usize = PATH_OFFSET + PATH_WIDTH + PADDING;

pub fn index_path(root: &Path) -> PathBuf {
    root.join(INDEX_FILE)
}

/// Loads the catalog stored under `root`.
///
/// A missing index file means a fresh root and yields an empty catalog.
/// Anything else that does not parse exactly is an error; there is no
/// partial recovery.
pub fn load(root: &Path) -> Result<Catalog, StorageError> {
    let path = index_path(root);

    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!("No index at {}, starting empty", path.display());
            return Ok(Catalog::new());
        }
        Err(e) => return Err(e.into()),
    };

    if bytes.len() < HEADER_SIZE {
        return Err(StorageError::Corrupt(format!(
            "header truncated: {} of {} bytes",
            bytes.len(),
            HEADER_SIZE
        )));
    }

    let count = read_i32(&bytes, 0);
    let next_key = read_i32(&bytes, 4);

    let count = usize::try_from(count)
        .map_err(|_| StorageError::Corrupt(format!("negative document count {}", count)))?;
    let next_key = u32::try_from(next_key)
        .map_err(|_| StorageError::Corrupt(format!("negative next_key {}", next_key)))?;

    let expected = count
        .checked_mul(RECORD_SIZE)
        .and_then(|n| n.checked_add(HEADER_SIZE))
        .ok_or_else(|| StorageError::Corrupt(format!("document count {} overflows", count)))?;

    if bytes.len() < expected {
        return Err(StorageError::Corrupt(format!(
            "short read: {} of {} bytes for {} documents",
            bytes.len(),
            expected,
            count
        )));
    }
    if bytes.len() > expected {
        return Err(StorageError::Corrupt(format!(
            "{} trailing bytes after {} documents",
            bytes.len() - expected,
            count
        )));
    }

    let documents = bytes[HEADER_SIZE..]
        .chunks_exact(RECORD_SIZE)
        .map(decode_record)
        .collect::<Result<Vec<_>, _>>()?;

    let catalog = Catalog::from_parts(documents, next_key)?;
    tracing::info!(
        "Loaded {} documents from {} (next key {})",
        catalog.len(),
        path.display(),
        catalog.next_key()
    );
    Ok(catalog)
}

/// Rewrites the whole index file.
///
/// The new contents go to a sibling temp file that is synced and renamed over
/// the old index, so a crash mid-save leaves the previous version intact.
pub fn save(root: &Path, catalog: &Catalog) -> Result<(), StorageError> {
    let path = index_path(root);
    let tmp_path = root.join(format!("{}.tmp", INDEX_FILE));

    let count = i32::try_from(catalog.len())
        .map_err(|_| StorageError::Corrupt(format!("{} documents do not fit", catalog.len())))?;
    let next_key = i32::try_from(catalog.next_key())
        .map_err(|_| StorageError::Corrupt(format!("next_key {} does not fit", catalog.next_key())))?;

    let written = write_index(&tmp_path, catalog, count, next_key)
        .and_then(|()| fs::rename(&tmp_path, &path).map_err(StorageError::from));

    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(&tmp_path)
            && cleanup.kind() != ErrorKind::NotFound
        {
            tracing::warn!("Failed to remove {}: {}", tmp_path.display(), cleanup);
        }
        return Err(e);
    }

    tracing::debug!("Saved {} documents to {}", catalog.len(), path.display());
    Ok(())
}

fn write_index(
    tmp_path: &Path,
    catalog: &Catalog,
    count: i32,
    next_key: i32,
) -> Result<(), StorageError> {
    let file = File::create(tmp_path)?;
    let mut writer = BufWriter::new(file);

    writer.write_all(&count.to_le_bytes())?;
    writer.write_all(&next_key.to_le_bytes())?;
    for document in catalog.all() {
        writer.write_all(&encode_record(document)?)?;
    }

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

pub fn encode_record(document: &Document) -> Result<[u8; RECORD_SIZE], StorageError> {
    let key = i32::try_from(document.key)
        .map_err(|_| StorageError::Corrupt(format!("key {} does not fit", document.key)))?;

    let mut record = [0u8; RECORD_SIZE];
    record[KEY_OFFSET..TITLE_OFFSET].copy_from_slice(&key.to_le_bytes());
    write_text(&mut record, TITLE_OFFSET, TITLE_WIDTH, "title", &document.title)?;
    write_text(&mut record, AUTHORS_OFFSET, AUTHORS_WIDTH, "authors", &document.authors)?;
    write_text(&mut record, YEAR_OFFSET, YEAR_WIDTH, "year", &document.year)?;
    write_text(&mut record, PATH_OFFSET, PATH_WIDTH, "path", &document.path)?;
    Ok(record)
}

pub fn decode_record(record: &[u8]) -> Result<Document, StorageError> {
    if record.len() != RECORD_SIZE {
        return Err(StorageError::Corrupt(format!(
            "record is {} bytes, expected {}",
            record.len(),
            RECORD_SIZE
        )));
    }

    let key = read_i32(record, KEY_OFFSET);
    let key = u32::try_from(key)
        .ok()
        .filter(|k| *k > 0)
        .ok_or_else(|| StorageError::Corrupt(format!("invalid key {}", key)))?;

    Ok(Document {
        key,
        title: read_text(record, TITLE_OFFSET, TITLE_WIDTH, "title")?,
        authors: read_text(record, AUTHORS_OFFSET, AUTHORS_WIDTH, "authors")?,
        year: read_text(record, YEAR_OFFSET, YEAR_WIDTH, "year")?,
        path: read_text(record, PATH_OFFSET, PATH_WIDTH, "path")?,
    })
}

fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    i32::from_le_bytes(raw)
}

fn write_text(
    record: &mut [u8],
    offset: usize,
    width: usize,
    field: &'static str,
    value: &str,
) -> Result<(), StorageError> {
    // One byte is always left for the terminator.
    if value.len() >= width {
        return Err(StorageError::InvalidField {
            field,
            reason: format!("{} bytes exceeds the limit of {}", value.len(), width - 1),
        });
    }
    record[offset..offset + value.len()].copy_from_slice(value.as_bytes());
    Ok(())
}

fn read_text(
    record: &[u8],
    offset: usize,
    width: usize,
    field: &'static str,
) -> Result<String, StorageError> {
    let raw = &record[offset..offset + width];
    let end = raw.iter().position(|b| *b == 0).unwrap_or(width);
    String::from_utf8(raw[..end].to_vec())
        .map_err(|_| StorageError::Corrupt(format!("{} is not valid UTF-8", field)))
}

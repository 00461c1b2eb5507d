//! The persistence port: a small key/value store with fixed-capacity slots.
//!
//! Each numeric key addresses one value of at most [`page_size`] bytes.
//! Values larger than a page must be split across consecutive keys by the
//! caller, as the string table's paged load/store does. Blob writes are
//! silently truncated at the page boundary and report the byte count
//! actually written, so callers detect a short write by comparing counts.
//!
//! [`page_size`]: PersistStore::page_size

use std::collections::BTreeMap;

use crate::constants::PERSIST_PAGE_SIZE;
use crate::error::{LifelogError, Result};

/// Key/value persistence with page-capped slots.
///
/// All operations are synchronous and complete before returning; the cost
/// of a call directly bounds the latency of whatever callback issued it.
pub trait PersistStore {
    /// Capacity of a single slot, in bytes.
    fn page_size(&self) -> usize {
        PERSIST_PAGE_SIZE
    }

    /// Copy the blob stored under `key` into `buf`, returning the number of
    /// bytes copied (`min(stored, buf.len())`). An absent key is an error.
    fn read(&self, key: u32, buf: &mut [u8]) -> Result<usize>;

    /// Store `data` under `key`, truncated to the page size. Returns the
    /// number of bytes actually written.
    fn write(&mut self, key: u32, data: &[u8]) -> Result<usize>;

    /// Integer stored under `key`, if any.
    fn read_int(&self, key: u32) -> Option<i32>;

    fn write_int(&mut self, key: u32, value: i32) -> Result<()>;

    /// Text stored under `key`, truncated to `max_len` bytes, if any.
    fn read_string(&self, key: u32, max_len: usize) -> Option<String>;

    fn write_string(&mut self, key: u32, value: &str) -> Result<()>;

    /// Remove `key`; reports whether a value was present.
    fn delete(&mut self, key: u32) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Bytes(Vec<u8>),
    Int(i32),
    Text(String),
}

/// In-memory [`PersistStore`] used by tests and desktop hosts.
///
/// Honors the page cap on blob writes so short-write handling is exercised
/// the same way it would be against device storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: BTreeMap<u32, Slot>,
    page_size: usize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_page_size(PERSIST_PAGE_SIZE)
    }

    /// A store with a non-default slot capacity. Useful for forcing
    /// page-boundary and short-write paths in tests.
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            slots: BTreeMap::new(),
            page_size,
        }
    }

    /// Number of occupied keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl PersistStore for MemoryStore {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn read(&self, key: u32, buf: &mut [u8]) -> Result<usize> {
        match self.slots.get(&key) {
            Some(Slot::Bytes(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            _ => Err(LifelogError::MissingKey { key }),
        }
    }

    fn write(&mut self, key: u32, data: &[u8]) -> Result<usize> {
        let n = data.len().min(self.page_size);
        self.slots.insert(key, Slot::Bytes(data[..n].to_vec()));
        Ok(n)
    }

    fn read_int(&self, key: u32) -> Option<i32> {
        match self.slots.get(&key) {
            Some(Slot::Int(value)) => Some(*value),
            _ => None,
        }
    }

    fn write_int(&mut self, key: u32, value: i32) -> Result<()> {
        self.slots.insert(key, Slot::Int(value));
        Ok(())
    }

    fn read_string(&self, key: u32, max_len: usize) -> Option<String> {
        match self.slots.get(&key) {
            Some(Slot::Text(value)) => {
                let mut end = value.len().min(max_len);
                while !value.is_char_boundary(end) {
                    end -= 1;
                }
                Some(value[..end].to_string())
            }
            _ => None,
        }
    }

    fn write_string(&mut self, key: u32, value: &str) -> Result<()> {
        self.slots.insert(key, Slot::Text(value.to_string()));
        Ok(())
    }

    fn delete(&mut self, key: u32) -> bool {
        self.slots.remove(&key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_roundtrip_and_partial_read() {
        let mut store = MemoryStore::new();
        let written = store.write(7, b"hello world").expect("write");
        assert_eq!(written, 11);

        let mut buf = [0u8; 16];
        let read = store.read(7, &mut buf).expect("read");
        assert_eq!(&buf[..read], b"hello world");

        let mut small = [0u8; 5];
        let read = store.read(7, &mut small).expect("short read");
        assert_eq!(read, 5);
        assert_eq!(&small, b"hello");
    }

    #[test]
    fn write_truncates_at_page_size() {
        let mut store = MemoryStore::with_page_size(4);
        let written = store.write(1, b"abcdef").expect("write");
        assert_eq!(written, 4);

        let mut buf = [0u8; 8];
        let read = store.read(1, &mut buf).expect("read");
        assert_eq!(&buf[..read], b"abcd");
    }

    #[test]
    fn absent_key_is_an_error_for_blobs_and_none_for_typed_reads() {
        let store = MemoryStore::new();
        let mut buf = [0u8; 4];
        assert!(matches!(
            store.read(99, &mut buf),
            Err(LifelogError::MissingKey { key: 99 })
        ));
        assert_eq!(store.read_int(99), None);
        assert_eq!(store.read_string(99, 32), None);
    }

    #[test]
    fn typed_slots_do_not_alias_blob_slots() {
        let mut store = MemoryStore::new();
        store.write_int(5, -3).expect("int");
        let mut buf = [0u8; 4];
        assert!(store.read(5, &mut buf).is_err());
        assert_eq!(store.read_int(5), Some(-3));

        store.write_string(5, "übergang").expect("text");
        assert_eq!(store.read_int(5), None);
        // truncation lands on a char boundary
        assert_eq!(store.read_string(5, 3).as_deref(), Some("üb"));
    }

    #[test]
    fn delete_reports_presence() {
        let mut store = MemoryStore::new();
        store.write_int(1, 1).expect("int");
        assert!(store.delete(1));
        assert!(!store.delete(1));
    }
}

//! Variable-length string table with stable integer indices.
//!
//! One contiguous arena buffer holds every string back-to-back, each
//! terminated by a NUL byte, with a parallel index of byte offsets in
//! insertion order. The buffer always starts with a single terminator so
//! offset 0 is a valid empty string. Append-only until reset; indexed
//! lookup is O(1) and the paged serialization is the flat buffer itself.

use tracing::debug;

use crate::bus::{Dictionary, Field};
use crate::constants::STRLIST_MAX_ENTRIES;
use crate::error::{LifelogError, Result};
use crate::store::PersistStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringTable {
    data: Vec<u8>,
    offsets: Vec<u16>,
    capacity: usize,
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StringTable {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(STRLIST_MAX_ENTRIES)
    }

    /// A table that refuses appends once `capacity - 1` entries are held.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0],
            offsets: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Number of stored strings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Size of the arena buffer in bytes, terminators included.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// The `index`-th string as raw bytes, without its terminator.
    #[must_use]
    pub fn get_bytes(&self, index: usize) -> Option<&[u8]> {
        let start = usize::from(*self.offsets.get(index)?);
        let tail = &self.data[start..];
        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        Some(&tail[..end])
    }

    /// The `index`-th string. Arena contents are validated UTF-8, both on
    /// append and on load.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.get_bytes(index)
            .map(|bytes| std::str::from_utf8(bytes).unwrap_or_default())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    /// Append `value`, assigning it the next index.
    ///
    /// Fails without mutating when the table is at capacity or the string
    /// carries an embedded NUL. The empty string is stored as offset 0 and
    /// occupies no arena bytes.
    pub fn append(&mut self, value: &str) -> Result<()> {
        if self.offsets.len() + 1 >= self.capacity {
            return Err(LifelogError::CapacityExceeded {
                limit: self.capacity,
            });
        }
        if value.as_bytes().contains(&0) {
            return Err(LifelogError::EmbeddedNul);
        }

        if value.is_empty() {
            self.offsets.push(0);
            return Ok(());
        }

        // Offsets are 16-bit in the serialized layout's index.
        let new_size = self.data.len() + value.len() + 1;
        if new_size > usize::from(u16::MAX) {
            return Err(LifelogError::CapacityExceeded {
                limit: usize::from(u16::MAX),
            });
        }

        self.offsets.push(self.data.len() as u16);
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
        Ok(())
    }

    /// Drop every entry, shrinking the arena back to its single terminator.
    pub fn reset(&mut self) {
        self.data.clear();
        self.data.push(0);
        self.data.shrink_to(1);
        self.offsets.clear();
    }

    /// Persist the table: the arena size as an integer under `first_key`,
    /// then the arena split into page-sized chunks at `first_key + 1, + 2, …`.
    pub fn store<S: PersistStore>(&self, store: &mut S, first_key: u32) -> Result<()> {
        let size = self.data.len();
        store.write_int(first_key, size as i32)?;

        let page = store.page_size();
        for (i, chunk) in self.data.chunks(page).enumerate() {
            let key = first_key + 1 + i as u32;
            let written = store.write(key, chunk)?;
            if written < chunk.len() {
                return Err(LifelogError::ShortWrite {
                    key,
                    expected: chunk.len(),
                    actual: written,
                });
            }
        }
        Ok(())
    }

    /// Restore a table previously written by [`store`](Self::store).
    ///
    /// A missing or non-positive size means "no data": the table is reset
    /// and the load succeeds. Any short page, malformed buffer (first or
    /// last byte not a terminator, non-UTF-8 contents) or over-capacity
    /// entry count aborts the load and leaves the table unchanged.
    pub fn load<S: PersistStore>(&mut self, store: &S, first_key: u32) -> Result<()> {
        let size = match store.read_int(first_key) {
            Some(size) if size > 0 => size as usize,
            _ => {
                self.reset();
                return Ok(());
            }
        };
        // Offsets are 16-bit; append enforces the same bound.
        if size > usize::from(u16::MAX) {
            return Err(LifelogError::CorruptTable {
                key: first_key,
                reason: "buffer size exceeds the 16-bit offset range",
            });
        }

        let mut buf = vec![0u8; size];
        let page = store.page_size();
        let mut offset = 0;
        let mut key = first_key + 1;
        while offset < size {
            let end = (offset + page).min(size);
            let want = end - offset;
            let got = store.read(key, &mut buf[offset..end])?;
            if got < want {
                return Err(LifelogError::ShortRead {
                    key,
                    expected: want,
                    actual: got,
                });
            }
            offset = end;
            key += 1;
        }

        if buf[0] != 0 || buf[size - 1] != 0 {
            return Err(LifelogError::CorruptTable {
                key: first_key,
                reason: "buffer not terminator-delimited",
            });
        }
        if std::str::from_utf8(&buf).is_err() {
            return Err(LifelogError::CorruptTable {
                key: first_key,
                reason: "buffer is not valid UTF-8",
            });
        }

        // Offset i is the position right after the i-th terminator.
        let mut offsets = Vec::new();
        for (pos, &byte) in buf.iter().enumerate() {
            if byte == 0 && pos + 1 < size {
                offsets.push((pos + 1) as u16);
            }
        }
        if offsets.len() + 1 > self.capacity {
            return Err(LifelogError::CorruptTable {
                key: first_key,
                reason: "entry count exceeds table capacity",
            });
        }

        self.data = buf;
        self.offsets = offsets;
        Ok(())
    }

    /// Replace the contents with string fields `first_field .. first_field
    /// + count` of an inbound dictionary. Absent or wrong-typed fields are
    /// skipped; a declared count beyond capacity is clamped.
    pub fn fill_from_dict(
        &mut self,
        dict: &Dictionary,
        first_field: u32,
        count: u8,
    ) -> Result<()> {
        self.reset();

        let mut count = usize::from(count);
        if count >= self.capacity {
            count = self.capacity - 1;
        }

        for i in 0..count as u32 {
            match dict.get(first_field + i) {
                Some(Field::Str(value)) => self.append(value)?,
                Some(other) => {
                    debug!(
                        field = first_field + i,
                        kind = other.kind(),
                        "skipping non-string catalog field"
                    );
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Move the most recently appended offset to position `index`, shifting
    /// the offsets in between up by one slot. Entry indices after `index`
    /// all grow by one; the arena is untouched.
    pub(crate) fn reinsert_last_at(&mut self, index: usize) {
        if let Some(offset) = self.offsets.pop() {
            self.offsets.insert(index, offset);
        }
    }
}

//! Sorted string set built on [`StringTable`].
//!
//! Entries are kept in strictly ascending byte order so lookups and
//! insertions are a binary search. A proper prefix sorts before any string
//! it prefixes, which gives directory-style nesting a total order
//! (`"a"` before `"a/b"`). Used to intern hierarchical name prefixes so
//! repeated prefixes collapse to one entry.

use std::cmp::Ordering;

use crate::error::Result;
use crate::strlist::StringTable;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringSet {
    table: StringTable,
}

impl StringSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: StringTable::new(),
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: StringTable::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// The entry at sorted position `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.table.get(index)
    }

    /// The backing table, in sorted order.
    #[must_use]
    pub fn as_table(&self) -> &StringTable {
        &self.table
    }

    pub fn reset(&mut self) {
        self.table.reset();
    }

    /// Binary search for `needle`: `Ok(index)` on an exact match,
    /// `Err(insertion_point)` otherwise.
    fn locate(&self, needle: &[u8]) -> std::result::Result<usize, usize> {
        let mut low = 0;
        let mut high = self.table.len();
        while low < high {
            let mid = low + (high - low) / 2;
            let item = self.table.get_bytes(mid).unwrap_or_default();
            match needle.cmp(item) {
                Ordering::Equal => return Ok(mid),
                Ordering::Less => high = mid,
                Ordering::Greater => low = mid + 1,
            }
        }
        Err(low)
    }

    /// Sorted index of `value`, if present. Never mutates.
    #[must_use]
    pub fn find(&self, value: &str) -> Option<usize> {
        self.locate(value.as_bytes()).ok()
    }

    /// Sorted index of `value`, inserting it first when absent.
    ///
    /// The underlying append lands at the tail of the offset index; the
    /// offsets between the insertion point and the tail are then shifted by
    /// one slot to re-establish sort order. Indices of entries sorting
    /// after `value` grow by one.
    pub fn find_or_insert(&mut self, value: &str) -> Result<usize> {
        match self.locate(value.as_bytes()) {
            Ok(index) => Ok(index),
            Err(index) => {
                self.table.append(value)?;
                if index < self.table.len() - 1 {
                    self.table.reinsert_last_at(index);
                }
                Ok(index)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LifelogError;

    fn contents(set: &StringSet) -> Vec<&str> {
        (0..set.len()).filter_map(|i| set.get(i)).collect()
    }

    #[test]
    fn insertions_maintain_sorted_order() {
        let mut set = StringSet::new();
        for value in ["pear", "apple", "orange", "banana", "apple"] {
            set.find_or_insert(value).expect("insert");
        }
        assert_eq!(contents(&set), ["apple", "banana", "orange", "pear"]);
    }

    #[test]
    fn reinsertion_returns_same_index_without_growth() {
        let mut set = StringSet::new();
        let first = set.find_or_insert("home").expect("insert");
        let len = set.len();
        let again = set.find_or_insert("home").expect("reinsert");
        assert_eq!(first, again);
        assert_eq!(set.len(), len);
    }

    #[test]
    fn proper_prefix_sorts_before_longer_string() {
        let mut set = StringSet::new();
        set.find_or_insert("a/b").expect("insert");
        set.find_or_insert("a").expect("insert");
        set.find_or_insert("a/b/c").expect("insert");
        assert_eq!(contents(&set), ["a", "a/b", "a/b/c"]);
        assert_eq!(set.find("a"), Some(0));
        assert_eq!(set.find("a/b"), Some(1));
    }

    #[test]
    fn find_misses_without_mutating() {
        let mut set = StringSet::new();
        set.find_or_insert("known").expect("insert");
        assert_eq!(set.find("unknown"), None);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn capacity_error_propagates() {
        let mut set = StringSet::with_capacity(2);
        set.find_or_insert("only").expect("insert");
        let err = set.find_or_insert("more").expect_err("full");
        assert!(matches!(err, LifelogError::CapacityExceeded { .. }));
    }

    #[test]
    fn randomized_insertions_equal_sorted_unique() {
        let values = [
            "kitchen/stove",
            "kitchen",
            "garden",
            "kitchen/sink",
            "garden",
            "attic",
            "kitchen",
        ];
        let mut set = StringSet::new();
        for value in values {
            let index = set.find_or_insert(value).expect("insert");
            assert_eq!(set.get(index), Some(value));
        }

        let mut expected: Vec<&str> = values.to_vec();
        expected.sort_unstable();
        expected.dedup();
        assert_eq!(contents(&set), expected);
    }
}

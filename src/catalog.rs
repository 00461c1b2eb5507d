//! Event catalog: the ordered list of configured event names, the derived
//! begin/end label tables, and the wire-id codec.
//!
//! Name encoding: a leading `'-'` marks a disabled entry, a leading `'+'`
//! marks a long (begin/end-pairable) event, anything else is a short
//! one-shot event. Stripping the sigil yields the display title.
//!
//! Every catalog change recomputes the derived state in full: the k-th
//! `'+'` entry in catalog order gets dense long-event id k, and its begin
//! and end labels (`prefix + title`) land at index `k - 1` of the derived
//! tables. Stale ids are never reused across a replacement.

use tracing::error;

use crate::bus::Dictionary;
use crate::constants::{
    CATALOG_MAX_ENTRIES, KEY_BEGIN_PREFIX, KEY_END_PREFIX, KEY_EVENT_NAMES, PREFIX_MAX_BYTES,
    STRLIST_MAX_ENTRIES,
};
use crate::error::Result;
use crate::store::PersistStore;
use crate::strlist::StringTable;
use crate::strset::StringSet;

/// A recorded event in tagged form. The 1-byte wire encoding conflates the
/// catalog index with begin/end polarity; this type keeps them apart
/// everywhere except the persistence and message boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRef {
    /// One-shot event at the given catalog index.
    Short(u8),
    /// Opening occurrence of the long event at the given catalog index.
    Begin(u8),
    /// Closing occurrence of the long event at the given catalog index.
    End(u8),
}

impl EventRef {
    /// The catalog index this event addresses.
    #[must_use]
    pub fn index(self) -> u8 {
        match self {
            EventRef::Short(k) | EventRef::Begin(k) | EventRef::End(k) => k,
        }
    }

    /// The 1-byte wire form: `index + 1` for short events and opening
    /// occurrences, `index + 129` for closing occurrences. 0 is reserved.
    #[must_use]
    pub fn wire(self) -> u8 {
        match self {
            EventRef::Short(k) | EventRef::Begin(k) => k + 1,
            EventRef::End(k) => k + 129,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    names: StringTable,
    begins: StringTable,
    ends: StringTable,
    prefixes: StringSet,
    long_event_id: Vec<u8>,
    long_event_count: u8,
    begin_prefix: String,
    end_prefix: String,
    separator: String,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(STRLIST_MAX_ENTRIES)
    }

    /// A catalog backed by tables of the given capacity. The capacity is
    /// clamped so the entry count can never exceed [`CATALOG_MAX_ENTRIES`];
    /// the wire id byte cannot address more.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.min(CATALOG_MAX_ENTRIES + 1);
        Self {
            names: StringTable::with_capacity(capacity),
            begins: StringTable::with_capacity(capacity),
            ends: StringTable::with_capacity(capacity),
            prefixes: StringSet::with_capacity(capacity),
            long_event_id: Vec::new(),
            long_event_count: 0,
            begin_prefix: crate::constants::DEFAULT_BEGIN_PREFIX.to_string(),
            end_prefix: crate::constants::DEFAULT_END_PREFIX.to_string(),
            separator: String::new(),
        }
    }

    /// Number of catalog entries, disabled ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The raw configured name, sigil included.
    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index)
    }

    /// The display title: the name with any leading sigil stripped.
    #[must_use]
    pub fn title(&self, index: usize) -> Option<&str> {
        self.names
            .get(index)
            .map(|name| name.strip_prefix(['+', '-']).unwrap_or(name))
    }

    /// Whether the entry is shown at all (no leading `'-'`).
    #[must_use]
    pub fn is_active(&self, index: usize) -> bool {
        self.names
            .get(index)
            .is_some_and(|name| !name.starts_with('-'))
    }

    /// Dense 1-based long-event id, or 0 when the entry is not a long event.
    #[must_use]
    pub fn long_id(&self, index: usize) -> u8 {
        self.long_event_id.get(index).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_long(&self, index: usize) -> bool {
        self.long_id(index) != 0
    }

    /// Number of long events in the catalog.
    #[must_use]
    pub fn long_event_count(&self) -> u8 {
        self.long_event_count
    }

    /// Begin label of the long event with the given 1-based id.
    #[must_use]
    pub fn begin_label(&self, long_id: u8) -> Option<&str> {
        if long_id == 0 {
            return None;
        }
        self.begins.get(usize::from(long_id) - 1)
    }

    /// End label of the long event with the given 1-based id.
    #[must_use]
    pub fn end_label(&self, long_id: u8) -> Option<&str> {
        if long_id == 0 {
            return None;
        }
        self.ends.get(usize::from(long_id) - 1)
    }

    #[must_use]
    pub fn begin_prefix(&self) -> &str {
        &self.begin_prefix
    }

    #[must_use]
    pub fn end_prefix(&self) -> &str {
        &self.end_prefix
    }

    /// Replace the begin-label prefix, clamped to [`PREFIX_MAX_BYTES`] on a
    /// character boundary. Derived labels are stale until [`preprocess`]
    /// runs.
    ///
    /// [`preprocess`]: Self::preprocess
    pub fn set_begin_prefix(&mut self, prefix: &str) {
        self.begin_prefix = clamp_prefix(prefix).to_string();
    }

    pub fn set_end_prefix(&mut self, prefix: &str) {
        self.end_prefix = clamp_prefix(prefix).to_string();
    }

    /// Separator used to intern hierarchical title prefixes; empty disables
    /// interning.
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn set_separator(&mut self, separator: &str) {
        self.separator = separator.to_string();
    }

    /// The interned hierarchical prefixes, in sorted order.
    #[must_use]
    pub fn prefixes(&self) -> &StringSet {
        &self.prefixes
    }

    /// Sorted prefix-set index of the entry's first hierarchical segment,
    /// when a separator is configured and the title contains one.
    #[must_use]
    pub fn group_of(&self, index: usize) -> Option<usize> {
        if self.separator.is_empty() {
            return None;
        }
        let title = self.title(index)?;
        let cut = title.find(&self.separator)?;
        self.prefixes.find(&title[..cut])
    }

    /// Read prefixes and the name table back from persistence, then
    /// recompute the derived state. A failed or corrupt name load is
    /// logged and the catalog keeps its current names (degraded mode, not
    /// fatal); absent prefixes keep their defaults.
    pub fn load<S: PersistStore>(&mut self, store: &S) -> Result<()> {
        if let Some(prefix) = store.read_string(KEY_BEGIN_PREFIX, PREFIX_MAX_BYTES) {
            self.begin_prefix = prefix;
        }
        if let Some(prefix) = store.read_string(KEY_END_PREFIX, PREFIX_MAX_BYTES) {
            self.end_prefix = prefix;
        }
        if let Err(err) = self.names.load(store, KEY_EVENT_NAMES) {
            error!(error = %err, "unable to load event catalog");
        }
        self.preprocess()
    }

    /// Persist the name table under its reserved key range.
    pub fn store_names<S: PersistStore>(&self, store: &mut S) -> Result<()> {
        self.names.store(store, KEY_EVENT_NAMES)
    }

    /// Replace the whole name table from an inbound dictionary carrying
    /// `count` string fields starting at `first_field`. Derived state is
    /// stale until [`preprocess`](Self::preprocess) runs.
    pub fn replace_names(&mut self, dict: &Dictionary, first_field: u32, count: u8) -> Result<()> {
        self.names.fill_from_dict(dict, first_field, count)
    }

    /// Recompute the long-event id map, the begin/end label tables and the
    /// hierarchical prefix set from the current names and prefixes. Fully
    /// replaces any prior derived state.
    pub fn preprocess(&mut self) -> Result<()> {
        self.begins.reset();
        self.ends.reset();
        self.prefixes.reset();
        self.long_event_count = 0;
        self.long_event_id.clear();
        self.long_event_id.resize(self.names.len(), 0);

        for i in 0..self.names.len() {
            let Some(name) = self.names.get(i) else {
                continue;
            };
            let Some(title) = name.strip_prefix('+') else {
                continue;
            };
            self.long_event_count += 1;
            self.long_event_id[i] = self.long_event_count;
            self.begins
                .append(&format!("{}{}", self.begin_prefix, title))?;
            self.ends.append(&format!("{}{}", self.end_prefix, title))?;
        }

        if !self.separator.is_empty() {
            for i in 0..self.names.len() {
                let Some(name) = self.names.get(i) else {
                    continue;
                };
                if name.starts_with('-') {
                    continue;
                }
                let title = name.strip_prefix('+').unwrap_or(name);
                let mut scanned = 0;
                while let Some(hit) = title[scanned..].find(&self.separator) {
                    let cut = scanned + hit;
                    self.prefixes.find_or_insert(&title[..cut])?;
                    scanned = cut + self.separator.len();
                }
            }
        }

        Ok(())
    }

    /// Decode a stored wire id into its tagged form. Returns `None` for the
    /// reserved id 0, out-of-range indices, and closing ids of entries that
    /// are not long events.
    #[must_use]
    pub fn decode(&self, wire: u8) -> Option<EventRef> {
        match wire {
            0 | 128 => None,
            1..=127 => {
                let index = wire - 1;
                if usize::from(index) >= self.names.len() {
                    return None;
                }
                if self.long_id(usize::from(index)) != 0 {
                    Some(EventRef::Begin(index))
                } else {
                    Some(EventRef::Short(index))
                }
            }
            _ => {
                let index = wire - 129;
                if usize::from(index) < self.names.len()
                    && self.long_id(usize::from(index)) != 0
                {
                    Some(EventRef::End(index))
                } else {
                    None
                }
            }
        }
    }

    /// Resolve a stored wire id to its display title: the begin label for
    /// opening occurrences of long events, the end label for closing ones,
    /// the plain title for short events.
    #[must_use]
    pub fn resolve_title(&self, wire: u8) -> Option<(EventRef, &str)> {
        let event = self.decode(wire)?;
        let title = match event {
            EventRef::Short(k) => self.title(usize::from(k))?,
            EventRef::Begin(k) => self.begin_label(self.long_id(usize::from(k)))?,
            EventRef::End(k) => self.end_label(self.long_id(usize::from(k)))?,
        };
        Some((event, title))
    }
}

fn clamp_prefix(prefix: &str) -> &str {
    if prefix.len() <= PREFIX_MAX_BYTES {
        return prefix;
    }
    let mut end = PREFIX_MAX_BYTES;
    while !prefix.is_char_boundary(end) {
        end -= 1;
    }
    &prefix[..end]
}

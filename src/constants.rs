//! Persistence key map, page geometry and table capacities.
//!
//! The key assignments are part of the on-device storage format and must
//! stay stable across versions so existing data remains loadable.

/// Key holding the packed circular event-log page.
pub const KEY_EVENT_LOG: u32 = 100;
/// Key holding the last-seen timestamp table.
pub const KEY_EVENT_LAST_SEEN: u32 = 200;
/// Key holding the running-state bitset for long events.
pub const KEY_LONG_EVENT_RUNNING: u32 = 210;
/// Outbound message field: recorded event time (seconds since epoch).
pub const KEY_RECORD_TIME: u32 = 500;
/// Outbound message field: recorded event title line.
pub const KEY_RECORD_TITLE: u32 = 510;
/// Key holding the begin-label text prefix.
pub const KEY_BEGIN_PREFIX: u32 = 901;
/// Key holding the end-label text prefix.
pub const KEY_END_PREFIX: u32 = 902;
/// Key holding the catalog size; pages follow at `KEY_EVENT_NAMES + 1, + 2, …`.
pub const KEY_EVENT_NAMES: u32 = 1000;

/// Largest value a single persistence key can hold, in bytes.
pub const PERSIST_PAGE_SIZE: usize = 256;

/// Default entry capacity of a [`StringTable`](crate::StringTable).
pub const STRLIST_MAX_ENTRIES: usize = 83;

/// Hard ceiling on catalog entries. The wire id byte splits into two
/// 127-wide ranges (opening `1..=127`, closing `129..=255`), so no catalog
/// may ever exceed this regardless of the configured table capacity.
pub const CATALOG_MAX_ENTRIES: usize = 127;

/// Number of slots in the last-seen timestamp table.
pub const LAST_SEEN_SLOTS: usize = 64;

/// Number of bits in the long-event running-state set.
pub const RUNNING_BITS: usize = 128;
/// Serialized size of the running-state set.
pub const RUNNING_BYTES: usize = RUNNING_BITS / 8;

/// Longest accepted begin/end label prefix, in bytes.
pub const PREFIX_MAX_BYTES: usize = 31;

/// Packed size of one event record: 4-byte LE seconds + 1-byte id.
pub const EVENT_RECORD_SIZE: usize = 5;

/// Default begin-label prefix applied to pairable events.
pub const DEFAULT_BEGIN_PREFIX: &str = "Start of ";
/// Default end-label prefix applied to pairable events.
pub const DEFAULT_END_PREFIX: &str = "End of ";

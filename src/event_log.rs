//! Fixed-capacity circular log of `(timestamp, id)` records.
//!
//! The buffer fills one persistence page: `page_size / 5` packed records
//! of 4-byte little-endian seconds plus the 1-byte wire id. The write
//! cursor advances modulo the buffer length, silently overwriting the
//! oldest record once full — bounded history is the design trade-off, not
//! a bug. Every append writes the whole page back, best-effort: a failed
//! page write is logged once and the in-memory record stands.
//!
//! Slot order is cursor order, not time order, once the buffer has
//! wrapped; [`chronological`](EventLog::chronological) reconstructs time
//! order by locating the single wraparound discontinuity.

use tracing::{error, warn};

use crate::constants::{EVENT_RECORD_SIZE, KEY_EVENT_LOG, PERSIST_PAGE_SIZE};
use crate::store::PersistStore;

/// One log record. A zero timestamp denotes an unused slot, which is only
/// possible before the buffer first fills.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventRecord {
    /// Seconds since the epoch.
    pub time: i32,
    /// Wire event id; 0 is reserved and never recorded.
    pub id: u8,
}

#[derive(Debug, Clone)]
pub struct EventLog {
    page: Vec<EventRecord>,
    next_index: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(PERSIST_PAGE_SIZE)
    }
}

impl EventLog {
    /// A log sized to fill one persistence page of `page_size` bytes.
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        let slots = (page_size / EVENT_RECORD_SIZE).max(1);
        Self {
            page: vec![EventRecord::default(); slots],
            next_index: 0,
        }
    }

    /// Number of buffer slots (`PAGE_LENGTH`).
    #[must_use]
    pub fn slots(&self) -> usize {
        self.page.len()
    }

    /// The raw buffer, in cursor order.
    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.page
    }

    #[must_use]
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Read the persisted page back into the buffer at startup. A missing
    /// page or short read is logged and otherwise ignored: the buffer keeps
    /// its zeroed state and the log just looks empty.
    pub fn load<S: PersistStore>(&mut self, store: &S) {
        let mut buf = vec![0u8; self.page.len() * EVENT_RECORD_SIZE];
        match store.read(KEY_EVENT_LOG, &mut buf) {
            Err(err) => {
                error!(key = KEY_EVENT_LOG, error = %err, "error while reading event log");
                return;
            }
            Ok(n) if n < buf.len() => {
                warn!(
                    key = KEY_EVENT_LOG,
                    actual = n,
                    expected = buf.len(),
                    "short read of event log"
                );
            }
            Ok(_) => {}
        }
        for (i, chunk) in buf.chunks_exact(EVENT_RECORD_SIZE).enumerate() {
            self.page[i] = EventRecord {
                time: i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
                id: chunk[4],
            };
        }
    }

    /// Append `(now, id)` at the cursor, advance it, and persist the whole
    /// page. A no-op when `id` is the reserved value 0. Persistence is
    /// best-effort; a short or failed write is logged and not retried.
    pub fn record<S: PersistStore>(&mut self, store: &mut S, id: u8, now: i32) {
        if id == 0 {
            return;
        }
        self.page[self.next_index] = EventRecord { time: now, id };
        self.next_index = (self.next_index + 1) % self.page.len();

        let bytes = self.encode();
        match store.write(KEY_EVENT_LOG, &bytes) {
            Err(err) => {
                error!(key = KEY_EVENT_LOG, error = %err, "error while writing event log");
            }
            Ok(n) if n < bytes.len() => {
                warn!(
                    key = KEY_EVENT_LOG,
                    actual = n,
                    expected = bytes.len(),
                    "short write of event log"
                );
            }
            Ok(_) => {}
        }
    }

    /// Valid records in reverse chronological order (newest first).
    ///
    /// One forward scan finds the wraparound point: the adjacent slot pair
    /// where the later slot's timestamp is smaller than its predecessor's.
    /// The scan stops at the first zero timestamp (buffer not yet full) and
    /// assumes at most one discontinuity; a clock that moved backwards
    /// between recordings would misidentify the wrap point.
    #[must_use]
    pub fn chronological(&self) -> Vec<EventRecord> {
        let mut first = 0;
        let mut last = 0;
        let mut populated = 0;

        for i in 0..self.page.len() {
            if self.page[i].time == 0 {
                break;
            }
            populated = i + 1;
            if i > 0 && first == 0 {
                if self.page[i].time < self.page[i - 1].time {
                    last = i - 1;
                    first = i;
                } else {
                    last = i;
                }
            }
        }

        if populated == 0 {
            return Vec::new();
        }

        let mut view = Vec::with_capacity(populated);
        let mut j = last;
        loop {
            view.push(self.page[j]);
            if j == first {
                break;
            }
            j = (j + self.page.len() - 1) % self.page.len();
        }
        view
    }

    fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.page.len() * EVENT_RECORD_SIZE);
        for record in &self.page {
            bytes.extend_from_slice(&record.time.to_le_bytes());
            bytes.push(record.id);
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn log_with(store: &mut MemoryStore, events: &[(i32, u8)]) -> EventLog {
        let mut log = EventLog::new(store.page_size());
        for &(time, id) in events {
            log.record(store, id, time);
        }
        log
    }

    #[test]
    fn record_zero_is_a_no_op() {
        let mut store = MemoryStore::new();
        let mut log = EventLog::new(store.page_size());
        log.record(&mut store, 0, 1000);
        assert_eq!(log.next_index(), 0);
        assert!(store.is_empty());
        assert!(log.chronological().is_empty());
    }

    #[test]
    fn chronological_view_before_wraparound() {
        let mut store = MemoryStore::new();
        let log = log_with(&mut store, &[(100, 1), (200, 2), (300, 3)]);
        let view = log.chronological();
        assert_eq!(view.len(), 3);
        assert_eq!(view[0], EventRecord { time: 300, id: 3 });
        assert_eq!(view[2], EventRecord { time: 100, id: 1 });
    }

    #[test]
    fn wraparound_keeps_the_most_recent_records() {
        let mut store = MemoryStore::new();
        let mut log = EventLog::new(store.page_size());
        let slots = log.slots();
        let extra = 7;
        for i in 0..slots + extra {
            log.record(&mut store, 1, 1000 + i as i32);
        }

        let view = log.chronological();
        assert_eq!(view.len(), slots);
        // newest first
        assert_eq!(view[0].time, 1000 + (slots + extra - 1) as i32);
        // the oldest survivor is the (extra)-th record
        assert_eq!(view[slots - 1].time, 1000 + extra as i32);
        // strictly descending timestamps throughout
        assert!(view.windows(2).all(|w| w[0].time > w[1].time));
    }

    #[test]
    fn exact_fill_reports_every_slot() {
        let mut store = MemoryStore::new();
        let mut log = EventLog::new(store.page_size());
        let slots = log.slots();
        for i in 0..slots {
            log.record(&mut store, 2, 500 + i as i32);
        }
        assert_eq!(log.next_index(), 0);
        let view = log.chronological();
        assert_eq!(view.len(), slots);
        assert_eq!(view[0].time, 500 + slots as i32 - 1);
        assert_eq!(view[slots - 1].time, 500);
    }

    #[test]
    fn persisted_page_survives_reload() {
        let mut store = MemoryStore::new();
        let log = log_with(&mut store, &[(10, 1), (20, 2)]);

        let mut restored = EventLog::new(store.page_size());
        restored.load(&store);
        assert_eq!(restored.records()[..2], log.records()[..2]);
        assert_eq!(restored.chronological(), log.chronological());
    }

    #[test]
    fn load_of_empty_store_keeps_zeroed_buffer() {
        let store = MemoryStore::new();
        let mut log = EventLog::new(store.page_size());
        log.load(&store);
        assert!(log.chronological().is_empty());
    }

    #[test]
    fn page_length_matches_record_size() {
        let log = EventLog::new(256);
        assert_eq!(log.slots(), 51);
    }
}

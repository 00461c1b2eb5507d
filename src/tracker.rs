//! Running-state bits for long events and the last-seen timestamp table.
//!
//! Both persist immediately after every mutation, independently of the
//! event log's own page write, so the two can never stay inconsistent for
//! longer than one operation.

use tracing::{error, warn};

use crate::constants::{
    KEY_EVENT_LAST_SEEN, KEY_LONG_EVENT_RUNNING, LAST_SEEN_SLOTS, RUNNING_BITS, RUNNING_BYTES,
};
use crate::store::PersistStore;

/// One bit per dense long-event id: is the long event currently open?
/// Default false; flipped exactly once per begin and once per end record.
#[derive(Debug, Clone, Default)]
pub struct RunningState {
    bits: [u8; RUNNING_BYTES],
}

impl RunningState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the persisted bitset; a missing or short value is logged and
    /// leaves every event not-running.
    pub fn load<S: PersistStore>(&mut self, store: &S) {
        let mut buf = [0u8; RUNNING_BYTES];
        match store.read(KEY_LONG_EVENT_RUNNING, &mut buf) {
            Err(err) => {
                error!(key = KEY_LONG_EVENT_RUNNING, error = %err, "error while reading running state");
                return;
            }
            Ok(n) if n < buf.len() => {
                warn!(
                    key = KEY_LONG_EVENT_RUNNING,
                    actual = n,
                    expected = buf.len(),
                    "short read of running state"
                );
            }
            Ok(_) => {}
        }
        self.bits = buf;
    }

    /// Whether the long event with the given 1-based id is open.
    #[must_use]
    pub fn is_running(&self, long_id: u8) -> bool {
        let Some(bit) = bit_position(long_id) else {
            return false;
        };
        self.bits[bit / 8] & (1 << (bit % 8)) != 0
    }

    /// Flip the bit for the given 1-based id and persist the whole bitset,
    /// best-effort.
    pub fn toggle<S: PersistStore>(&mut self, store: &mut S, long_id: u8) {
        let Some(bit) = bit_position(long_id) else {
            warn!(long_id, "running-state toggle for out-of-range id");
            return;
        };
        self.bits[bit / 8] ^= 1 << (bit % 8);

        match store.write(KEY_LONG_EVENT_RUNNING, &self.bits) {
            Err(err) => {
                error!(key = KEY_LONG_EVENT_RUNNING, error = %err, "error while writing running state");
            }
            Ok(n) if n < self.bits.len() => {
                warn!(
                    key = KEY_LONG_EVENT_RUNNING,
                    actual = n,
                    expected = self.bits.len(),
                    "short write of running state"
                );
            }
            Ok(_) => {}
        }
    }
}

fn bit_position(long_id: u8) -> Option<usize> {
    if long_id == 0 || usize::from(long_id) > RUNNING_BITS {
        return None;
    }
    Some(usize::from(long_id) - 1)
}

/// Per-catalog-index timestamp of the most recent recording, used purely
/// for display. Zero means never seen.
#[derive(Debug, Clone)]
pub struct LastSeen {
    times: [i32; LAST_SEEN_SLOTS],
}

impl Default for LastSeen {
    fn default() -> Self {
        Self {
            times: [0; LAST_SEEN_SLOTS],
        }
    }
}

impl LastSeen {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the persisted table; missing data just means nothing was seen.
    pub fn load<S: PersistStore>(&mut self, store: &S) {
        let mut buf = [0u8; LAST_SEEN_SLOTS * 4];
        match store.read(KEY_EVENT_LAST_SEEN, &mut buf) {
            Err(err) => {
                error!(key = KEY_EVENT_LAST_SEEN, error = %err, "error while reading last-seen table");
                return;
            }
            Ok(n) if n < buf.len() => {
                warn!(
                    key = KEY_EVENT_LAST_SEEN,
                    actual = n,
                    expected = buf.len(),
                    "short read of last-seen table"
                );
            }
            Ok(_) => {}
        }
        for (i, chunk) in buf.chunks_exact(4).enumerate() {
            self.times[i] = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
    }

    /// When the catalog entry was last recorded, if ever.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<i32> {
        match self.times.get(index) {
            Some(&time) if time != 0 => Some(time),
            _ => None,
        }
    }

    /// Stamp the entry with `now` and persist the whole table, best-effort.
    /// Indices beyond the table are accepted and ignored.
    pub fn touch<S: PersistStore>(&mut self, store: &mut S, index: usize, now: i32) {
        if index >= LAST_SEEN_SLOTS {
            warn!(index, "last-seen update beyond table bounds");
            return;
        }
        self.times[index] = now;

        let mut bytes = [0u8; LAST_SEEN_SLOTS * 4];
        for (i, time) in self.times.iter().enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&time.to_le_bytes());
        }
        match store.write(KEY_EVENT_LAST_SEEN, &bytes) {
            Err(err) => {
                error!(key = KEY_EVENT_LAST_SEEN, error = %err, "error while writing last-seen table");
            }
            Ok(n) if n < bytes.len() => {
                warn!(
                    key = KEY_EVENT_LAST_SEEN,
                    actual = n,
                    expected = bytes.len(),
                    "short write of last-seen table"
                );
            }
            Ok(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn toggle_is_involutive_and_persists() {
        let mut store = MemoryStore::new();
        let mut running = RunningState::new();
        assert!(!running.is_running(1));

        running.toggle(&mut store, 1);
        assert!(running.is_running(1));
        assert!(!running.is_running(2));

        let mut restored = RunningState::new();
        restored.load(&store);
        assert!(restored.is_running(1));

        running.toggle(&mut store, 1);
        assert!(!running.is_running(1));
    }

    #[test]
    fn id_zero_and_out_of_range_are_never_running() {
        let mut store = MemoryStore::new();
        let mut running = RunningState::new();
        running.toggle(&mut store, 0);
        assert!(!running.is_running(0));
        assert!(store.is_empty());
    }

    #[test]
    fn ids_beyond_the_bitset_are_ignored() {
        let mut store = MemoryStore::new();
        let mut running = RunningState::new();
        for id in [RUNNING_BITS as u8 + 1, 200, u8::MAX] {
            running.toggle(&mut store, id);
            assert!(!running.is_running(id));
        }
        assert!(store.is_empty());
    }

    #[test]
    fn high_ids_use_distinct_bits() {
        let mut store = MemoryStore::new();
        let mut running = RunningState::new();
        running.toggle(&mut store, 128);
        assert!(running.is_running(128));
        assert!(!running.is_running(127));
        assert!(!running.is_running(1));
    }

    #[test]
    fn last_seen_roundtrip() {
        let mut store = MemoryStore::new();
        let mut seen = LastSeen::new();
        assert_eq!(seen.get(3), None);

        seen.touch(&mut store, 3, 1_456_000_000);
        assert_eq!(seen.get(3), Some(1_456_000_000));

        let mut restored = LastSeen::new();
        restored.load(&store);
        assert_eq!(restored.get(3), Some(1_456_000_000));
        assert_eq!(restored.get(4), None);
    }

    #[test]
    fn last_seen_ignores_out_of_bounds_index() {
        let mut store = MemoryStore::new();
        let mut seen = LastSeen::new();
        seen.touch(&mut store, LAST_SEEN_SLOTS, 99);
        assert!(store.is_empty());
    }
}

//! Top-level application context tying the data layer together.
//!
//! [`LifeLog`] owns the catalog, the circular event log, the running-state
//! bits and the last-seen table, all backed by one [`PersistStore`]. The
//! host's event loop delivers callbacks one at a time to completion, so
//! exclusive access is structural; nothing here locks.
//!
//! Outbound bus messages are returned to the caller rather than sent:
//! transport belongs to the host.

use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::bus::{Dictionary, recorded_event_message};
use crate::catalog::{Catalog, EventRef};
use crate::constants::{KEY_BEGIN_PREFIX, KEY_END_PREFIX, KEY_EVENT_NAMES};
use crate::error::Result;
use crate::event_log::EventLog;
use crate::menu::{LogRow, MenuRow, RowAction, log_rows, menu_rows};
use crate::store::PersistStore;
use crate::tracker::{LastSeen, RunningState};

pub struct LifeLog<S: PersistStore> {
    store: S,
    catalog: Catalog,
    log: EventLog,
    running: RunningState,
    last_seen: LastSeen,
}

impl<S: PersistStore> LifeLog<S> {
    /// Bring the whole data layer up from persistence: label prefixes,
    /// name catalog, derived tables, event log, running bits, last-seen
    /// times. Missing data loads as empty; only catalog preprocessing can
    /// fail here.
    pub fn open(store: S) -> Result<Self> {
        let mut catalog = Catalog::new();
        catalog.load(&store)?;

        let mut log = EventLog::new(store.page_size());
        log.load(&store);

        let mut running = RunningState::new();
        running.load(&store);

        let mut last_seen = LastSeen::new();
        last_seen.load(&store);

        Ok(Self {
            store,
            catalog,
            log,
            running,
            last_seen,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    #[must_use]
    pub fn running(&self) -> &RunningState {
        &self.running
    }

    #[must_use]
    pub fn last_seen(&self) -> &LastSeen {
        &self.last_seen
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the context, handing the store back. Used by hosts that
    /// need to tear down and rebuild across a simulated restart.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// The selectable rows of the main menu for the current state.
    #[must_use]
    pub fn menu_rows(&self) -> Vec<MenuRow> {
        menu_rows(&self.catalog, &self.running, &self.last_seen)
    }

    /// The event-log view, newest first.
    #[must_use]
    pub fn log_rows(&self) -> Vec<LogRow> {
        log_rows(&self.catalog, &self.log)
    }

    /// Apply an inbound dictionary from the companion device: a catalog
    /// replacement (size field plus consecutive name fields) and/or new
    /// begin/end label prefixes. Returns whether anything changed and the
    /// menu needs re-rendering. Persistence of the applied values is
    /// best-effort; the in-memory state is the new current state either
    /// way.
    pub fn apply_update(&mut self, dict: &Dictionary) -> Result<bool> {
        let mut updated = false;

        match dict.get(KEY_EVENT_NAMES) {
            Some(field) => match dict.get_int(KEY_EVENT_NAMES) {
                Some(count) => {
                    let count = count.clamp(0, i64::from(u8::MAX)) as u8;
                    self.catalog
                        .replace_names(dict, KEY_EVENT_NAMES + 1, count)?;
                    if let Err(err) = self.catalog.store_names(&mut self.store) {
                        error!(error = %err, "unable to persist event catalog");
                    }
                    info!(count, "event catalog replaced");
                    updated = true;
                }
                None => {
                    error!(kind = field.kind(), "unexpected type for event count");
                }
            },
            None => {}
        }

        if let Some(prefix) = dict.get_str(KEY_BEGIN_PREFIX) {
            self.catalog.set_begin_prefix(prefix);
            if let Err(err) = self
                .store
                .write_string(KEY_BEGIN_PREFIX, self.catalog.begin_prefix())
            {
                error!(error = %err, "unable to persist begin prefix");
            }
            updated = true;
        }

        if let Some(prefix) = dict.get_str(KEY_END_PREFIX) {
            self.catalog.set_end_prefix(prefix);
            if let Err(err) = self
                .store
                .write_string(KEY_END_PREFIX, self.catalog.end_prefix())
            {
                error!(error = %err, "unable to persist end prefix");
            }
            updated = true;
        }

        if updated {
            self.catalog.preprocess()?;
        }
        Ok(updated)
    }

    /// Handle the user choosing menu row `row_index`, timestamped now.
    /// Returns the outbound bus message for the recorded event, when the
    /// id resolved to a title.
    pub fn select(&mut self, row_index: usize) -> Option<Dictionary> {
        self.select_at(row_index, unix_now())
    }

    /// [`select`](Self::select) with an explicit timestamp.
    pub fn select_at(&mut self, row_index: usize, now: i32) -> Option<Dictionary> {
        let rows = self.menu_rows();
        let Some(row) = rows.get(row_index) else {
            error!(row_index, rows = rows.len(), "selection beyond menu rows");
            return None;
        };

        match row.action {
            RowAction::Inert => None,
            RowAction::Select { index } => {
                let long_id = self.catalog.long_id(usize::from(index));
                if long_id == 0 {
                    let outbound = self.record_at(EventRef::Short(index).wire(), now);
                    self.last_seen
                        .touch(&mut self.store, usize::from(index), now);
                    return outbound;
                }
                // Record the polarity matching the current state, then
                // flip the bit.
                let event = if self.running.is_running(long_id) {
                    EventRef::End(index)
                } else {
                    EventRef::Begin(index)
                };
                let outbound = self.record_at(event.wire(), now);
                self.running.toggle(&mut self.store, long_id);
                self.last_seen
                    .touch(&mut self.store, usize::from(index), now);
                outbound
            }
            RowAction::Counterpart { index } => {
                let long_id = self.catalog.long_id(usize::from(index));
                if long_id == 0 {
                    error!(index, "counterpart row for a non-long event");
                    return None;
                }
                // The mirrored row records the opposite polarity without
                // flipping the state, catching a missed begin or end.
                let event = if self.running.is_running(long_id) {
                    EventRef::Begin(index)
                } else {
                    EventRef::End(index)
                };
                let outbound = self.record_at(event.wire(), now);
                self.last_seen
                    .touch(&mut self.store, usize::from(index), now);
                outbound
            }
        }
    }

    /// Record a raw wire id, timestamped now. No-op for the reserved id 0.
    pub fn record(&mut self, id: u8) -> Option<Dictionary> {
        self.record_at(id, unix_now())
    }

    /// [`record`](Self::record) with an explicit timestamp. The record is
    /// stored regardless of resolution; only the outbound notification
    /// depends on the id resolving to a title.
    pub fn record_at(&mut self, id: u8, now: i32) -> Option<Dictionary> {
        if id == 0 {
            return None;
        }
        self.log.record(&mut self.store, id, now);

        match self.catalog.resolve_title(id) {
            Some((_, title)) => Some(recorded_event_message(now, id, title)),
            None => {
                warn!(id, "recorded id does not resolve to a title");
                None
            }
        }
    }
}

fn unix_now() -> i32 {
    OffsetDateTime::now_utc().unix_timestamp() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Field;
    use crate::constants::{KEY_RECORD_TIME, KEY_RECORD_TITLE};
    use crate::store::MemoryStore;

    fn update(names: &[&str]) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.insert(KEY_EVENT_NAMES, Field::UInt(names.len() as u32));
        for (i, name) in names.iter().enumerate() {
            dict.insert(
                KEY_EVENT_NAMES + 1 + i as u32,
                Field::Str((*name).to_string()),
            );
        }
        dict
    }

    fn app_with(names: &[&str]) -> LifeLog<MemoryStore> {
        let mut app = LifeLog::open(MemoryStore::new()).expect("open");
        let applied = app.apply_update(&update(names)).expect("update");
        assert!(applied);
        app
    }

    #[test]
    fn open_on_empty_store_is_empty() {
        let app = LifeLog::open(MemoryStore::new()).expect("open");
        assert!(app.catalog().is_empty());
        assert_eq!(app.catalog().begin_prefix(), "Start of ");
        assert!(app.event_log().chronological().is_empty());
    }

    #[test]
    fn short_event_selection_records_and_notifies() {
        let mut app = app_with(&["Eat", "+Sleep", "-Hidden"]);

        let outbound = app.select_at(0, 1_456_835_445).expect("outbound");
        assert_eq!(outbound.get_int(KEY_RECORD_TIME), Some(1_456_835_445));
        assert_eq!(
            outbound.get_str(KEY_RECORD_TITLE),
            Some("2016-03-01T12:30:45Z,1,Eat")
        );

        let log = app.event_log().chronological();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].id, 1);
        assert_eq!(app.last_seen().get(0), Some(1_456_835_445));
    }

    #[test]
    fn long_event_toggle_is_involutive() {
        let mut app = app_with(&["Eat", "+Sleep", "-Hidden"]);

        // Begin: row 1 is "Start of Sleep", records id 2.
        let outbound = app.select_at(1, 100).expect("begin");
        assert!(outbound
            .get_str(KEY_RECORD_TITLE)
            .is_some_and(|line| line.ends_with(",2,Start of Sleep")));
        assert!(app.running().is_running(1));

        // Row 1 is now relabeled "End of Sleep"; selecting records id 130.
        let rows = app.menu_rows();
        assert_eq!(rows[1].title, "End of Sleep");
        let outbound = app.select_at(1, 200).expect("end");
        assert!(outbound
            .get_str(KEY_RECORD_TITLE)
            .is_some_and(|line| line.ends_with(",130,End of Sleep")));
        assert!(!app.running().is_running(1));

        let view = app.event_log().chronological();
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].id, 130);
        assert_eq!(view[1].id, 2);
    }

    #[test]
    fn counterpart_row_records_opposite_without_toggling() {
        let mut app = app_with(&["Eat", "+Sleep", "-Hidden"]);

        // Not running; the tail row shows "End of Sleep" and records the
        // end id while leaving the state untouched.
        let rows = app.menu_rows();
        assert_eq!(rows[2].title, "End of Sleep");
        let outbound = app.select_at(2, 300).expect("counterpart");
        assert!(outbound
            .get_str(KEY_RECORD_TITLE)
            .is_some_and(|line| line.ends_with(",130,End of Sleep")));
        assert!(!app.running().is_running(1));
    }

    #[test]
    fn record_zero_is_a_no_op() {
        let mut app = app_with(&["Eat"]);
        assert!(app.record_at(0, 500).is_none());
        assert!(app.event_log().chronological().is_empty());
    }

    #[test]
    fn unresolvable_id_is_stored_but_not_notified() {
        let mut app = app_with(&["Eat"]);
        assert!(app.record_at(99, 500).is_none());
        let view = app.event_log().chronological();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, 99);
    }

    #[test]
    fn prefix_update_rederives_labels_and_persists() {
        let mut app = app_with(&["+Sleep"]);

        let mut dict = Dictionary::new();
        dict.insert(KEY_BEGIN_PREFIX, Field::Str("Begin ".into()));
        dict.insert(KEY_END_PREFIX, Field::Str("Finish ".into()));
        assert!(app.apply_update(&dict).expect("update"));

        assert_eq!(app.catalog().begin_label(1), Some("Begin Sleep"));
        assert_eq!(app.catalog().end_label(1), Some("Finish Sleep"));
        assert_eq!(
            app.store().read_string(KEY_BEGIN_PREFIX, 32).as_deref(),
            Some("Begin ")
        );
    }

    #[test]
    fn wrong_typed_count_field_is_ignored() {
        let mut app = app_with(&["Eat"]);
        let mut dict = Dictionary::new();
        dict.insert(KEY_EVENT_NAMES, Field::Str("three".into()));
        assert!(!app.apply_update(&dict).expect("update"));
        assert_eq!(app.catalog().len(), 1);
    }

    #[test]
    fn empty_update_changes_nothing() {
        let mut app = app_with(&["Eat"]);
        assert!(!app.apply_update(&Dictionary::new()).expect("update"));
    }

    #[test]
    fn selection_beyond_rows_is_ignored() {
        let mut app = app_with(&["Eat"]);
        assert!(app.select_at(10, 100).is_none());
        assert!(app.event_log().chronological().is_empty());
    }

    #[test]
    fn state_survives_reopen() {
        let mut app = app_with(&["Eat", "+Sleep"]);
        app.select_at(0, 100);
        app.select_at(1, 200);

        let store = app.into_store();
        let app = LifeLog::open(store).expect("reopen");

        assert_eq!(app.catalog().len(), 2);
        assert_eq!(app.catalog().begin_label(1), Some("Start of Sleep"));
        assert!(app.running().is_running(1));
        assert_eq!(app.last_seen().get(0), Some(100));
        assert_eq!(app.last_seen().get(1), Some(200));

        let view = app.event_log().chronological();
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].id, 2);
        assert_eq!(view[1].id, 1);
    }
}

//! Menu adapter contract, expressed as pure data.
//!
//! No widget toolkit here: the host renders [`MenuRow`]s however it likes
//! and reports the chosen row index back to
//! [`LifeLog::select`](crate::LifeLog::select). Row layout follows the
//! device UI: one row per active catalog entry in catalog order, with each
//! long event contributing a second, opposite-labeled row in a tail block
//! sized by the number of long events.

use std::sync::OnceLock;

use time::OffsetDateTime;
use time::format_description::{self, BorrowedFormatItem};
use tracing::error;

use crate::catalog::Catalog;
use crate::event_log::EventLog;
use crate::tracker::{LastSeen, RunningState};

/// Placeholder row title when the catalog is empty.
pub const NO_EVENT_CONFIGURED: &str = "No event configured.";
/// Placeholder row title when the log is empty.
pub const NO_EVENT_LOGGED: &str = "No event logged.";
/// Subtitle shown for entries that were never recorded.
pub const NEVER_SEEN: &str = "unknown";

/// What selecting a row does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    /// Record the entry: a one-shot for short events, the begin/end toggle
    /// for long ones.
    Select { index: u8 },
    /// Tail-block row of a long event: record the opposite polarity
    /// without flipping the running state (catches a missed begin or end).
    Counterpart { index: u8 },
    /// Inert placeholder row.
    Inert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuRow {
    pub title: String,
    pub subtitle: String,
    pub action: RowAction,
}

/// One line of the event-log view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRow {
    pub title: String,
    pub subtitle: String,
}

/// Build the selectable rows for the current catalog and state.
///
/// A `'+'` entry shows its begin label in place while not running and its
/// end label while running; the mirrored tail row at
/// `rows - long_count + long_id - 1` always shows the opposite.
#[must_use]
pub fn menu_rows(catalog: &Catalog, running: &RunningState, last_seen: &LastSeen) -> Vec<MenuRow> {
    let mut size = 0;
    for i in 0..catalog.len() {
        match catalog.name(i).and_then(|name| name.chars().next()) {
            Some('+') => size += 2,
            Some('-') => {}
            _ => size += 1,
        }
    }

    if size == 0 {
        return vec![MenuRow {
            title: NO_EVENT_CONFIGURED.to_string(),
            subtitle: String::new(),
            action: RowAction::Inert,
        }];
    }

    let placeholder = MenuRow {
        title: String::new(),
        subtitle: String::new(),
        action: RowAction::Inert,
    };
    let mut rows = vec![placeholder; size];

    let mut j = 0;
    for i in 0..catalog.len() {
        if !catalog.is_active(i) {
            continue;
        }
        let subtitle = last_seen
            .get(i)
            .and_then(format_timestamp)
            .unwrap_or_else(|| NEVER_SEEN.to_string());

        let long_id = catalog.long_id(i);
        if long_id != 0 {
            let is_running = running.is_running(long_id);
            let in_place = if is_running {
                catalog.end_label(long_id)
            } else {
                catalog.begin_label(long_id)
            };
            let opposite = if is_running {
                catalog.begin_label(long_id)
            } else {
                catalog.end_label(long_id)
            };
            let (Some(in_place), Some(opposite)) = (in_place, opposite) else {
                error!(index = i, long_id, "long event without derived labels");
                continue;
            };

            let other = size - usize::from(catalog.long_event_count()) + usize::from(long_id) - 1;
            rows[j] = MenuRow {
                title: in_place.to_string(),
                subtitle: subtitle.clone(),
                action: RowAction::Select { index: i as u8 },
            };
            rows[other] = MenuRow {
                title: opposite.to_string(),
                subtitle,
                action: RowAction::Counterpart { index: i as u8 },
            };
            j += 1;
        } else if catalog.name(i).is_some_and(|name| name.starts_with('+')) {
            // Preprocessing has not run since this entry appeared.
            error!(index = i, "'+' entry has no long-event id");
        } else {
            rows[j] = MenuRow {
                title: catalog.title(i).unwrap_or_default().to_string(),
                subtitle,
                action: RowAction::Select { index: i as u8 },
            };
            j += 1;
        }
    }

    rows
}

/// Build the event-log view, newest first.
#[must_use]
pub fn log_rows(catalog: &Catalog, log: &EventLog) -> Vec<LogRow> {
    let view = log.chronological();
    if view.is_empty() {
        return vec![LogRow {
            title: NO_EVENT_LOGGED.to_string(),
            subtitle: String::new(),
        }];
    }

    view.iter()
        .map(|record| {
            let stamp = format_timestamp(record.time).unwrap_or_default();
            match catalog.resolve_title(record.id) {
                Some((_, title)) => LogRow {
                    title: title.to_string(),
                    subtitle: stamp,
                },
                None => LogRow {
                    title: stamp,
                    subtitle: String::new(),
                },
            }
        })
        .collect()
}

static SUBTITLE_FORMAT: OnceLock<Vec<BorrowedFormatItem<'static>>> = OnceLock::new();

/// `YYYY-MM-DD HH:MM:SS` rendering of a unix timestamp, in UTC.
#[must_use]
pub fn format_timestamp(time: i32) -> Option<String> {
    let items = SUBTITLE_FORMAT.get_or_init(|| {
        format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]")
            .unwrap_or_default()
    });
    if items.is_empty() {
        return None;
    }
    let stamp = OffsetDateTime::from_unix_timestamp(i64::from(time)).ok()?;
    stamp.format(items).ok()
}

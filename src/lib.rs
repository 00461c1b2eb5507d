#![deny(clippy::all, clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![cfg_attr(
    test,
    allow(clippy::useless_vec, clippy::uninlined_format_args, clippy::float_cmp)
)]
#![allow(clippy::module_name_repetitions)]
//
// Strategic lint exceptions - these are allowed project-wide for pragmatic reasons:
//
// Documentation lints: Many internal/self-documenting functions don't need extensive docs.
// Public APIs should still have proper documentation.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
//
// Cast safety: All casts in this codebase are bounded by the data formats
// themselves (one-byte ids, sub-page offsets, 32-bit timestamps), so
// try_into() everywhere would add noise without catching anything.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
//
// Pattern matching: These pedantic lints often suggest changes that reduce clarity.
#![allow(clippy::manual_let_else)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::single_match_else)]
#![allow(clippy::single_match)]
//
// Low-value pedantic lints that add noise:
#![allow(clippy::needless_range_loop)]
#![allow(clippy::unreadable_literal)] // Constants in packed formats read better bare
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::return_self_not_must_use)]

/// The lifelog-core crate version (matches `Cargo.toml`).
pub const LIFELOG_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod app;
pub mod bus;
pub mod catalog;
pub mod constants;
pub mod error;
pub mod event_log;
pub mod menu;
pub mod store;
pub mod strlist;
pub mod strset;
pub mod tracker;

pub use app::LifeLog;
pub use bus::{Dictionary, Field, recorded_event_message, rfc3339_utc};
pub use catalog::{Catalog, EventRef};
pub use constants::*;
pub use error::{LifelogError, Result};
pub use event_log::{EventLog, EventRecord};
pub use menu::{LogRow, MenuRow, RowAction, log_rows, menu_rows};
pub use store::{MemoryStore, PersistStore};
pub use strlist::StringTable;
pub use strset::StringSet;
pub use tracker::{LastSeen, RunningState};

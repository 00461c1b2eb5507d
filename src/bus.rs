//! Message-bus boundary: the key/value dictionaries exchanged with the
//! paired companion device, and the outbound recorded-event message.
//!
//! Transport and delivery are the host's problem; this module only defines
//! the dictionary shape and builds the payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::error;

use crate::constants::{KEY_RECORD_TIME, KEY_RECORD_TITLE};

/// One dictionary field. Mirrors the wire tuple types of the companion
/// protocol: text, signed/unsigned integers, raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    Str(String),
    Int(i32),
    UInt(u32),
    Bytes(Vec<u8>),
}

impl Field {
    /// Short type tag used in log lines.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Field::Str(_) => "string",
            Field::Int(_) => "int",
            Field::UInt(_) => "uint",
            Field::Bytes(_) => "bytes",
        }
    }
}

/// An ordered field-id → value dictionary, as carried by the message bus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    fields: BTreeMap<u32, Field>,
}

impl Dictionary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field_id: u32, value: Field) -> &mut Self {
        self.fields.insert(field_id, value);
        self
    }

    #[must_use]
    pub fn get(&self, field_id: u32) -> Option<&Field> {
        self.fields.get(&field_id)
    }

    /// The field as text, when present and of string type.
    #[must_use]
    pub fn get_str(&self, field_id: u32) -> Option<&str> {
        match self.fields.get(&field_id) {
            Some(Field::Str(value)) => Some(value),
            _ => None,
        }
    }

    /// The field as an integer, accepting both signed and unsigned tuples.
    #[must_use]
    pub fn get_int(&self, field_id: u32) -> Option<i64> {
        match self.fields.get(&field_id) {
            Some(Field::Int(value)) => Some(i64::from(*value)),
            Some(Field::UInt(value)) => Some(i64::from(*value)),
            _ => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Field)> {
        self.fields.iter().map(|(id, field)| (*id, field))
    }
}

/// RFC-3339 UTC rendering of `time` (seconds since epoch), or `None` when
/// the value is outside the representable range.
#[must_use]
pub fn rfc3339_utc(time: i32) -> Option<String> {
    let stamp = OffsetDateTime::from_unix_timestamp(i64::from(time)).ok()?;
    stamp.format(&Rfc3339).ok()
}

/// Build the outbound message for a recorded event: the absolute time under
/// [`KEY_RECORD_TIME`] and a `<RFC-3339 UTC>,<id>,<title>` line under
/// [`KEY_RECORD_TITLE`]. Falls back to the bare title if formatting fails.
#[must_use]
pub fn recorded_event_message(time: i32, id: u8, title: &str) -> Dictionary {
    let line = match rfc3339_utc(time) {
        Some(stamp) => format!("{stamp},{id},{title}"),
        None => {
            error!(time, "unable to build RFC-3339 representation");
            title.to_string()
        }
    };

    let mut dict = Dictionary::new();
    dict.insert(KEY_RECORD_TIME, Field::Int(time));
    dict.insert(KEY_RECORD_TITLE, Field::Str(line));
    dict
}

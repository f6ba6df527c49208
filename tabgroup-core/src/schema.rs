//! Storage-key schema: each logical configuration field maps to an ordered
//! list of physical keys, newest first.
//!
//! Reads try the keys in order and take the first usable value. Writes go to
//! every key, so installations still reading an older key keep seeing the
//! current value.

use std::fmt;

/// Current key for the classification credential.
pub const CREDENTIAL_KEY: &str = "OPEN_API_KEY";
/// Pre-migration key for the classification credential.
pub const LEGACY_CREDENTIAL_KEY: &str = "openai_key";
/// Current key for the auto-classify toggle.
pub const AUTO_CLASSIFY_KEY: &str = "AUTO_GROUP";
/// Pre-migration key for the auto-classify toggle.
pub const LEGACY_AUTO_CLASSIFY_KEY: &str = "isOn";
/// Current key for the group-label list.
pub const GROUP_LABELS_KEY: &str = "GROUP_TYPES";
/// Pre-migration key for the group-label list.
pub const LEGACY_GROUP_LABELS_KEY: &str = "types";

/// A logical configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Credential,
    AutoClassify,
    GroupLabels,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Credential => write!(f, "credential"),
            Field::AutoClassify => write!(f, "auto_classify"),
            Field::GroupLabels => write!(f, "group_labels"),
        }
    }
}

/// One row of the schema table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldKeys {
    pub field: Field,
    /// Newest first. Never empty.
    pub keys: &'static [&'static str],
}

/// The schema table. Adding a schema version means prepending a key to a row.
pub const FIELDS: [FieldKeys; 3] = [
    FieldKeys {
        field: Field::Credential,
        keys: &[CREDENTIAL_KEY, LEGACY_CREDENTIAL_KEY],
    },
    FieldKeys {
        field: Field::AutoClassify,
        keys: &[AUTO_CLASSIFY_KEY, LEGACY_AUTO_CLASSIFY_KEY],
    },
    FieldKeys {
        field: Field::GroupLabels,
        keys: &[GROUP_LABELS_KEY, LEGACY_GROUP_LABELS_KEY],
    },
];

impl Field {
    /// Every physical key for this field, newest first.
    pub fn keys(self) -> &'static [&'static str] {
        FIELDS
            .iter()
            .find(|row| row.field == self)
            .map(|row| row.keys)
            .unwrap_or(&[])
    }

    /// The authoritative key written by the current schema.
    pub fn current_key(self) -> &'static str {
        self.keys()[0]
    }

    /// Keys kept only so older readers still find a value.
    pub fn legacy_keys(self) -> &'static [&'static str] {
        &self.keys()[1..]
    }
}

/// All physical keys across the schema, in table order. Used for the single
/// batched startup read.
pub fn all_keys() -> Vec<&'static str> {
    FIELDS.iter().flat_map(|row| row.keys.iter().copied()).collect()
}

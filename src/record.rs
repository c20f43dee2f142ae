//! Editable records: new drafts versus records the server already holds.
//!
//! Whether a save creates or updates is decided by the [`Draft`] variant
//! the caller holds, never by inspecting the record's fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned audit fields carried by every persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub last_update_by: String,
    pub last_update_datetime: DateTime<Utc>,
}

/// A record the server has stored, with its audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persisted<T> {
    pub record: T,
    pub audit: Audit,
}

/// A record open for editing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Draft<T> {
    /// Not yet stored; saving creates it.
    New(T),
    /// Already stored; saving updates it.
    Persisted(Persisted<T>),
}

impl<T> Draft<T> {
    /// The record being edited, whichever variant holds it.
    pub fn record(&self) -> &T {
        match self {
            Draft::New(record) => record,
            Draft::Persisted(persisted) => &persisted.record,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Draft::New(_))
    }

    /// Audit fields, present only for persisted drafts.
    pub fn audit(&self) -> Option<&Audit> {
        match self {
            Draft::New(_) => None,
            Draft::Persisted(persisted) => Some(&persisted.audit),
        }
    }
}

impl<T> From<Persisted<T>> for Draft<T> {
    fn from(persisted: Persisted<T>) -> Self {
        Draft::Persisted(persisted)
    }
}

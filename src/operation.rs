//! The versioned operation envelope every slice embeds.
//!
//! An [`OperationState`] records which operation ran last, when it started
//! and ended, and how it failed (if it did). Whether an operation is in
//! flight is encoded purely in the timestamp ordering; [`Phase`] gives that
//! encoding an explicit shape.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Timestamp value meaning "never happened".
pub const NEVER: i64 = -1;

/// Version of a freshly created (or reset) container.
pub const INITIAL_VERSION: u64 = 1;

/// The set of operations a slice can record.
///
/// Implemented by a small `Copy` enum per slice whose `Default` variant is
/// `None`, the kind of a container nothing has been dispatched to yet.
pub trait OperationKind:
    Copy + Default + Eq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> OperationKind for T where
    T: Copy + Default + Eq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Versioned operation envelope.
///
/// # Invariants
///
/// - `version >= 1` and every committed write increases it by exactly one.
/// - At a stable snapshot either both timestamps are [`NEVER`] (nothing ran
///   yet), or `operation_start_time > operation_end_time` (in flight), or
///   `operation_end_time > operation_start_time` (last operation finished).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationState<K> {
    pub version: u64,
    pub operation_start_time: i64,
    pub operation_end_time: i64,
    pub operation_kind: K,
    pub last_failure: Option<Message>,
}

impl<K: OperationKind> Default for OperationState<K> {
    fn default() -> Self {
        Self {
            version: INITIAL_VERSION,
            operation_start_time: NEVER,
            operation_end_time: NEVER,
            operation_kind: K::default(),
            last_failure: None,
        }
    }
}

/// Where a container is in its operation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase<'a, K> {
    /// No operation has run since creation or the last reset.
    Idle,
    /// An operation of `kind` has started and not yet finished.
    InFlight { kind: K },
    /// The most recent operation finished, successfully when `failure` is
    /// `None`.
    Completed {
        kind: K,
        failure: Option<&'a Message>,
    },
}

impl<K: OperationKind> OperationState<K> {
    /// Derive the lifecycle phase from the timestamp ordering.
    pub fn phase(&self) -> Phase<'_, K> {
        let kind = self.operation_kind;
        if self.operation_start_time > self.operation_end_time {
            Phase::InFlight { kind }
        } else if self.operation_end_time > self.operation_start_time {
            Phase::Completed {
                kind,
                failure: self.last_failure.as_ref(),
            }
        } else {
            Phase::Idle
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.phase(), Phase::InFlight { .. })
    }

    /// Stamp the start of an operation of `kind`.
    ///
    /// The start time is forced past both previous timestamps so the
    /// in-flight inequality holds even when the clock has not moved.
    /// Clears `last_failure`. Does not touch `version`; that is assigned
    /// when the snapshot is committed.
    pub(crate) fn begin(&mut self, kind: K, now: i64) {
        let floor = self.operation_start_time.max(self.operation_end_time) + 1;
        self.operation_kind = kind;
        self.operation_start_time = now.max(floor);
        self.last_failure = None;
    }

    /// Stamp the end of the current operation, recording `failure`.
    ///
    /// The end time is forced past the start time.
    pub(crate) fn finish(&mut self, now: i64, failure: Option<Message>) {
        self.operation_end_time = now.max(self.operation_start_time + 1);
        self.last_failure = failure;
    }
}

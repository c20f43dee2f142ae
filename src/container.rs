//! Observable holder of one slice's snapshot.
//!
//! A [`Container`] owns the current snapshot of a [`Slice`] in a
//! `tokio::sync::watch` channel. Every write replaces the whole snapshot,
//! so readers never see a half-applied transition. Dispatch runs the
//! slice's handler on the caller's task; handlers write through a
//! [`Transition`], which assigns versions and timestamps.
//!
//! Public API: [`Container`] (cloneable handle) and [`Transition`] (the
//! write side handed to handlers).

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::Instrument;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::RemoteFailure;
use crate::message::Message;
use crate::slice::Slice;

struct Inner<S: Slice> {
    state: watch::Sender<S>,
    remote: Arc<S::Remote>,
    clock: Arc<dyn Clock>,
}

/// Cloneable handle to a slice's state container.
///
/// All clones share the same snapshot and version sequence. Containers of
/// different slices are fully independent.
///
/// # Type Parameters
///
/// * `S` - The [`Slice`] this container holds.
pub struct Container<S: Slice> {
    inner: Arc<Inner<S>>,
}

// Manual `Clone`: only the `Arc` is cloned, `S` need not be.
impl<S: Slice> Clone for Container<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Slice> fmt::Debug for Container<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("slice", &S::NAME)
            .field("version", &self.version())
            .finish()
    }
}

impl<S: Slice> Container<S> {
    /// Create a container holding `S::default()`.
    ///
    /// # Arguments
    ///
    /// * `remote` - The collaborator the slice's handlers call.
    /// * `clock` - Source of operation timestamps.
    pub fn new(remote: Arc<S::Remote>, clock: Arc<dyn Clock>) -> Self {
        let (state, _) = watch::channel(S::default());
        Self {
            inner: Arc::new(Inner {
                state,
                remote,
                clock,
            }),
        }
    }

    /// Dispatch one intent and wait for its handler to finish.
    ///
    /// The handler writes its "before" snapshot immediately and its "after"
    /// snapshot once the remote call resolves. Remote failures end up in
    /// `last_failure`; this method itself never fails.
    ///
    /// Concurrent dispatches to the same container are not serialized:
    /// each performs its own writes and the last write wins.
    pub async fn dispatch(&self, intent: S::Intent) {
        let kind = S::kind_of(&intent);
        let span = tracing::info_span!(
            "dispatch",
            slice = S::NAME,
            kind = ?kind,
            dispatch_id = %Uuid::new_v4(),
        );
        let tx = Transition {
            container: self,
            kind,
        };
        S::handle(&tx, intent).instrument(span).await;
    }

    /// A clone of the current snapshot.
    pub fn read(&self) -> S {
        self.inner.state.borrow().clone()
    }

    /// The current snapshot version.
    pub fn version(&self) -> u64 {
        self.inner.state.borrow().operation().version
    }

    /// Subscribe to snapshot changes.
    ///
    /// The receiver starts with the current snapshot marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.inner.state.subscribe()
    }

    /// Snapshot changes as a stream. Yields the current snapshot first.
    pub fn updates(&self) -> WatchStream<S> {
        WatchStream::new(self.subscribe())
    }

    /// Restore the initial snapshot (`version = 1`, no operation, no result).
    ///
    /// Used on sign-out. An in-flight handler that finishes afterwards still
    /// writes its "after" snapshot.
    pub fn reset(&self) {
        self.inner.state.send_replace(S::default());
        tracing::info!(slice = S::NAME, "container reset");
    }

    /// Replace the stored snapshot with `snapshot`, assigning it the next
    /// version. Returns the snapshot as committed.
    fn commit(&self, mut snapshot: S) -> S {
        self.inner.state.send_modify(|stored| {
            snapshot.operation_mut().version = stored.operation().version + 1;
            *stored = snapshot.clone();
        });
        let op = snapshot.operation();
        tracing::debug!(
            slice = S::NAME,
            version = op.version,
            kind = ?op.operation_kind,
            start = op.operation_start_time,
            end = op.operation_end_time,
            "snapshot committed"
        );
        snapshot
    }
}

/// Write side of one dispatch, handed to [`Slice::handle`].
///
/// Carries the operation kind derived from the dispatched intent.
pub struct Transition<'a, S: Slice> {
    container: &'a Container<S>,
    kind: S::Kind,
}

impl<S: Slice> Transition<'_, S> {
    /// The operation kind this dispatch records.
    pub fn kind(&self) -> S::Kind {
        self.kind
    }

    /// A clone of the container's current snapshot.
    pub fn current(&self) -> S {
        self.container.read()
    }

    /// The slice's remote collaborator.
    pub fn remote(&self) -> &S::Remote {
        &self.container.inner.remote
    }

    /// Write the "before" snapshot.
    ///
    /// Starts from the current snapshot, stamps the start time and
    /// operation kind, clears `last_failure`, applies `prepare` (optimistic
    /// resets), and commits.
    ///
    /// # Returns
    ///
    /// The committed "before" snapshot, to be passed to
    /// [`finish`](Transition::finish).
    pub fn begin(&self, prepare: impl FnOnce(&mut S)) -> S {
        let mut before = self.current();
        let now = self.container.inner.clock.now_millis();
        before.operation_mut().begin(self.kind, now);
        prepare(&mut before);
        self.container.commit(before)
    }

    /// Write the "after" snapshot derived from `before`.
    ///
    /// `apply` copies result-derived fields into the snapshot. If it
    /// returns `Err`, the failure becomes `last_failure`; `apply` must not
    /// have touched any field in that case (or must have restored it).
    ///
    /// # Returns
    ///
    /// The committed "after" snapshot.
    pub fn finish(
        &self,
        before: S,
        apply: impl FnOnce(&mut S) -> Result<(), RemoteFailure>,
    ) -> S {
        let mut after = before;
        let failure = match apply(&mut after) {
            Ok(()) => None,
            Err(failure) => {
                tracing::warn!(
                    slice = S::NAME,
                    kind = ?self.kind,
                    code = %failure.code,
                    "operation failed"
                );
                Some(Message::from(failure))
            }
        };
        let now = self.container.inner.clock.now_millis();
        after.operation_mut().finish(now, failure);
        self.container.commit(after)
    }

    /// Run an operation that needs no remote call.
    ///
    /// Still writes a "before" and an "after" snapshot so observers see a
    /// start/complete pulse.
    pub fn local(&self, apply: impl FnOnce(&mut S) -> Result<(), RemoteFailure>) -> S {
        let before = self.begin(|_| {});
        self.finish(before, apply)
    }
}

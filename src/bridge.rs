//! Notification bridge: turns container version changes into
//! "operation started" / "operation completed" callbacks.
//!
//! [`NotificationBridge`] is the pure reconciler. It remembers the last
//! version it reacted to and fires at most one callback per distinct
//! version. [`spawn_bridge`] runs one in a background task fed by the
//! container's watch channel, and [`BridgeHandle`] stops it.
//!
//! A watch channel only keeps the latest value, so when two writes land
//! before the bridge task runs, the intermediate version is never seen.
//! The bridge reacts to the newest snapshot only; skipped versions are
//! absorbed silently.
//!
//! Versions restart at 1 on reset, so the background task can wake to a
//! snapshot carrying the version it last reacted to. Since the watch
//! channel only wakes on a write, that snapshot is treated as new
//! (see [`NotificationBridge::observe_write`]).

use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::watch;

use crate::container::Container;
use crate::error::BridgeError;
use crate::operation::Phase;
use crate::slice::Slice;

/// Receives the bridge's callbacks.
pub trait Observer<S: Slice>: Send {
    /// An operation started (the snapshot is in flight).
    fn on_start(&mut self);

    /// An operation of `kind` finished. Inspect `snapshot.operation().last_failure`
    /// to tell success from failure.
    fn on_complete(&mut self, kind: S::Kind, snapshot: &S);

    /// The container went back to its initial snapshot (e.g. after reset).
    /// Any operation the observer believed in flight is gone.
    fn on_settled(&mut self) {}
}

/// What [`NotificationBridge::observe`] did with a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Same version as last time; nothing fired.
    Unchanged,
    /// New version, in flight; `on_start` fired.
    Started,
    /// New version, finished; `on_complete` fired.
    Completed,
    /// New version with no operation recorded (e.g. after reset);
    /// `on_settled` fired.
    Settled,
}

/// Reconciles snapshots into at most one callback per version.
#[derive(Debug)]
pub struct NotificationBridge<S: Slice> {
    last_version: u64,
    _marker: PhantomData<fn() -> S>,
}

impl<S: Slice> NotificationBridge<S> {
    /// Create a bridge that treats `current` as already seen.
    pub fn new(current: &S) -> Self {
        Self {
            last_version: current.operation().version,
            _marker: PhantomData,
        }
    }

    /// The last version this bridge reacted to.
    pub fn last_version(&self) -> u64 {
        self.last_version
    }

    /// React to `snapshot`.
    ///
    /// Fires `on_start` if the version changed and the snapshot is in
    /// flight, `on_complete` if it changed and the last operation finished.
    /// The remembered version is updated whichever branch is taken.
    pub fn observe<O>(&mut self, snapshot: &S, observer: &mut O) -> Reaction
    where
        O: Observer<S> + ?Sized,
    {
        if snapshot.operation().version == self.last_version {
            return Reaction::Unchanged;
        }
        self.react(snapshot, observer)
    }

    /// React to `snapshot`, given that at least one write happened since the
    /// previous call.
    ///
    /// Unlike [`observe`](NotificationBridge::observe), a snapshot carrying
    /// the remembered version is not skipped: the container must have been
    /// reset and written back up to the same number in between.
    pub fn observe_write<O>(&mut self, snapshot: &S, observer: &mut O) -> Reaction
    where
        O: Observer<S> + ?Sized,
    {
        if snapshot.operation().version == self.last_version {
            tracing::debug!(
                slice = S::NAME,
                version = self.last_version,
                "version reused after reset"
            );
        }
        self.react(snapshot, observer)
    }

    fn react<O>(&mut self, snapshot: &S, observer: &mut O) -> Reaction
    where
        O: Observer<S> + ?Sized,
    {
        let op = snapshot.operation();
        self.last_version = op.version;
        match op.phase() {
            Phase::InFlight { .. } => {
                observer.on_start();
                Reaction::Started
            }
            Phase::Completed { kind, .. } => {
                observer.on_complete(kind, snapshot);
                Reaction::Completed
            }
            Phase::Idle => {
                observer.on_settled();
                Reaction::Settled
            }
        }
    }
}

/// An [`Observer`] built from two closures.
///
/// # Examples
///
/// ```
/// use opstate::FnObserver;
///
/// let observer = FnObserver::new(
///     || println!("started"),
///     |kind: u8, _snapshot: &String| println!("completed {kind}"),
/// );
/// # let _ = observer;
/// ```
pub struct FnObserver<F, G> {
    on_start: F,
    on_complete: G,
}

impl<F, G> FnObserver<F, G> {
    pub fn new(on_start: F, on_complete: G) -> Self {
        Self {
            on_start,
            on_complete,
        }
    }
}

impl<S, F, G> Observer<S> for FnObserver<F, G>
where
    S: Slice,
    F: FnMut() + Send,
    G: FnMut(S::Kind, &S) + Send,
{
    fn on_start(&mut self) {
        (self.on_start)();
    }

    fn on_complete(&mut self, kind: S::Kind, snapshot: &S) {
        (self.on_complete)(kind, snapshot);
    }
}

/// Handle for a running bridge task.
///
/// Dropping the handle does **not** stop the task; it ends on its own when
/// every clone of the container is dropped. Call
/// [`shutdown`](BridgeHandle::shutdown) to stop it explicitly.
///
/// `Clone` is cheap: all fields are `Arc`-wrapped.
#[derive(Clone)]
pub struct BridgeHandle {
    shutdown_tx: Arc<watch::Sender<bool>>,
    task: Arc<tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>>,
}

impl BridgeHandle {
    /// Signal the task to stop and wait for it to exit.
    ///
    /// Calling `shutdown` more than once is safe; later calls return
    /// `Ok(())` immediately.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Join`] if the task panicked (e.g. inside an
    /// observer callback).
    pub async fn shutdown(&self) -> Result<(), BridgeError> {
        let _ = self.shutdown_tx.send(true);
        let task = self.task.lock().await.take();
        match task {
            Some(join_handle) => Ok(join_handle.await?),
            None => Ok(()),
        }
    }

    /// `true` until the task has exited.
    pub fn is_running(&self) -> bool {
        match self.task.try_lock() {
            Ok(guard) => guard.as_ref().is_some_and(|task| !task.is_finished()),
            // Someone is in `shutdown`.
            Err(_) => false,
        }
    }
}

/// Run a [`NotificationBridge`] for `container` on a background task.
///
/// The bridge is initialised to the container's version at the time of
/// this call, so only later writes produce callbacks.
///
/// # Arguments
///
/// * `container` - The container to watch.
/// * `observer` - Receives `on_start` / `on_complete`.
///
/// # Returns
///
/// A [`BridgeHandle`] for stopping the task.
pub fn spawn_bridge<S, O>(container: &Container<S>, mut observer: O) -> BridgeHandle
where
    S: Slice,
    O: Observer<S> + 'static,
{
    let mut rx = container.subscribe();
    let mut bridge = NotificationBridge::<S>::new(&rx.borrow());
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    tracing::info!(
        slice = S::NAME,
        version = bridge.last_version(),
        "notification bridge started"
    );

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        // Every container handle was dropped.
                        break;
                    }
                    let snapshot = rx.borrow_and_update().clone();
                    let reaction = bridge.observe_write(&snapshot, &mut observer);
                    tracing::trace!(
                        slice = S::NAME,
                        version = bridge.last_version(),
                        ?reaction,
                        "bridge observed snapshot"
                    );
                }
                _ = shutdown_rx.changed() => break,
            }
        }
        tracing::info!(slice = S::NAME, "notification bridge stopped");
    });

    BridgeHandle {
        shutdown_tx: Arc::new(shutdown_tx),
        task: Arc::new(tokio::sync::Mutex::new(Some(task))),
    }
}

//! Spinner and toast plumbing layered on top of the notification bridge.
//!
//! [`Spinner`] is a reference-counted busy indicator. [`Toast`]s are built
//! from [`Message`]s according to [`NotifyConfig`]: errors stay up until
//! dismissed, successes go away on their own. [`StatusObserver`] wires both
//! to a container through the bridge.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bridge::Observer;
use crate::message::{Message, MessageKind};
use crate::slice::Slice;

/// Something that can show and hide a busy indicator.
///
/// Only [`Spinner`] calls these, and only on the 0 -> 1 and 1 -> 0 edges of
/// its count, so a view never sees two `show`s in a row.
pub trait SpinnerView: Send + Sync {
    /// Make the indicator visible.
    fn show(&self);

    /// Hide the indicator.
    fn hide(&self);
}

/// Reference-counted busy indicator.
///
/// [`show`](Spinner::show) increments the count and shows the view on
/// 0 -> 1; [`stop`](Spinner::stop) decrements and hides on 1 -> 0. The count
/// never goes below zero. Clones share the count, so one spinner can be
/// driven by several containers.
#[derive(Clone)]
pub struct Spinner {
    count: Arc<Mutex<usize>>,
    view: Arc<dyn SpinnerView>,
}

impl fmt::Debug for Spinner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spinner")
            .field("active", &self.active())
            .finish()
    }
}

impl Spinner {
    /// A hidden spinner driving `view`.
    pub fn new(view: Arc<dyn SpinnerView>) -> Self {
        Self {
            count: Arc::new(Mutex::new(0)),
            view,
        }
    }

    /// Register one more busy caller, showing the view if it was hidden.
    pub fn show(&self) {
        let mut count = self.lock();
        *count += 1;
        if *count == 1 {
            self.view.show();
        }
    }

    /// Release one busy caller, hiding the view when none remain.
    ///
    /// Does nothing when the count is already zero.
    pub fn stop(&self) {
        let mut count = self.lock();
        if *count == 0 {
            return;
        }
        *count -= 1;
        if *count == 0 {
            self.view.hide();
        }
    }

    /// Number of outstanding `show` calls.
    pub fn active(&self) -> usize {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, usize> {
        // The count stays valid even if a view callback panicked.
        self.count.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A message ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub message: Message,
    /// `None` means the toast stays until the user dismisses it.
    pub dismiss_after: Option<Duration>,
}

/// Where toasts go.
pub trait Notifier: Send + Sync {
    /// Display `toast`.
    fn notify(&self, toast: Toast);
}

/// Notification settings.
///
/// All fields have defaults, so a partial JSON document is accepted.
///
/// # Examples
///
/// ```
/// use opstate::NotifyConfig;
///
/// let config = NotifyConfig::from_json(r#"{"success_toast_millis": 1500}"#).unwrap();
/// assert_eq!(config.success_toast_millis, 1500);
/// assert!(config.sticky_errors);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// How long a success toast stays up.
    ///
    /// Default: 3000 ms.
    pub success_toast_millis: u64,

    /// When `true`, error toasts stay until dismissed.
    ///
    /// Default: `true`.
    pub sticky_errors: bool,

    /// How long an error toast stays up when `sticky_errors` is `false`.
    ///
    /// Default: 10000 ms.
    pub error_toast_millis: u64,

    /// Whether [`StatusObserver`] drives the spinner.
    ///
    /// Default: `true`.
    pub spinner: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            success_toast_millis: 3_000,
            sticky_errors: true,
            error_toast_millis: 10_000,
            spinner: true,
        }
    }
}

impl NotifyConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Build the toast for `message` according to its kind.
    pub fn toast_for(&self, message: Message) -> Toast {
        let dismiss_after = match message.kind {
            MessageKind::Success => Some(Duration::from_millis(self.success_toast_millis)),
            MessageKind::Error if self.sticky_errors => None,
            MessageKind::Error => Some(Duration::from_millis(self.error_toast_millis)),
        };
        Toast {
            message,
            dismiss_after,
        }
    }
}

/// Stock observer: spinner on start, spinner off plus a toast on completion.
///
/// On completion it shows the error toast for `last_failure`, or the slice's
/// [`completion_message`](Slice::completion_message) as a success toast.
///
/// The observer holds at most one spinner reference at a time. The bridge
/// can report two starts in a row when it misses the completion between
/// them, and a completion or reset without a start it saw; the spinner is
/// only shown on the first start and only stopped if it was shown.
pub struct StatusObserver<S> {
    spinner: Option<Spinner>,
    notifier: Arc<dyn Notifier>,
    config: NotifyConfig,
    in_flight: bool,
    _marker: PhantomData<fn() -> S>,
}

impl<S: Slice> StatusObserver<S> {
    /// # Arguments
    ///
    /// * `spinner` - Shared spinner; ignored when `config.spinner` is `false`.
    /// * `notifier` - Toast sink.
    /// * `config` - Toast durations and spinner switch.
    pub fn new(spinner: Spinner, notifier: Arc<dyn Notifier>, config: NotifyConfig) -> Self {
        Self {
            spinner: config.spinner.then_some(spinner),
            notifier,
            config,
            in_flight: false,
            _marker: PhantomData,
        }
    }

    fn release(&mut self) {
        if !std::mem::replace(&mut self.in_flight, false) {
            return;
        }
        if let Some(spinner) = &self.spinner {
            spinner.stop();
        }
    }
}

impl<S: Slice> Observer<S> for StatusObserver<S> {
    fn on_start(&mut self) {
        if std::mem::replace(&mut self.in_flight, true) {
            return;
        }
        if let Some(spinner) = &self.spinner {
            spinner.show();
        }
    }

    fn on_complete(&mut self, kind: S::Kind, snapshot: &S) {
        self.release();
        let message = match &snapshot.operation().last_failure {
            Some(failure) => Some(failure.clone()),
            None => S::completion_message(kind),
        };
        if let Some(message) = message {
            tracing::debug!(slice = S::NAME, key = %message.key, "showing toast");
            self.notifier.notify(self.config.toast_for(message));
        }
    }

    fn on_settled(&mut self) {
        self.release();
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use std::sync::Mutex;

    use super::{Notifier, SpinnerView, Toast};

    /// Records spinner transitions as strings.
    #[derive(Default)]
    pub(crate) struct RecordingView {
        pub calls: Mutex<Vec<&'static str>>,
    }

    impl SpinnerView for RecordingView {
        fn show(&self) {
            self.calls.lock().unwrap().push("show");
        }

        fn hide(&self) {
            self.calls.lock().unwrap().push("hide");
        }
    }

    /// Collects toasts.
    #[derive(Default)]
    pub(crate) struct RecordingNotifier {
        pub toasts: Mutex<Vec<Toast>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, toast: Toast) {
            self.toasts.lock().unwrap().push(toast);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Notify;

    use super::test_fixtures::{RecordingNotifier, RecordingView};
    use super::*;
    use crate::bridge::{BridgeHandle, NotificationBridge, spawn_bridge};
    use crate::clock::ManualClock;
    use crate::container::Container;
    use crate::operation::OperationState;
    use crate::slice::test_fixtures::{ScriptedShelf, Shelf, ShelfIntent, ShelfOp, ShelfRemote};

    #[test]
    fn spinner_shows_on_first_and_hides_on_last() {
        let view = Arc::new(RecordingView::default());
        let spinner = Spinner::new(view.clone());

        spinner.show();
        spinner.show();
        assert_eq!(spinner.active(), 2);
        spinner.stop();
        spinner.stop();

        assert_eq!(*view.calls.lock().unwrap(), vec!["show", "hide"]);
    }

    #[test]
    fn spinner_never_goes_negative() {
        let view = Arc::new(RecordingView::default());
        let spinner = Spinner::new(view.clone());

        spinner.stop();
        assert_eq!(spinner.active(), 0);
        spinner.show();

        assert_eq!(*view.calls.lock().unwrap(), vec!["show"]);
        assert_eq!(spinner.active(), 1);
    }

    #[test]
    fn spinner_clones_share_count() {
        let view = Arc::new(RecordingView::default());
        let a = Spinner::new(view.clone());
        let b = a.clone();
        a.show();
        b.show();
        a.stop();
        assert_eq!(b.active(), 1);
        assert_eq!(*view.calls.lock().unwrap(), vec!["show"]);
    }

    #[test]
    fn success_toast_auto_dismisses_error_toast_sticks() {
        let config = NotifyConfig::default();
        let ok = config.toast_for(Message::success("saved"));
        let err = config.toast_for(Message::error("DUPLICATE_CODE"));
        assert_eq!(ok.dismiss_after, Some(Duration::from_millis(3_000)));
        assert_eq!(err.dismiss_after, None);
    }

    #[test]
    fn non_sticky_errors_use_error_duration() {
        let config = NotifyConfig {
            sticky_errors: false,
            ..NotifyConfig::default()
        };
        let err = config.toast_for(Message::error("X"));
        assert_eq!(err.dismiss_after, Some(Duration::from_millis(10_000)));
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config = NotifyConfig::from_json("{}").unwrap();
        assert_eq!(config, NotifyConfig::default());
        assert!(NotifyConfig::from_json("not json").is_err());
    }

    fn done(version: u64, failure: Option<Message>) -> Shelf {
        Shelf {
            op: OperationState {
                version,
                operation_start_time: 1,
                operation_end_time: 2,
                operation_kind: ShelfOp::Load,
                last_failure: failure,
            },
            ..Shelf::default()
        }
    }

    fn in_flight(version: u64) -> Shelf {
        Shelf {
            op: OperationState {
                version,
                operation_start_time: 1,
                operation_end_time: -1,
                operation_kind: ShelfOp::Load,
                last_failure: None,
            },
            ..Shelf::default()
        }
    }

    #[test]
    fn status_observer_success_path() {
        let view = Arc::new(RecordingView::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let mut observer = StatusObserver::<Shelf>::new(
            Spinner::new(view.clone()),
            notifier.clone(),
            NotifyConfig::default(),
        );
        let mut bridge = NotificationBridge::new(&Shelf::default());

        bridge.observe(&in_flight(2), &mut observer);
        bridge.observe(&done(3, None), &mut observer);

        assert_eq!(*view.calls.lock().unwrap(), vec!["show", "hide"]);
        let toasts = notifier.toasts.lock().unwrap();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].message.key, "shelf.load.success");
        assert!(toasts[0].dismiss_after.is_some());
    }

    #[test]
    fn status_observer_failure_path() {
        let view = Arc::new(RecordingView::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let mut observer = StatusObserver::<Shelf>::new(
            Spinner::new(view.clone()),
            notifier.clone(),
            NotifyConfig::default(),
        );
        let mut bridge = NotificationBridge::new(&Shelf::default());

        bridge.observe(&in_flight(2), &mut observer);
        bridge.observe(&done(3, Some(Message::error("LOCKED"))), &mut observer);

        let toasts = notifier.toasts.lock().unwrap();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].message.key, "LOCKED");
        assert_eq!(toasts[0].dismiss_after, None);
    }

    #[test]
    fn spinner_can_be_switched_off() {
        let view = Arc::new(RecordingView::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let mut observer = StatusObserver::<Shelf>::new(
            Spinner::new(view.clone()),
            notifier,
            NotifyConfig {
                spinner: false,
                ..NotifyConfig::default()
            },
        );
        let mut bridge = NotificationBridge::new(&Shelf::default());
        bridge.observe(&in_flight(2), &mut observer);

        assert!(view.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn consecutive_starts_hold_one_spinner_reference() {
        let view = Arc::new(RecordingView::default());
        let spinner = Spinner::new(view.clone());
        let notifier = Arc::new(RecordingNotifier::default());
        let mut observer =
            StatusObserver::<Shelf>::new(spinner.clone(), notifier.clone(), NotifyConfig::default());
        let mut bridge = NotificationBridge::new(&Shelf::default());

        // The end of the first load (v3) was never observed.
        bridge.observe(&in_flight(2), &mut observer);
        bridge.observe(&in_flight(4), &mut observer);
        bridge.observe(&done(5, None), &mut observer);

        assert_eq!(spinner.active(), 0);
        assert_eq!(*view.calls.lock().unwrap(), vec!["show", "hide"]);
        assert_eq!(notifier.toasts.lock().unwrap().len(), 1);
    }

    #[test]
    fn reset_while_in_flight_releases_the_spinner() {
        let view = Arc::new(RecordingView::default());
        let spinner = Spinner::new(view.clone());
        let notifier = Arc::new(RecordingNotifier::default());
        let mut observer =
            StatusObserver::<Shelf>::new(spinner.clone(), notifier.clone(), NotifyConfig::default());
        let mut bridge = NotificationBridge::new(&Shelf::default());

        bridge.observe(&in_flight(2), &mut observer);
        bridge.observe(&Shelf::default(), &mut observer);
        assert_eq!(spinner.active(), 0);

        // The handler parked before the reset still writes its "after".
        bridge.observe(&done(2, None), &mut observer);

        assert_eq!(spinner.active(), 0);
        assert_eq!(*view.calls.lock().unwrap(), vec!["show", "hide"]);
        assert_eq!(notifier.toasts.lock().unwrap().len(), 1);
    }

    async fn until(mut done: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !done() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    struct Watched {
        container: Container<Shelf>,
        gate: Arc<Notify>,
        spinner: Spinner,
        view: Arc<RecordingView>,
        notifier: Arc<RecordingNotifier>,
        bridge: BridgeHandle,
    }

    fn watched_shelf() -> Watched {
        let gate = Arc::new(Notify::new());
        let remote: Arc<dyn ShelfRemote> = Arc::new(ScriptedShelf {
            gate: Some(gate.clone()),
            ..ScriptedShelf::with_items(&["a"])
        });
        let container: Container<Shelf> = Container::new(remote, Arc::new(ManualClock::new(0)));
        let view = Arc::new(RecordingView::default());
        let spinner = Spinner::new(view.clone());
        let notifier = Arc::new(RecordingNotifier::default());
        let observer =
            StatusObserver::<Shelf>::new(spinner.clone(), notifier.clone(), NotifyConfig::default());
        let bridge = spawn_bridge(&container, observer);
        Watched {
            container,
            gate,
            spinner,
            view,
            notifier,
            bridge,
        }
    }

    #[tokio::test]
    async fn spinner_hides_after_back_to_back_dispatches() {
        let Watched {
            container,
            gate,
            spinner,
            view,
            notifier,
            bridge,
        } = watched_shelf();
        let mut rx = container.subscribe();

        let task = tokio::spawn({
            let c = container.clone();
            async move {
                c.dispatch(ShelfIntent::Load).await;
                c.dispatch(ShelfIntent::Load).await;
            }
        });

        until(|| spinner.active() == 1).await;
        gate.notify_one();
        rx.wait_for(|s| s.op.version >= 4).await.unwrap();
        gate.notify_one();
        task.await.unwrap();

        // Dropping the last handle lets the bridge drain and exit.
        drop(rx);
        drop(container);
        until(|| !bridge.is_running()).await;

        assert_eq!(spinner.active(), 0);
        let calls = view.calls.lock().unwrap();
        assert_eq!(calls.first(), Some(&"show"));
        assert_eq!(calls.last(), Some(&"hide"));
        assert!(!notifier.toasts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn spinner_hides_when_reset_lands_mid_operation() {
        let Watched {
            container,
            gate,
            spinner,
            view,
            notifier,
            bridge,
        } = watched_shelf();

        let task = tokio::spawn({
            let c = container.clone();
            async move { c.dispatch(ShelfIntent::Load).await }
        });

        until(|| spinner.active() == 1).await;
        container.reset();
        gate.notify_one();
        task.await.unwrap();
        // Reset took the version back to 1, so the "after" is version 2 again.
        assert_eq!(container.version(), 2);

        drop(container);
        until(|| !bridge.is_running()).await;

        assert_eq!(spinner.active(), 0);
        assert_eq!(*view.calls.lock().unwrap(), vec!["show", "hide"]);
        let toasts = notifier.toasts.lock().unwrap();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].message.key, "shelf.load.success");
    }
}

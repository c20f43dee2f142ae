//! Operation-tracked state containers with once-per-version change
//! notification.
//!
//! Every domain slice holds a snapshot that embeds an [`OperationState`]:
//! a version, start/end timestamps, the kind of the last operation and its
//! failure. Handlers move a slice through a "before" write (operation in
//! flight) and an "after" write (operation finished) via a [`Transition`].
//! A [`NotificationBridge`] turns those version changes into spinner and
//! toast callbacks, at most once per version.

mod bridge;
mod clock;
mod container;
pub mod domain;
mod error;
mod message;
mod notify;
mod operation;
mod record;
mod remote;
mod session;
mod slice;

pub use bridge::{BridgeHandle, FnObserver, NotificationBridge, Observer, Reaction, spawn_bridge};
pub use clock::{Clock, ManualClock, SystemClock};
pub use container::{Container, Transition};
pub use error::{BridgeError, FailureClass, NOT_FOUND, RemoteFailure, SYSTEM_ERROR, SessionError};
pub use message::{Message, MessageKind};
pub use notify::{Notifier, NotifyConfig, Spinner, SpinnerView, StatusObserver, Toast};
pub use operation::{INITIAL_VERSION, NEVER, OperationKind, OperationState, Phase};
pub use record::{Audit, Draft, Persisted};
pub use remote::{RemoteResult, decode_failure, decode_response};
pub use session::{Session, SessionBuilder};
pub use slice::Slice;

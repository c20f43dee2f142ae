//! Top-level entry point holding one container per registered slice.
//!
//! A [`Session`] is opened via [`SessionBuilder`], which takes each slice's
//! remote collaborator, the clock, and the notification settings. Sessions
//! are explicit values; nothing here is a global.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

use crate::bridge::{BridgeHandle, spawn_bridge};
use crate::clock::{Clock, SystemClock};
use crate::container::Container;
use crate::domain::auth::{AuthIntent, AuthState};
use crate::error::{BridgeError, SessionError};
use crate::notify::{Notifier, NotifyConfig, Spinner, StatusObserver};
use crate::slice::Slice;

/// Type-erased container map keyed by slice type.
///
/// `Box<dyn Any + Send + Sync>` lets one map hold `Container<S>` for any
/// concrete `S`; downcasting recovers the typed handle.
type ContainerMap = HashMap<TypeId, Box<dyn Any + Send + Sync>>;

/// Object-safe view of a container used for session-wide resets.
trait ResetSlice: Send + Sync {
    fn name(&self) -> &'static str;
    fn reset(&self);
}

impl<S: Slice> ResetSlice for Container<S> {
    fn name(&self) -> &'static str {
        S::NAME
    }

    fn reset(&self) {
        Container::reset(self);
    }
}

/// Builds a typed container once the clock is known.
type ContainerFactory = Box<dyn FnOnce(Arc<dyn Clock>) -> Registered + Send>;

struct Registered {
    type_id: TypeId,
    name: &'static str,
    container: Box<dyn Any + Send + Sync>,
    reset: Arc<dyn ResetSlice>,
}

/// The set of slice containers for one signed-in console session.
///
/// `Clone` is cheap -- all internal state is `Arc`-wrapped.
#[derive(Clone)]
pub struct Session {
    containers: Arc<ContainerMap>,
    resets: Arc<Vec<Arc<dyn ResetSlice>>>,
    notify_config: NotifyConfig,
    bridges: Arc<tokio::sync::Mutex<Vec<BridgeHandle>>>,
}

// Manual `Debug` because `dyn Any` is not `Debug`.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("slices", &self.slices())
            .finish()
    }
}

impl Session {
    /// Start configuring a session.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// The container for slice `S`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotRegistered`] if `S` was not registered on
    /// the builder.
    pub fn container<S: Slice>(&self) -> Result<Container<S>, SessionError> {
        self.containers
            .get(&TypeId::of::<S>())
            .and_then(|boxed| boxed.downcast_ref::<Container<S>>())
            .cloned()
            .ok_or(SessionError::NotRegistered { slice: S::NAME })
    }

    /// Dispatch `intent` to slice `S` and wait for its handler.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotRegistered`] if `S` was not registered.
    /// Remote failures are not errors here; they land in the slice's
    /// `last_failure`.
    pub async fn dispatch<S: Slice>(&self, intent: S::Intent) -> Result<(), SessionError> {
        self.container::<S>()?.dispatch(intent).await;
        Ok(())
    }

    /// Names of the registered slices, in registration order.
    pub fn slices(&self) -> Vec<&'static str> {
        self.resets.iter().map(|r| r.name()).collect()
    }

    /// The settings [`observe`](Session::observe) hands to each
    /// [`StatusObserver`].
    pub fn notify_config(&self) -> &NotifyConfig {
        &self.notify_config
    }

    /// Restore every registered container to its initial snapshot.
    pub fn reset_all(&self) {
        for slice in self.resets.iter() {
            slice.reset();
        }
        tracing::info!(slices = self.resets.len(), "session reset");
    }

    /// Sign the user out, then reset every slice.
    ///
    /// The reset happens even when the server rejects the sign-out: the
    /// local session ends either way.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotRegistered`] if the auth slice is not
    /// registered. No container is reset in that case.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        let auth = self.container::<AuthState>()?;
        auth.dispatch(AuthIntent::SignOut).await;
        if let Some(failure) = auth.read().op.last_failure {
            tracing::warn!(code = %failure.key, "server sign-out failed; resetting anyway");
        }
        self.reset_all();
        Ok(())
    }

    /// Drive `spinner` and `notifier` from slice `S` using the session's
    /// [`NotifyConfig`].
    ///
    /// The bridge is tracked by the session and stopped by
    /// [`shutdown`](Session::shutdown).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotRegistered`] if `S` was not registered.
    pub async fn observe<S: Slice>(
        &self,
        spinner: Spinner,
        notifier: Arc<dyn Notifier>,
    ) -> Result<BridgeHandle, SessionError> {
        let container = self.container::<S>()?;
        let observer = StatusObserver::<S>::new(spinner, notifier, self.notify_config.clone());
        let handle = spawn_bridge(&container, observer);
        self.bridges.lock().await.push(handle.clone());
        Ok(handle)
    }

    /// Stop every bridge started with [`observe`](Session::observe).
    ///
    /// All bridges are signalled even if an earlier one fails to join.
    ///
    /// # Errors
    ///
    /// Returns the first [`BridgeError`] encountered.
    pub async fn shutdown(&self) -> Result<(), BridgeError> {
        let bridges: Vec<BridgeHandle> = self.bridges.lock().await.drain(..).collect();
        let mut first_error = None;
        for bridge in bridges {
            if let Err(e) = bridge.shutdown().await {
                tracing::error!(error = %e, "bridge failed during shutdown");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Builder for [`Session`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use opstate::domain::{ReferenceData, ReferenceDataRemote, ReferenceDataState};
/// use opstate::{ManualClock, RemoteResult, Session};
///
/// struct Fixed;
///
/// #[async_trait::async_trait]
/// impl ReferenceDataRemote for Fixed {
///     async fn reference_data(&self) -> RemoteResult<ReferenceData> {
///         Ok(ReferenceData::default())
///     }
/// }
///
/// let session = Session::builder()
///     .clock(ManualClock::new(0))
///     .slice::<ReferenceDataState>(Arc::new(Fixed))
///     .open()
///     .unwrap();
/// assert_eq!(session.slices(), vec!["reference-data"]);
/// ```
pub struct SessionBuilder {
    clock: Arc<dyn Clock>,
    notify_config: NotifyConfig,
    factories: Vec<ContainerFactory>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    /// A builder with the system clock, default notification settings and
    /// no slices.
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            notify_config: NotifyConfig::default(),
            factories: Vec::new(),
        }
    }

    /// Set the clock used to stamp operation times.
    ///
    /// # Returns
    ///
    /// `self` for method chaining.
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Set toast and spinner behaviour for [`Session::observe`].
    ///
    /// # Returns
    ///
    /// `self` for method chaining.
    pub fn notify_config(mut self, config: NotifyConfig) -> Self {
        self.notify_config = config;
        self
    }

    /// Register slice `S` with the collaborator its handlers call.
    ///
    /// # Type Parameters
    ///
    /// * `S` - A type implementing [`Slice`].
    ///
    /// # Arguments
    ///
    /// * `remote` - The slice's remote collaborator.
    ///
    /// # Returns
    ///
    /// `self` for method chaining.
    pub fn slice<S: Slice>(mut self, remote: Arc<S::Remote>) -> Self {
        self.factories.push(Box::new(move |clock| {
            let container = Container::<S>::new(remote, clock);
            Registered {
                type_id: TypeId::of::<S>(),
                name: S::NAME,
                container: Box::new(container.clone()),
                reset: Arc::new(container),
            }
        }));
        self
    }

    /// Create every registered container.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyRegistered`] if a slice type was
    /// registered more than once.
    pub fn open(self) -> Result<Session, SessionError> {
        let mut containers = ContainerMap::new();
        let mut resets = Vec::with_capacity(self.factories.len());

        for factory in self.factories {
            let registered = factory(Arc::clone(&self.clock));
            match containers.entry(registered.type_id) {
                Entry::Occupied(_) => {
                    return Err(SessionError::AlreadyRegistered {
                        slice: registered.name,
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(registered.container);
                }
            }
            tracing::debug!(slice = registered.name, "slice registered");
            resets.push(registered.reset);
        }

        tracing::info!(slices = resets.len(), "session opened");
        Ok(Session {
            containers: Arc::new(containers),
            resets: Arc::new(resets),
            notify_config: self.notify_config,
            bridges: Arc::new(tokio::sync::Mutex::new(Vec::new())),
        })
    }
}

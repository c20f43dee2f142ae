//! The `Slice` trait: one independently addressable domain state.

use std::fmt;

use async_trait::async_trait;

use crate::container::Transition;
use crate::message::Message;
use crate::operation::{OperationKind, OperationState};

/// A domain slice whose state is held by a [`Container`](crate::Container).
///
/// The implementing type is the slice's full snapshot: an embedded
/// [`OperationState`] plus whatever payload and result fields the slice owns.
/// `Default` is the initial value, restored on reset.
///
/// # Associated Types
///
/// - `Kind`: the operations this slice records in its envelope.
/// - `Intent`: the closed set of requests accepted by `dispatch`. Exactly one
///   variant is active per dispatch.
/// - `Remote`: the external collaborator handlers call (usually a
///   `dyn Trait`).
///
/// # Contract
///
/// [`handle`](Slice::handle) must follow the transition protocol: write a
/// "before" snapshot with [`Transition::begin`], await the remote call, then
/// write an "after" snapshot with [`Transition::finish`]. It must never
/// panic on a remote failure; failures go into `last_failure`.
#[async_trait]
pub trait Slice: Default + Clone + fmt::Debug + Send + Sync + 'static {
    /// Identifies this slice (e.g. `"currency"`). Used in logs and errors.
    const NAME: &'static str;

    /// The operations this slice can record.
    type Kind: OperationKind;

    /// The requests this slice accepts.
    type Intent: Send + 'static;

    /// The remote collaborator handlers call.
    type Remote: ?Sized + Send + Sync + 'static;

    /// The embedded operation envelope.
    fn operation(&self) -> &OperationState<Self::Kind>;

    /// Mutable access to the embedded operation envelope.
    fn operation_mut(&mut self) -> &mut OperationState<Self::Kind>;

    /// The operation kind recorded when `intent` is dispatched.
    fn kind_of(intent: &Self::Intent) -> Self::Kind;

    /// Run the handler for `intent`.
    async fn handle(tx: &Transition<'_, Self>, intent: Self::Intent);

    /// Success message shown when an operation of `kind` completes without
    /// failure. `None` means the completion is silent.
    fn completion_message(kind: Self::Kind) -> Option<Message> {
        let _ = kind;
        None
    }
}


#[cfg(test)]
mod tests {
    use super::Slice;
    use super::test_fixtures::{Shelf, ShelfIntent, ShelfOp};

    #[test]
    fn default_is_initial_state() {
        let shelf = Shelf::default();
        assert_eq!(shelf.operation().version, 1);
        assert_eq!(shelf.items, None);
    }

    #[test]
    fn kind_of_maps_each_intent() {
        assert_eq!(Shelf::kind_of(&ShelfIntent::Load), ShelfOp::Load);
        assert_eq!(
            Shelf::kind_of(&ShelfIntent::Label("x".into())),
            ShelfOp::Label
        );
    }

    #[test]
    fn completion_message_only_for_load() {
        assert!(Shelf::completion_message(ShelfOp::Load).is_some());
        assert!(Shelf::completion_message(ShelfOp::Label).is_none());
    }
}

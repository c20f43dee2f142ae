//! Generic search / view / edit / save slice for reference tables.
//!
//! Currency and function-group maintenance screens share one shape: a
//! search form, a result table, and a drawer holding one record for
//! viewing or editing. [`Maintenance<R>`] is that shape for any
//! [`MaintainedRecord`].

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::container::Transition;
use crate::message::Message;
use crate::operation::OperationState;
use crate::record::{Draft, Persisted};
use crate::remote::RemoteResult;
use crate::slice::Slice;

/// A record type maintained through a [`Maintenance`] slice.
pub trait MaintainedRecord:
    Clone + Default + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Slice name (e.g. `"currency"`); also prefixes success message keys.
    const SLICE: &'static str;

    /// Identifies one stored record.
    type Key: Clone + fmt::Debug + Send + Sync + 'static;

    /// Search form payload.
    type Criteria: Clone + Default + fmt::Debug + PartialEq + Send + Sync + 'static;
}

/// Remote collaborator for a [`Maintenance`] slice.
#[async_trait]
pub trait MaintenanceRemote<R: MaintainedRecord>: Send + Sync {
    async fn search(&self, criteria: &R::Criteria) -> RemoteResult<Vec<Persisted<R>>>;

    async fn fetch(&self, key: &R::Key) -> RemoteResult<Persisted<R>>;

    async fn create(&self, record: &R) -> RemoteResult<Persisted<R>>;

    async fn update(&self, record: &Persisted<R>) -> RemoteResult<Persisted<R>>;
}

/// What the record drawer is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormMode {
    #[default]
    Closed,
    Create,
    Edit,
    View,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaintenanceOp {
    #[default]
    None,
    Search,
    Refresh,
    New,
    Edit,
    View,
    Save,
    Discard,
}

/// Requests accepted by a [`Maintenance`] slice.
#[derive(Debug, Clone)]
pub enum MaintenanceIntent<R: MaintainedRecord> {
    /// Run a search and remember the criteria.
    Search(R::Criteria),
    /// Re-run the last search (default criteria if none ran yet).
    Refresh,
    /// Open an empty record for creation.
    New,
    /// Load a stored record for editing.
    Edit(R::Key),
    /// Load a stored record read-only.
    View(R::Key),
    /// Create or update, according to the draft variant.
    Save(Draft<R>),
    /// Close the drawer without saving.
    Discard,
}

/// State of a maintenance screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Maintenance<R: MaintainedRecord> {
    pub op: OperationState<MaintenanceOp>,
    /// Criteria of the last search.
    pub payload: Option<R::Criteria>,
    pub result_set: Option<Vec<Persisted<R>>>,
    pub active_record: Option<Draft<R>>,
    pub form_mode: FormMode,
    /// Set after a save; the result table no longer reflects the server.
    pub is_result_set_dirty: bool,
}

impl<R: MaintainedRecord> Default for Maintenance<R> {
    fn default() -> Self {
        Self {
            op: OperationState::default(),
            payload: None,
            result_set: None,
            active_record: None,
            form_mode: FormMode::Closed,
            is_result_set_dirty: false,
        }
    }
}

impl<R: MaintainedRecord> Maintenance<R> {
    async fn search(tx: &Transition<'_, Self>, criteria: R::Criteria) {
        let before = tx.begin(|s| s.payload = Some(criteria.clone()));
        let result = tx.remote().search(&criteria).await;
        tx.finish(before, |after| {
            after.result_set = Some(result?);
            after.is_result_set_dirty = false;
            Ok(())
        });
    }

    async fn open(tx: &Transition<'_, Self>, key: R::Key, mode: FormMode) {
        let before = tx.begin(|_| {});
        let result = tx.remote().fetch(&key).await;
        tx.finish(before, |after| {
            after.active_record = Some(Draft::Persisted(result?));
            after.form_mode = mode;
            Ok(())
        });
    }

    async fn save(tx: &Transition<'_, Self>, draft: Draft<R>) {
        let before = tx.begin(|_| {});
        let result = match &draft {
            Draft::New(record) => tx.remote().create(record).await,
            Draft::Persisted(persisted) => tx.remote().update(persisted).await,
        };
        tx.finish(before, |after| {
            after.active_record = Some(Draft::Persisted(result?));
            after.form_mode = FormMode::Edit;
            after.is_result_set_dirty = true;
            Ok(())
        });
    }
}

#[async_trait]
impl<R: MaintainedRecord> Slice for Maintenance<R> {
    const NAME: &'static str = R::SLICE;

    type Kind = MaintenanceOp;
    type Intent = MaintenanceIntent<R>;
    type Remote = dyn MaintenanceRemote<R>;

    fn operation(&self) -> &OperationState<MaintenanceOp> {
        &self.op
    }

    fn operation_mut(&mut self) -> &mut OperationState<MaintenanceOp> {
        &mut self.op
    }

    fn kind_of(intent: &MaintenanceIntent<R>) -> MaintenanceOp {
        match intent {
            MaintenanceIntent::Search(_) => MaintenanceOp::Search,
            MaintenanceIntent::Refresh => MaintenanceOp::Refresh,
            MaintenanceIntent::New => MaintenanceOp::New,
            MaintenanceIntent::Edit(_) => MaintenanceOp::Edit,
            MaintenanceIntent::View(_) => MaintenanceOp::View,
            MaintenanceIntent::Save(_) => MaintenanceOp::Save,
            MaintenanceIntent::Discard => MaintenanceOp::Discard,
        }
    }

    async fn handle(tx: &Transition<'_, Self>, intent: MaintenanceIntent<R>) {
        match intent {
            MaintenanceIntent::Search(criteria) => Self::search(tx, criteria).await,
            MaintenanceIntent::Refresh => {
                let criteria = tx.current().payload.unwrap_or_default();
                Self::search(tx, criteria).await;
            }
            MaintenanceIntent::New => {
                tx.local(|s| {
                    s.active_record = Some(Draft::New(R::default()));
                    s.form_mode = FormMode::Create;
                    Ok(())
                });
            }
            MaintenanceIntent::Edit(key) => Self::open(tx, key, FormMode::Edit).await,
            MaintenanceIntent::View(key) => Self::open(tx, key, FormMode::View).await,
            MaintenanceIntent::Save(draft) => Self::save(tx, draft).await,
            MaintenanceIntent::Discard => {
                tx.local(|s| {
                    s.active_record = None;
                    s.form_mode = FormMode::Closed;
                    Ok(())
                });
            }
        }
    }

    fn completion_message(kind: MaintenanceOp) -> Option<Message> {
        match kind {
            MaintenanceOp::Save => Some(Message::success(format!("{}.save.success", R::SLICE))),
            _ => None,
        }
    }
}

//! Shared reference data: the lookup lists every screen's dropdowns use.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::container::Transition;
use crate::operation::OperationState;
use crate::remote::RemoteResult;
use crate::slice::Slice;

/// One dropdown entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeLabel {
    pub code: String,
    pub label: String,
}

impl CodeLabel {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceData {
    pub currencies: Vec<CodeLabel>,
    pub countries: Vec<CodeLabel>,
    pub payment_types: Vec<CodeLabel>,
}

impl ReferenceData {
    /// Label for a currency code, if known.
    pub fn currency_label(&self, code: &str) -> Option<&str> {
        self.currencies
            .iter()
            .find(|c| c.code == code)
            .map(|c| c.label.as_str())
    }
}

#[async_trait]
pub trait ReferenceDataRemote: Send + Sync {
    async fn reference_data(&self) -> RemoteResult<ReferenceData>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceDataOp {
    #[default]
    None,
    Fetch,
    Refresh,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ReferenceDataIntent {
    Fetch,
    Refresh,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceDataState {
    pub op: OperationState<ReferenceDataOp>,
    pub result_set: Option<ReferenceData>,
}

#[async_trait]
impl Slice for ReferenceDataState {
    const NAME: &'static str = "reference-data";

    type Kind = ReferenceDataOp;
    type Intent = ReferenceDataIntent;
    type Remote = dyn ReferenceDataRemote;

    fn operation(&self) -> &OperationState<ReferenceDataOp> {
        &self.op
    }

    fn operation_mut(&mut self) -> &mut OperationState<ReferenceDataOp> {
        &mut self.op
    }

    fn kind_of(intent: &ReferenceDataIntent) -> ReferenceDataOp {
        match intent {
            ReferenceDataIntent::Fetch => ReferenceDataOp::Fetch,
            ReferenceDataIntent::Refresh => ReferenceDataOp::Refresh,
        }
    }

    async fn handle(tx: &Transition<'_, Self>, intent: ReferenceDataIntent) {
        let cached = match intent {
            ReferenceDataIntent::Fetch => tx.current().result_set,
            ReferenceDataIntent::Refresh => None,
        };
        let before = tx.begin(|_| {});
        let result = match cached {
            Some(data) => Ok(data),
            None => tx.remote().reference_data().await,
        };
        tx.finish(before, |after| {
            after.result_set = Some(result?);
            Ok(())
        });
    }
}

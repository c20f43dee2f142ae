//! Sites the signed-in user may act on, and the one currently selected.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::container::Transition;
use crate::error::RemoteFailure;
use crate::operation::OperationState;
use crate::remote::RemoteResult;
use crate::slice::Slice;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub code: String,
    pub name: String,
    pub region: String,
}

#[async_trait]
pub trait EntitledSiteRemote: Send + Sync {
    async fn entitled_sites(&self) -> RemoteResult<Vec<Site>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntitledSiteOp {
    #[default]
    None,
    Fetch,
    Refresh,
    Select,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EntitledSiteIntent {
    /// Load the list unless it is already loaded.
    Fetch,
    /// Reload the list from the server.
    Refresh,
    /// Select a site by code from the loaded list.
    SelectEntitledSite(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntitledSiteState {
    pub op: OperationState<EntitledSiteOp>,
    pub result_set: Option<Vec<Site>>,
    pub selected: Option<Site>,
}

impl EntitledSiteState {
    async fn load(tx: &Transition<'_, Self>, force: bool) {
        let cached = if force { None } else { tx.current().result_set };
        let before = tx.begin(|_| {});
        let result = match cached {
            Some(sites) => {
                tracing::debug!(count = sites.len(), "entitled sites already loaded");
                Ok(sites)
            }
            None => tx.remote().entitled_sites().await,
        };
        tx.finish(before, |after| {
            let sites = result?;
            // A refresh can revoke the selected site.
            if let Some(selected) = &after.selected
                && !sites.iter().any(|site| site.code == selected.code)
            {
                after.selected = None;
            }
            after.result_set = Some(sites);
            Ok(())
        });
    }
}

#[async_trait]
impl Slice for EntitledSiteState {
    const NAME: &'static str = "entitled-site";

    type Kind = EntitledSiteOp;
    type Intent = EntitledSiteIntent;
    type Remote = dyn EntitledSiteRemote;

    fn operation(&self) -> &OperationState<EntitledSiteOp> {
        &self.op
    }

    fn operation_mut(&mut self) -> &mut OperationState<EntitledSiteOp> {
        &mut self.op
    }

    fn kind_of(intent: &EntitledSiteIntent) -> EntitledSiteOp {
        match intent {
            EntitledSiteIntent::Fetch => EntitledSiteOp::Fetch,
            EntitledSiteIntent::Refresh => EntitledSiteOp::Refresh,
            EntitledSiteIntent::SelectEntitledSite(_) => EntitledSiteOp::Select,
        }
    }

    async fn handle(tx: &Transition<'_, Self>, intent: EntitledSiteIntent) {
        match intent {
            EntitledSiteIntent::Fetch => Self::load(tx, false).await,
            EntitledSiteIntent::Refresh => Self::load(tx, true).await,
            EntitledSiteIntent::SelectEntitledSite(code) => {
                tx.local(|s| {
                    let site = s
                        .result_set
                        .iter()
                        .flatten()
                        .find(|site| site.code == code)
                        .cloned()
                        .ok_or_else(|| {
                            RemoteFailure::with_parameters("SITE_NOT_ENTITLED", [code.as_str()])
                        })?;
                    s.selected = Some(site);
                    Ok(())
                });
            }
        }
    }
}

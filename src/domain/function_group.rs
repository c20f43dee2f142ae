//! Function-group (entitlement bundle) maintenance.
//!
//! A function group names a set of console functions that can be granted
//! together.

use serde::{Deserialize, Serialize};

use super::maintenance::{MaintainedRecord, Maintenance, MaintenanceIntent};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionGroup {
    pub code: String,
    pub description: String,
    /// Function codes granted by this group.
    pub functions: Vec<String>,
    /// Restricts the group to one site when set.
    pub site_code: Option<String>,
}

impl FunctionGroup {
    pub fn grants(&self, function: &str) -> bool {
        self.functions.iter().any(|f| f == function)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionGroupCriteria {
    pub code: Option<String>,
    pub description: Option<String>,
    /// Only groups granting this function.
    pub function: Option<String>,
}

impl FunctionGroupCriteria {
    pub fn matches(&self, group: &FunctionGroup) -> bool {
        let code_ok = self
            .code
            .as_ref()
            .is_none_or(|prefix| group.code.starts_with(prefix.as_str()));
        let description_ok = self.description.as_ref().is_none_or(|needle| {
            group
                .description
                .to_lowercase()
                .contains(&needle.to_lowercase())
        });
        let function_ok = self.function.as_ref().is_none_or(|f| group.grants(f));
        code_ok && description_ok && function_ok
    }
}

impl MaintainedRecord for FunctionGroup {
    const SLICE: &'static str = "function-group";
    type Key = String;
    type Criteria = FunctionGroupCriteria;
}

pub type FunctionGroupSlice = Maintenance<FunctionGroup>;

pub type FunctionGroupIntent = MaintenanceIntent<FunctionGroup>;

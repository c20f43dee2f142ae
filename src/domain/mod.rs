//! The console's domain slices.
//!
//! Each slice owns its state shape, its intents and its remote trait.
//! Currency and function-group share the generic [`Maintenance`] slice.

pub mod auth;
pub mod currency;
pub mod entitled_site;
pub mod function_group;
pub mod maintenance;
pub mod payment;
pub mod reference_data;

pub use auth::{AuthIntent, AuthOp, AuthRemote, AuthState, Credentials, UserProfile};
pub use currency::{Currency, CurrencyCriteria, CurrencyIntent, CurrencySlice};
pub use entitled_site::{EntitledSiteIntent, EntitledSiteOp, EntitledSiteRemote, EntitledSiteState, Site};
pub use function_group::{
    FunctionGroup, FunctionGroupCriteria, FunctionGroupIntent, FunctionGroupSlice,
};
pub use maintenance::{
    FormMode, MaintainedRecord, Maintenance, MaintenanceIntent, MaintenanceOp, MaintenanceRemote,
};
pub use payment::{
    Account, Memo, Payment, PaymentCriteria, PaymentDraft, PaymentIntent, PaymentOp,
    PaymentRemote, PaymentState, PaymentStatus,
};
pub use reference_data::{
    CodeLabel, ReferenceData, ReferenceDataIntent, ReferenceDataOp, ReferenceDataRemote,
    ReferenceDataState,
};

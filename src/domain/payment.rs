//! Payment slice: search, inspect, submit and annotate payments.
//!
//! Two handlers need more than the plain before/after shape:
//!
//! * `View` fetches the payment and then its debit account. If either call
//!   fails the snapshot goes back to what it held before the operation,
//!   so the screen never shows a payment next to the wrong account.
//! * `LookupAccount` runs while the user types. Asking again for the code
//!   that is already resolved does nothing, and `NOT_FOUND` means "no such
//!   account" rather than an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::container::Transition;
use crate::error::RemoteFailure;
use crate::message::Message;
use crate::operation::OperationState;
use crate::remote::RemoteResult;
use crate::slice::Slice;

/// Lifecycle of a payment on the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Submitted,
    Settled,
    Rejected,
}

/// A free-text note attached to a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memo {
    pub text: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub reference: String,
    /// Debit account.
    pub account_code: String,
    /// Amount in minor units of `currency`.
    pub amount_minor: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub memos: Vec<Memo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub code: String,
    pub name: String,
    pub currency: String,
    pub site_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCriteria {
    /// Reference substring, case-insensitive.
    pub reference: Option<String>,
    pub account_code: Option<String>,
    pub status: Option<PaymentStatus>,
}

impl PaymentCriteria {
    /// `true` if `payment` satisfies every criterion that is set.
    pub fn matches(&self, payment: &Payment) -> bool {
        let reference_ok = self.reference.as_ref().is_none_or(|needle| {
            payment
                .reference
                .to_lowercase()
                .contains(&needle.to_lowercase())
        });
        let account_ok = self
            .account_code
            .as_ref()
            .is_none_or(|code| payment.account_code == *code);
        let status_ok = self.status.is_none_or(|status| payment.status == status);
        reference_ok && account_ok && status_ok
    }
}

/// A payment being composed, before the server assigns an id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDraft {
    pub reference: String,
    pub account_code: String,
    pub amount_minor: i64,
    pub currency: String,
}

/// The payment service.
#[async_trait]
pub trait PaymentRemote: Send + Sync {
    /// Payments matching `criteria`.
    async fn search(&self, criteria: &PaymentCriteria) -> RemoteResult<Vec<Payment>>;

    /// One payment by id.
    ///
    /// # Errors
    ///
    /// `NOT_FOUND` when no payment has that id.
    async fn fetch(&self, id: &str) -> RemoteResult<Payment>;

    /// Accounts whose code matches `code`. `NOT_FOUND` when there are none.
    async fn accounts(&self, code: &str) -> RemoteResult<Vec<Account>>;

    /// Create a payment from `draft`.
    ///
    /// # Returns
    ///
    /// The stored payment, carrying its server-assigned id.
    async fn submit(&self, draft: &PaymentDraft) -> RemoteResult<Payment>;

    /// Append a memo and return the updated payment.
    async fn add_memo(&self, payment_id: &str, text: &str) -> RemoteResult<Payment>;
}

/// Operations recorded by [`PaymentState`]; one per [`PaymentIntent`]
/// variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentOp {
    /// Nothing has run yet.
    #[default]
    None,
    Search,
    Refresh,
    View,
    LookupAccount,
    Submit,
    AddMemo,
    New,
    Discard,
}

/// Requests accepted by the payment slice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PaymentIntent {
    /// Search with new criteria, remembering them as the payload.
    Search(PaymentCriteria),
    /// Search again with the remembered criteria.
    Refresh,
    /// Load a payment by id together with its debit account.
    View(String),
    /// Resolve an account code while the user types. `NOT_FOUND` resolves
    /// to no accounts.
    LookupAccount(String),
    /// Submit a draft. On success the draft is cleared and the result set
    /// marked dirty.
    Submit(PaymentDraft),
    /// Attach a memo. Blank text fails locally with `MEMO_REQUIRED`.
    AddMemo { payment_id: String, text: String },
    /// Start an empty draft. Local.
    New,
    /// Drop the draft, the active payment and the resolved account. Local.
    Discard,
}

/// Snapshot of the payment screens.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentState {
    pub op: OperationState<PaymentOp>,
    pub payload: Option<PaymentCriteria>,
    pub result_set: Option<Vec<Payment>>,
    pub active_payment: Option<Payment>,
    /// Accounts matching [`account_code`](Self::account_code).
    pub account: Vec<Account>,
    /// The last account code whose lookup resolved.
    pub account_code: Option<String>,
    pub draft: Option<PaymentDraft>,
    pub is_result_set_dirty: bool,
}

impl PaymentState {
    /// Replace `updated` wherever this snapshot holds a copy of it.
    fn merge(&mut self, updated: &Payment) {
        if let Some(active) = self.active_payment.as_mut()
            && active.id == updated.id
        {
            *active = updated.clone();
        }
        if let Some(rows) = self.result_set.as_mut() {
            for row in rows.iter_mut().filter(|row| row.id == updated.id) {
                *row = updated.clone();
            }
        }
    }

    async fn search(tx: &Transition<'_, Self>, criteria: PaymentCriteria) {
        let before = tx.begin(|s| s.payload = Some(criteria.clone()));
        let result = tx.remote().search(&criteria).await;
        tx.finish(before, |after| {
            after.result_set = Some(result?);
            after.is_result_set_dirty = false;
            Ok(())
        });
    }

    async fn view(tx: &Transition<'_, Self>, id: String) {
        let prior = tx.current();
        let before = tx.begin(|s| {
            s.active_payment = None;
            s.account.clear();
            s.account_code = None;
        });

        let result = async {
            let payment = tx.remote().fetch(&id).await?;
            let accounts = tx.remote().accounts(&payment.account_code).await?;
            Ok::<_, RemoteFailure>((payment, accounts))
        }
        .await;

        tx.finish(before, |after| match result {
            Ok((payment, accounts)) => {
                after.account_code = Some(payment.account_code.clone());
                after.account = accounts;
                after.active_payment = Some(payment);
                Ok(())
            }
            Err(failure) => {
                after.active_payment = prior.active_payment;
                after.account = prior.account;
                after.account_code = prior.account_code;
                Err(failure)
            }
        });
    }

    async fn lookup_account(tx: &Transition<'_, Self>, code: String) {
        if tx.current().account_code.as_deref() == Some(code.as_str()) {
            tracing::debug!(%code, "account already resolved");
            return;
        }

        let before = tx.begin(|s| {
            s.account.clear();
            s.account_code = None;
        });
        let result = tx.remote().accounts(&code).await;
        tx.finish(before, |after| {
            after.account = match result {
                Ok(accounts) => accounts,
                Err(failure) if failure.is_not_found() => Vec::new(),
                Err(failure) => return Err(failure),
            };
            after.account_code = Some(code);
            Ok(())
        });
    }

    async fn submit(tx: &Transition<'_, Self>, draft: PaymentDraft) {
        let before = tx.begin(|s| s.draft = Some(draft.clone()));
        let result = tx.remote().submit(&draft).await;
        tx.finish(before, |after| {
            let payment = result?;
            tracing::info!(payment_id = %payment.id, "payment submitted");
            after.active_payment = Some(payment);
            after.draft = None;
            after.is_result_set_dirty = true;
            Ok(())
        });
    }

    async fn add_memo(tx: &Transition<'_, Self>, payment_id: String, text: String) {
        if text.trim().is_empty() {
            tx.local(|_| Err(RemoteFailure::new("MEMO_REQUIRED")));
            return;
        }
        let before = tx.begin(|_| {});
        let result = tx.remote().add_memo(&payment_id, &text).await;
        tx.finish(before, |after| {
            after.merge(&result?);
            Ok(())
        });
    }
}

#[async_trait]
impl Slice for PaymentState {
    const NAME: &'static str = "payment";

    type Kind = PaymentOp;
    type Intent = PaymentIntent;
    type Remote = dyn PaymentRemote;

    fn operation(&self) -> &OperationState<PaymentOp> {
        &self.op
    }

    fn operation_mut(&mut self) -> &mut OperationState<PaymentOp> {
        &mut self.op
    }

    fn kind_of(intent: &PaymentIntent) -> PaymentOp {
        match intent {
            PaymentIntent::Search(_) => PaymentOp::Search,
            PaymentIntent::Refresh => PaymentOp::Refresh,
            PaymentIntent::View(_) => PaymentOp::View,
            PaymentIntent::LookupAccount(_) => PaymentOp::LookupAccount,
            PaymentIntent::Submit(_) => PaymentOp::Submit,
            PaymentIntent::AddMemo { .. } => PaymentOp::AddMemo,
            PaymentIntent::New => PaymentOp::New,
            PaymentIntent::Discard => PaymentOp::Discard,
        }
    }

    async fn handle(tx: &Transition<'_, Self>, intent: PaymentIntent) {
        match intent {
            PaymentIntent::Search(criteria) => Self::search(tx, criteria).await,
            PaymentIntent::Refresh => {
                let criteria = tx.current().payload.unwrap_or_default();
                Self::search(tx, criteria).await;
            }
            PaymentIntent::View(id) => Self::view(tx, id).await,
            PaymentIntent::LookupAccount(code) => Self::lookup_account(tx, code).await,
            PaymentIntent::Submit(draft) => Self::submit(tx, draft).await,
            PaymentIntent::AddMemo { payment_id, text } => {
                Self::add_memo(tx, payment_id, text).await;
            }
            PaymentIntent::New => {
                tx.local(|s| {
                    s.draft = Some(PaymentDraft::default());
                    s.active_payment = None;
                    Ok(())
                });
            }
            PaymentIntent::Discard => {
                tx.local(|s| {
                    s.draft = None;
                    s.active_payment = None;
                    s.account.clear();
                    s.account_code = None;
                    Ok(())
                });
            }
        }
    }

    fn completion_message(kind: PaymentOp) -> Option<Message> {
        match kind {
            PaymentOp::Submit => Some(Message::success("payment.submit.success")),
            PaymentOp::AddMemo => Some(Message::success("payment.memo.success")),
            _ => None,
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Notify;

    use super::test_fixtures::{Ledger, account, payment};
    use super::*;
    use crate::clock::ManualClock;
    use crate::container::Container;
    use crate::operation::Phase;

    fn setup(ledger: Ledger) -> (Container<PaymentState>, Arc<Ledger>) {
        let ledger = Arc::new(ledger);
        let container = Container::new(
            ledger.clone() as Arc<dyn PaymentRemote>,
            Arc::new(ManualClock::new(10_000)),
        );
        (container, ledger)
    }

    fn two_payments() -> Ledger {
        Ledger::seeded(
            &[payment("P1", "ACC-1"), payment("P2", "ACC-2")],
            &[account("ACC-1"), account("ACC-2")],
        )
    }

    #[tokio::test]
    async fn search_by_account() {
        let (c, _) = setup(two_payments());
        let criteria = PaymentCriteria {
            account_code: Some("ACC-2".into()),
            ..PaymentCriteria::default()
        };

        c.dispatch(PaymentIntent::Search(criteria.clone())).await;

        let s = c.read();
        assert_eq!(s.payload, Some(criteria));
        let ids: Vec<_> = s.result_set.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["P2"]);
    }

    #[tokio::test]
    async fn view_loads_payment_and_account() {
        let (c, ledger) = setup(two_payments());

        c.dispatch(PaymentIntent::View("P1".into())).await;

        let s = c.read();
        assert_eq!(s.op.version, 3);
        assert_eq!(s.op.last_failure, None);
        assert_eq!(s.active_payment.map(|p| p.id), Some("P1".into()));
        assert_eq!(s.account, vec![account("ACC-1")]);
        assert_eq!(s.account_code.as_deref(), Some("ACC-1"));
        assert_eq!(ledger.calls(), vec!["fetch", "accounts"]);
    }

    #[tokio::test]
    async fn view_restores_prior_fields_when_account_step_fails() {
        let (c, ledger) = setup(two_payments());
        c.dispatch(PaymentIntent::View("P1".into())).await;
        let prior = c.read();

        ledger.fail_on("accounts", RemoteFailure::system("account service down"));
        c.dispatch(PaymentIntent::View("P2".into())).await;

        let s = c.read();
        assert_eq!(s.active_payment, prior.active_payment);
        assert_eq!(s.account, prior.account);
        assert_eq!(s.account_code, prior.account_code);
        assert_eq!(
            s.op.last_failure.map(|m| m.parameters),
            Some(vec!["account service down".to_string()])
        );
    }

    #[tokio::test]
    async fn view_clears_fields_while_in_flight() {
        let gate = Arc::new(Notify::new());
        let ledger = Ledger {
            gate: Some(gate.clone()),
            ..two_payments()
        };
        let (c, _) = setup(ledger);
        let mut rx = c.subscribe();

        let task = tokio::spawn({
            let c = c.clone();
            async move { c.dispatch(PaymentIntent::View("P1".into())).await }
        });

        rx.changed().await.unwrap();
        let before = rx.borrow_and_update().clone();
        assert_eq!(before.active_payment, None);
        assert_eq!(before.op.phase(), Phase::InFlight { kind: PaymentOp::View });

        gate.notify_one();
        task.await.unwrap();
        assert!(c.read().active_payment.is_some());
    }

    #[tokio::test]
    async fn lookup_not_found_is_an_empty_result() {
        let (c, _) = setup(two_payments());

        c.dispatch(PaymentIntent::LookupAccount("ACC-9".into())).await;

        let s = c.read();
        assert_eq!(s.op.last_failure, None);
        assert!(s.account.is_empty());
        assert_eq!(s.account_code.as_deref(), Some("ACC-9"));
    }

    #[tokio::test]
    async fn lookup_of_resolved_code_is_a_no_op() {
        let (c, ledger) = setup(two_payments());
        c.dispatch(PaymentIntent::LookupAccount("ACC-1".into())).await;
        let version = c.version();

        c.dispatch(PaymentIntent::LookupAccount("ACC-1".into())).await;

        assert_eq!(c.version(), version);
        assert_eq!(ledger.calls(), vec!["accounts"]);
        assert_eq!(c.read().account, vec![account("ACC-1")]);
    }

    #[tokio::test]
    async fn failed_lookup_does_not_resolve_the_code() {
        let (c, ledger) = setup(two_payments());
        ledger.fail_on("accounts", RemoteFailure::system("timeout"));

        c.dispatch(PaymentIntent::LookupAccount("ACC-1".into())).await;
        let s = c.read();
        assert_eq!(s.op.last_failure.map(|m| m.key), Some("SYSTEM_ERROR".into()));
        assert_eq!(s.account_code, None);

        // Retrying the same code reaches the server again.
        c.dispatch(PaymentIntent::LookupAccount("ACC-1".into())).await;
        assert_eq!(c.read().account, vec![account("ACC-1")]);
        assert_eq!(ledger.calls(), vec!["accounts", "accounts"]);
    }

    #[tokio::test]
    async fn submit_replaces_draft_with_payment() {
        let (c, _) = setup(Ledger::default());
        c.dispatch(PaymentIntent::New).await;
        assert_eq!(c.read().draft, Some(PaymentDraft::default()));

        let draft = PaymentDraft {
            reference: "RENT".into(),
            account_code: "ACC-1".into(),
            amount_minor: 90_000,
            currency: "USD".into(),
        };
        c.dispatch(PaymentIntent::Submit(draft)).await;

        let s = c.read();
        assert_eq!(s.draft, None);
        assert!(s.is_result_set_dirty);
        let submitted = s.active_payment.unwrap();
        assert_eq!(submitted.status, PaymentStatus::Submitted);
        assert_eq!(submitted.reference, "RENT");
    }

    #[tokio::test]
    async fn rejected_submit_keeps_draft() {
        let (c, _) = setup(Ledger::default());
        let draft = PaymentDraft {
            amount_minor: 0,
            ..PaymentDraft::default()
        };

        c.dispatch(PaymentIntent::Submit(draft.clone())).await;

        let s = c.read();
        assert_eq!(s.draft, Some(draft));
        assert_eq!(s.active_payment, None);
        let failure = s.op.last_failure.unwrap();
        assert_eq!(failure.key, "INVALID_AMOUNT");
        assert_eq!(failure.parameters, vec!["0"]);
    }

    #[tokio::test]
    async fn add_memo_updates_active_payment_and_results() {
        let (c, _) = setup(two_payments());
        c.dispatch(PaymentIntent::Search(PaymentCriteria::default()))
            .await;
        c.dispatch(PaymentIntent::View("P1".into())).await;

        c.dispatch(PaymentIntent::AddMemo {
            payment_id: "P1".into(),
            text: "called the bank".into(),
        })
        .await;

        let s = c.read();
        assert_eq!(s.active_payment.unwrap().memos.len(), 1);
        let row = s
            .result_set
            .unwrap()
            .into_iter()
            .find(|p| p.id == "P1")
            .unwrap();
        assert_eq!(row.memos[0].text, "called the bank");
    }

    #[tokio::test]
    async fn blank_memo_fails_without_remote_call() {
        let (c, ledger) = setup(two_payments());

        c.dispatch(PaymentIntent::AddMemo {
            payment_id: "P1".into(),
            text: "  ".into(),
        })
        .await;

        let s = c.read();
        assert_eq!(s.op.version, 3);
        assert_eq!(s.op.last_failure.map(|m| m.key), Some("MEMO_REQUIRED".into()));
        assert!(ledger.calls().is_empty());
    }

    #[tokio::test]
    async fn discard_clears_working_fields() {
        let (c, _) = setup(two_payments());
        c.dispatch(PaymentIntent::View("P1".into())).await;

        c.dispatch(PaymentIntent::Discard).await;

        let s = c.read();
        assert_eq!(s.active_payment, None);
        assert!(s.account.is_empty());
        assert_eq!(s.account_code, None);
        assert_eq!(s.op.operation_kind, PaymentOp::Discard);
    }

    #[test]
    fn intent_routes_as_tagged_json() {
        let intent: PaymentIntent = serde_json::from_value(serde_json::json!({
            "type": "AddMemo",
            "data": { "payment_id": "P1", "text": "hi" }
        }))
        .unwrap();
        assert_eq!(PaymentState::kind_of(&intent), PaymentOp::AddMemo);
    }
}

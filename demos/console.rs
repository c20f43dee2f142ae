//! Self-contained walkthrough of a console session: sign in, search and
//! edit currencies, look up an account, sign out. Spinner and toast
//! callbacks are printed to stdout.
//!
//! Run with: `cargo run --example console`
//!
//! Set `RUST_LOG=opstate=debug` to see every committed snapshot.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opstate::domain::{
    Account, AuthIntent, AuthRemote, AuthState, Credentials, Currency, CurrencyCriteria,
    CurrencyIntent, CurrencySlice, MaintenanceRemote, Payment, PaymentCriteria, PaymentDraft,
    PaymentIntent, PaymentRemote, PaymentState, UserProfile,
};
use opstate::{
    Audit, Draft, Notifier, NotifyConfig, Persisted, RemoteFailure, RemoteResult, Session,
    Spinner, SpinnerView, SystemClock, Toast,
};

// ---------------------------------------------------------------------------
// In-memory back office
// ---------------------------------------------------------------------------

/// Stands in for the console's HTTP services.
struct BackOffice {
    currencies: Mutex<BTreeMap<String, Persisted<Currency>>>,
    accounts: BTreeMap<String, Account>,
    latency: Duration,
}

impl BackOffice {
    fn new() -> Self {
        let mut currencies = BTreeMap::new();
        for (code, name, places) in [("EUR", "Euro", 2), ("JPY", "Yen", 0), ("USD", "US Dollar", 2)] {
            currencies.insert(
                code.to_string(),
                Persisted {
                    record: Currency {
                        code: code.into(),
                        name: name.into(),
                        decimal_places: places,
                        active: true,
                    },
                    audit: stamp("seed"),
                },
            );
        }
        let accounts = BTreeMap::from([(
            "ACC-1".to_string(),
            Account {
                code: "ACC-1".into(),
                name: "Operating".into(),
                currency: "USD".into(),
                site_code: "NYC".into(),
            },
        )]);
        Self {
            currencies: Mutex::new(currencies),
            accounts,
            latency: Duration::from_millis(150),
        }
    }

    async fn round_trip(&self) {
        tokio::time::sleep(self.latency).await;
    }
}

fn stamp(by: &str) -> Audit {
    Audit {
        last_update_by: by.into(),
        last_update_datetime: Utc::now(),
    }
}

#[async_trait]
impl AuthRemote for BackOffice {
    async fn sign_in(&self, credentials: &Credentials) -> RemoteResult<UserProfile> {
        self.round_trip().await;
        if credentials.password.is_empty() {
            return Err(RemoteFailure::new("INVALID_CREDENTIALS"));
        }
        Ok(UserProfile {
            user_id: credentials.user_id.clone(),
            display_name: "Operations Admin".into(),
            functions: vec!["currency.edit".into(), "payment.view".into()],
        })
    }

    async fn sign_out(&self) -> RemoteResult<()> {
        self.round_trip().await;
        Ok(())
    }

    async fn profile(&self) -> RemoteResult<UserProfile> {
        Err(RemoteFailure::new("SESSION_EXPIRED"))
    }
}

#[async_trait]
impl MaintenanceRemote<Currency> for BackOffice {
    async fn search(&self, criteria: &CurrencyCriteria) -> RemoteResult<Vec<Persisted<Currency>>> {
        self.round_trip().await;
        let rows = self.currencies.lock().unwrap_or_else(|p| p.into_inner());
        Ok(rows
            .values()
            .filter(|p| criteria.matches(&p.record))
            .cloned()
            .collect())
    }

    async fn fetch(&self, key: &String) -> RemoteResult<Persisted<Currency>> {
        self.round_trip().await;
        let rows = self.currencies.lock().unwrap_or_else(|p| p.into_inner());
        rows.get(key).cloned().ok_or_else(RemoteFailure::not_found)
    }

    async fn create(&self, record: &Currency) -> RemoteResult<Persisted<Currency>> {
        self.round_trip().await;
        let mut rows = self.currencies.lock().unwrap_or_else(|p| p.into_inner());
        if rows.contains_key(&record.code) {
            return Err(RemoteFailure::with_parameters(
                "DUPLICATE_CODE",
                [record.code.as_str()],
            ));
        }
        let stored = Persisted {
            record: record.clone(),
            audit: stamp("demo"),
        };
        rows.insert(record.code.clone(), stored.clone());
        Ok(stored)
    }

    async fn update(&self, record: &Persisted<Currency>) -> RemoteResult<Persisted<Currency>> {
        self.round_trip().await;
        let stored = Persisted {
            record: record.record.clone(),
            audit: stamp("demo"),
        };
        self.currencies
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(record.record.code.clone(), stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl PaymentRemote for BackOffice {
    async fn search(&self, _criteria: &PaymentCriteria) -> RemoteResult<Vec<Payment>> {
        self.round_trip().await;
        Ok(Vec::new())
    }

    async fn fetch(&self, _id: &str) -> RemoteResult<Payment> {
        self.round_trip().await;
        Err(RemoteFailure::not_found())
    }

    async fn accounts(&self, code: &str) -> RemoteResult<Vec<Account>> {
        self.round_trip().await;
        self.accounts
            .get(code)
            .map(|a| vec![a.clone()])
            .ok_or_else(RemoteFailure::not_found)
    }

    async fn submit(&self, _draft: &PaymentDraft) -> RemoteResult<Payment> {
        self.round_trip().await;
        Err(RemoteFailure::new("PAYMENTS_CLOSED"))
    }

    async fn add_memo(&self, _payment_id: &str, _text: &str) -> RemoteResult<Payment> {
        Err(RemoteFailure::not_found())
    }
}

// ---------------------------------------------------------------------------
// Terminal "UI"
// ---------------------------------------------------------------------------

struct Terminal;

impl SpinnerView for Terminal {
    fn show(&self) {
        println!("  [spinner on]");
    }

    fn hide(&self) {
        println!("  [spinner off]");
    }
}

impl Notifier for Terminal {
    fn notify(&self, toast: Toast) {
        let lifetime = match toast.dismiss_after {
            Some(d) => format!("{} ms", d.as_millis()),
            None => "sticky".into(),
        };
        println!(
            "  [toast {:?}] {} {:?} ({lifetime})",
            toast.message.kind, toast.message.key, toast.message.parameters
        );
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opstate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = NotifyConfig::from_json(r#"{"success_toast_millis": 2000}"#)?;
    let backend = Arc::new(BackOffice::new());
    let session = Session::builder()
        .clock(SystemClock)
        .notify_config(config)
        .slice::<AuthState>(backend.clone())
        .slice::<CurrencySlice>(backend.clone())
        .slice::<PaymentState>(backend.clone())
        .open()?;

    let spinner = Spinner::new(Arc::new(Terminal));
    let notifier: Arc<dyn Notifier> = Arc::new(Terminal);
    session
        .observe::<AuthState>(spinner.clone(), notifier.clone())
        .await?;
    session
        .observe::<CurrencySlice>(spinner.clone(), notifier.clone())
        .await?;
    session
        .observe::<PaymentState>(spinner.clone(), notifier.clone())
        .await?;

    println!("sign in");
    session
        .dispatch::<AuthState>(AuthIntent::SignIn(Credentials {
            user_id: "ops-admin".into(),
            password: "correct horse".into(),
        }))
        .await?;

    println!("search currencies");
    session
        .dispatch::<CurrencySlice>(CurrencyIntent::Search(CurrencyCriteria::default()))
        .await?;
    let currencies = session.container::<CurrencySlice>()?;
    for row in currencies.read().result_set.unwrap_or_default() {
        println!("  {} {}", row.record.code, row.record.name);
    }

    println!("create a duplicate USD");
    session
        .dispatch::<CurrencySlice>(CurrencyIntent::Save(Draft::New(Currency {
            code: "USD".into(),
            name: "Dollar again".into(),
            decimal_places: 2,
            active: true,
        })))
        .await?;

    println!("create CHF");
    session
        .dispatch::<CurrencySlice>(CurrencyIntent::Save(Draft::New(Currency {
            code: "CHF".into(),
            name: "Swiss Franc".into(),
            decimal_places: 2,
            active: true,
        })))
        .await?;
    println!(
        "  result set dirty: {}",
        currencies.read().is_result_set_dirty
    );

    println!("look up accounts");
    for code in ["ACC-1", "ACC-1", "ACC-404"] {
        session
            .dispatch::<PaymentState>(PaymentIntent::LookupAccount(code.into()))
            .await?;
        let payments = session.container::<PaymentState>()?.read();
        println!(
            "  {code}: {} account(s), version {}",
            payments.account.len(),
            payments.op.version
        );
    }

    println!("sign out");
    session.sign_out().await?;
    println!("  currency version after sign-out: {}", currencies.version());

    // Let the bridges drain before stopping them.
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.shutdown().await?;
    Ok(())
}

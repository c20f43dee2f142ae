//! Authentication slice: who is signed in.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::container::Transition;
use crate::message::Message;
use crate::operation::OperationState;
use crate::remote::RemoteResult;
use crate::slice::Slice;

/// Sign-in form payload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub user_id: String,
    pub password: String,
}

// Keeps the password out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("password", &"***")
            .finish()
    }
}

/// The signed-in user as the server describes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub display_name: String,
    /// Function codes granted to the user.
    pub functions: Vec<String>,
}

impl UserProfile {
    /// `true` if the user was granted `function`.
    pub fn can(&self, function: &str) -> bool {
        self.functions.iter().any(|f| f == function)
    }
}

/// The authentication service.
#[async_trait]
pub trait AuthRemote: Send + Sync {
    /// Open a server session.
    ///
    /// # Returns
    ///
    /// The profile of the user who signed in.
    async fn sign_in(&self, credentials: &Credentials) -> RemoteResult<UserProfile>;

    /// Close the server session.
    async fn sign_out(&self) -> RemoteResult<()>;

    /// The profile of the current server session.
    ///
    /// # Errors
    ///
    /// Fails when the server session has expired.
    async fn profile(&self) -> RemoteResult<UserProfile>;
}

/// Operations recorded by [`AuthState`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthOp {
    /// Nothing has run yet.
    #[default]
    None,
    SignIn,
    SignOut,
    RefreshProfile,
}

/// Requests accepted by the auth slice.
#[derive(Debug, Clone)]
pub enum AuthIntent {
    /// Sign in and store the returned profile.
    SignIn(Credentials),
    /// Sign out on the server. The profile is kept if the server refuses;
    /// [`Session::sign_out`](crate::Session::sign_out) resets regardless.
    SignOut,
    /// Reload the profile of the current server session.
    RefreshProfile,
}

/// Snapshot of the signed-in user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub op: OperationState<AuthOp>,
    /// The signed-in user, if any.
    pub profile: Option<UserProfile>,
}

impl AuthState {
    /// `true` once a sign-in has succeeded and no sign-out has since.
    pub fn is_signed_in(&self) -> bool {
        self.profile.is_some()
    }
}

#[async_trait]
impl Slice for AuthState {
    const NAME: &'static str = "auth";

    type Kind = AuthOp;
    type Intent = AuthIntent;
    type Remote = dyn AuthRemote;

    fn operation(&self) -> &OperationState<AuthOp> {
        &self.op
    }

    fn operation_mut(&mut self) -> &mut OperationState<AuthOp> {
        &mut self.op
    }

    fn kind_of(intent: &AuthIntent) -> AuthOp {
        match intent {
            AuthIntent::SignIn(_) => AuthOp::SignIn,
            AuthIntent::SignOut => AuthOp::SignOut,
            AuthIntent::RefreshProfile => AuthOp::RefreshProfile,
        }
    }

    async fn handle(tx: &Transition<'_, Self>, intent: AuthIntent) {
        match intent {
            AuthIntent::SignIn(credentials) => {
                let before = tx.begin(|_| {});
                let result = tx.remote().sign_in(&credentials).await;
                tx.finish(before, |after| {
                    let profile = result?;
                    tracing::info!(user_id = %profile.user_id, "signed in");
                    after.profile = Some(profile);
                    Ok(())
                });
            }
            AuthIntent::SignOut => {
                let before = tx.begin(|_| {});
                let result = tx.remote().sign_out().await;
                tx.finish(before, |after| {
                    result?;
                    after.profile = None;
                    Ok(())
                });
            }
            AuthIntent::RefreshProfile => {
                let before = tx.begin(|_| {});
                let result = tx.remote().profile().await;
                tx.finish(before, |after| {
                    after.profile = Some(result?);
                    Ok(())
                });
            }
        }
    }

    fn completion_message(kind: AuthOp) -> Option<Message> {
        match kind {
            AuthOp::SignOut => Some(Message::success("auth.signOut.success")),
            _ => None,
        }
    }
}

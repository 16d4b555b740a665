//! Email + password credential exchange.
//!
//! Every session, whether requested by a teacher with their password or by a student through
//! the PIN flow, is issued here. The exchange distinguishes "no credential exists for this
//! email" from "the credential exists but the secret is wrong" so the PIN flow can decide
//! whether its fallback applies. Callers facing the network must collapse both into the same
//! response.

use thiserror::Error;
use tracing::instrument;

use crate::{
    api::models::users::CurrentUser,
    auth::{
        password::verify_secret,
        session::{IssuedSession, create_session_token},
    },
    config::Config,
    errors::Error,
    store::AccountStore,
    types::Role,
};

/// Why an exchange did not produce a session
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No account is registered under the email
    #[error("no credential registered for {email}")]
    NoSuchCredential { email: String },

    /// The account exists but the secret does not match
    #[error("credential rejected")]
    InvalidCredential,

    /// Lookup, hashing or signing failed
    #[error(transparent)]
    Infrastructure(#[from] Error),
}

impl From<crate::db::errors::DbError> for CredentialError {
    fn from(err: crate::db::errors::DbError) -> Self {
        CredentialError::Infrastructure(err.into())
    }
}

/// A signed session together with the identity it was issued for
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub user: CurrentUser,
    pub session: IssuedSession,
}

/// Exchanges an email and password for a session.
pub struct CredentialExchange<'a, S: ?Sized> {
    store: &'a S,
    config: &'a Config,
}

impl<'a, S> CredentialExchange<'a, S>
where
    S: AccountStore + ?Sized,
{
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self { store, config }
    }

    #[instrument(skip(self, password), err(level = "debug"))]
    pub async fn create_session(&self, email: &str, password: &str) -> Result<AuthenticatedSession, CredentialError> {
        let Some(account) = self.store.find_account_by_email(email).await? else {
            return Err(CredentialError::NoSuchCredential { email: email.to_string() });
        };

        if !verify_secret(password.to_string(), account.password_hash.clone()).await? {
            return Err(CredentialError::InvalidCredential);
        }

        let user = match account.role {
            Role::Student => {
                let profile = self.store.find_profile(account.id).await?;
                CurrentUser {
                    id: account.id,
                    email: account.email.clone(),
                    username: profile.as_ref().map_or_else(|| account.email.clone(), |p| p.username.clone()),
                    role: Role::Student,
                    display_name: profile.map(|p| p.display_name),
                }
            }
            Role::Teacher => CurrentUser {
                id: account.id,
                email: account.email.clone(),
                username: account.email.clone(),
                role: Role::Teacher,
                display_name: None,
            },
        };

        let session = create_session_token(&user, self.config)?;
        tracing::debug!(user_id = %user.id, role = %user.role, "Issued session");

        Ok(AuthenticatedSession { user, session })
    }
}

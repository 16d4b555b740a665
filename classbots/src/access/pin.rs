//! Student login by username and PIN.
//!
//! A PIN login is a two-stage check. The PIN is first verified against the student profile,
//! then the identity is exchanged for a session through the same email + password exchange
//! teachers use, with the PIN as the password.
//!
//! Student accounts are registered under a derived email, `{username}@{derived_email_domain}`.
//! Accounts created before that convention carry a real email instead, so when the derived
//! email has no credential at all the account's stored email is tried once. A credential that
//! exists but rejects the PIN never triggers the fallback.
//!
//! Every rejection, whatever its cause, produces the same 401 body so that usernames cannot be
//! enumerated. An unknown username still pays for one Argon2 verification, against a decoy hash. Store and signing failures are not rejections and surface as 500.

use tracing::instrument;

use crate::{
    auth::{
        credentials::{AuthenticatedSession, CredentialError, CredentialExchange},
        password::{DecoyHash, verify_secret},
    },
    config::{Config, PinAuthConfig},
    db::models::profiles::StudentProfileDBResponse,
    errors::{Error, Result},
    store::AccountStore,
};

/// Where the email for a credential exchange comes from, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// `{username}@{derived_email_domain}`
    DerivedEmail,
    /// The email stored on the student's account
    StoredEmail,
}

impl CredentialSource {
    pub const ORDER: [CredentialSource; 2] = [CredentialSource::DerivedEmail, CredentialSource::StoredEmail];
}

/// The derived login email for a username
pub fn derived_email(username: &str, domain: &str) -> String {
    format!("{}@{}", username.trim().to_lowercase(), domain)
}

/// Check a new PIN against the configured length range. PINs are ASCII letters and digits.
pub fn validate_pin(pin: &str, config: &PinAuthConfig) -> Result<()> {
    let length = pin.chars().count();
    if length < config.min_length || length > config.max_length {
        return Err(Error::BadRequest {
            message: format!(
                "PIN must be between {} and {} characters",
                config.min_length, config.max_length
            ),
        });
    }
    if !pin.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::BadRequest {
            message: "PIN may only contain letters and digits".to_string(),
        });
    }
    Ok(())
}

pub struct PinAuthenticator<'a, S: ?Sized> {
    store: &'a S,
    config: &'a Config,
    decoy: &'a DecoyHash,
}

impl<'a, S> PinAuthenticator<'a, S>
where
    S: AccountStore + ?Sized,
{
    pub fn new(store: &'a S, config: &'a Config, decoy: &'a DecoyHash) -> Self {
        Self { store, config, decoy }
    }

    /// Authenticate a student, returning their session.
    #[instrument(skip(self, pin), err(level = "debug"))]
    pub async fn authenticate(&self, username: &str, pin: &str) -> Result<AuthenticatedSession> {
        let Some(profile) = self.store.find_profile_by_username(username.trim()).await? else {
            tracing::debug!("No profile for username");
            self.decoy.verify(pin).await?;
            return Err(Error::invalid_credentials());
        };

        if !verify_secret(pin.to_string(), profile.pin_hash.clone()).await? {
            tracing::debug!(user_id = %profile.user_id, "PIN mismatch");
            return Err(Error::invalid_credentials());
        }

        let exchange = CredentialExchange::new(self.store, self.config);
        let mut tried: Option<String> = None;

        for source in CredentialSource::ORDER {
            let Some(email) = self.resolve_email(source, &profile).await? else {
                continue;
            };
            // Legacy lookups can land on the address already tried
            if tried.as_deref().is_some_and(|t| t.eq_ignore_ascii_case(&email)) {
                continue;
            }

            match exchange.create_session(&email, pin).await {
                Ok(session) => {
                    tracing::info!(user_id = %session.user.id, ?source, "Student logged in with PIN");
                    return Ok(session);
                }
                Err(CredentialError::NoSuchCredential { .. }) => {
                    tracing::debug!(?source, "No credential for email, trying next source");
                    tried = Some(email);
                }
                Err(CredentialError::InvalidCredential) => {
                    tracing::warn!(user_id = %profile.user_id, ?source, "Account credential rejected a verified PIN");
                    return Err(Error::invalid_credentials());
                }
                Err(CredentialError::Infrastructure(e)) => return Err(e),
            }
        }

        tracing::warn!(user_id = %profile.user_id, "No credential found for student");
        Err(Error::invalid_credentials())
    }

    async fn resolve_email(&self, source: CredentialSource, profile: &StudentProfileDBResponse) -> Result<Option<String>> {
        match source {
            CredentialSource::DerivedEmail => Ok(Some(derived_email(
                &profile.username,
                &self.config.auth.pin.derived_email_domain,
            ))),
            CredentialSource::StoredEmail => Ok(self.store.find_account(profile.user_id).await?.map(|a| a.email)),
        }
    }
}

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;
use course_core::model::{Credentials, Learner, LearnerId};
use course_core::time::Validity;
use storage::repository::{AccountRecord, AccountRepository, StorageError};
use tracing::{debug, info};

use crate::Clock;
use crate::error::AuthError;

/// Identity provider contract: credential checks, session issuance, sign-out.
///
/// Sessions are explicit request/response calls; there are no listeners.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account. Does not open a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmailTaken` if the email is already registered.
    async fn sign_up(&self, credentials: &Credentials) -> Result<Learner, AuthError>;

    /// Verify credentials and open a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on unknown email or wrong password.
    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<Learner, AuthError>;

    /// The learner bound to the live session, if any.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionExpired` if the session has lapsed.
    async fn current_session(&self) -> Result<Option<Learner>, AuthError>;

    /// End the session. Signing out twice is not an error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the provider cannot end the session.
    async fn sign_out(&self) -> Result<(), AuthError>;
}

#[derive(Debug, Clone)]
struct ActiveSession {
    learner: Learner,
    validity: Validity,
}

/// Identity provider backed by an `AccountRepository`.
///
/// Holds at most one live session, like a client SDK bound to one browser.
pub struct LocalIdentityProvider {
    clock: Clock,
    session_ttl: Duration,
    accounts: Arc<dyn AccountRepository>,
    session: Mutex<Option<ActiveSession>>,
}

impl LocalIdentityProvider {
    #[must_use]
    pub fn new(clock: Clock, session_ttl: Duration, accounts: Arc<dyn AccountRepository>) -> Self {
        Self {
            clock,
            session_ttl,
            accounts,
            session: Mutex::new(None),
        }
    }

    fn lock_session(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, Option<ActiveSession>>, AuthError> {
        self.session
            .lock()
            .map_err(|e| AuthError::Storage(StorageError::Connection(e.to_string())))
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_up(&self, credentials: &Credentials) -> Result<Learner, AuthError> {
        let learner = Learner::new(LearnerId::generate(), credentials.email())?;
        let salt = generate_salt();
        let account = AccountRecord {
            learner_id: learner.id(),
            email: learner.email().to_owned(),
            password_hash: hash_password(&salt, credentials.password()),
            password_salt: salt,
            created_at: self.clock.now(),
        };

        self.accounts
            .insert_account(&account)
            .await
            .map_err(|e| match e {
                StorageError::Conflict => AuthError::EmailTaken,
                other => AuthError::Storage(other),
            })?;

        info!(learner = %learner.id(), "account created");
        Ok(learner)
    }

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<Learner, AuthError> {
        let Some(account) = self
            .accounts
            .find_account_by_email(credentials.email())
            .await?
        else {
            debug!("sign-in rejected: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(&account, credentials.password()) {
            debug!(learner = %account.learner_id, "sign-in rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let learner = Learner::new(account.learner_id, account.email)?;
        let validity = Validity::starting_at(self.clock.now(), self.session_ttl);
        *self.lock_session()? = Some(ActiveSession {
            learner: learner.clone(),
            validity,
        });

        info!(learner = %learner.id(), expires_at = %validity.expires_at(), "signed in");
        Ok(learner)
    }

    async fn current_session(&self) -> Result<Option<Learner>, AuthError> {
        let now = self.clock.now();
        let mut guard = self.lock_session()?;
        match guard.as_ref() {
            None => Ok(None),
            Some(session) if session.validity.is_expired(now) => {
                debug!(learner = %session.learner.id(), "session expired");
                *guard = None;
                Err(AuthError::SessionExpired)
            }
            Some(session) => Ok(Some(session.learner.clone())),
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(session) = self.lock_session()?.take() {
            info!(learner = %session.learner.id(), "signed out");
        }
        Ok(())
    }
}

fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().to_hex().to_string()
}

fn verify_password(account: &AccountRecord, password: &str) -> bool {
    let Ok(stored) = blake3::Hash::from_hex(account.password_hash.as_bytes()) else {
        return false;
    };
    let mut hasher = blake3::Hasher::new();
    hasher.update(account.password_salt.as_bytes());
    hasher.update(password.as_bytes());
    // blake3::Hash equality is constant-time
    hasher.finalize() == stored
}

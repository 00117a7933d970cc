//! Sanitisation orchestrator.
//!
//! [`InputGuard`] ties the form sanitiser to the record store: it turns
//! invalid submissions into a single [`ValidationError`], checks passwords
//! against stored hashes (upgrading weak ones), and issues the one-time
//! tokens used by the second-factor step.

use rand::rngs::OsRng;
use rand::RngCore;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::GuardConfig;
use crate::error::{AuthenticationError, PasswordError, StoreError, ValidationError};
use crate::form::{
    CleanData, FormSanitiser, LengthRule, RawFormInput, ValidationOutcome, EMAIL_FIELD,
    PASSWORD_FIELD,
};
use crate::session::Session;
use crate::store::{Record, RecordStore};

/// Session path holding the subject awaiting second-factor verification.
pub const TWO_FACTOR_SUBJECT: &str = "two_factor.subject_id";
/// Session path holding the token issuance time (Unix seconds).
pub const TWO_FACTOR_ISSUED_AT: &str = "two_factor.issued_at";
const TWO_FACTOR_ROOT: &str = "two_factor";

/// Generates a one-time token: 6 bytes from the OS random source, as 12
/// uppercase hexadecimal characters.
///
/// # Examples
///
/// ```
/// let token = request_guard::generate_auth_token();
/// assert_eq!(token.len(), 12);
/// assert!(token.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
/// ```
pub fn generate_auth_token() -> String {
    let mut bytes = [0u8; 6];
    OsRng.fill_bytes(&mut bytes);
    hex::encode_upper(bytes)
}

/// Store layout used by the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardSettings {
    /// Table holding user records
    pub users_table: String,
    /// Field on the user record holding the pending one-time token
    pub token_field: String,
    /// How long an issued token stays valid, in seconds
    pub second_factor_ttl_secs: u64,
}

impl Default for GuardSettings {
    fn default() -> Self {
        let config = GuardConfig::default();
        Self::from(&config)
    }
}

impl From<&GuardConfig> for GuardSettings {
    fn from(config: &GuardConfig) -> Self {
        Self {
            users_table: config.users_table.clone(),
            token_field: config.token_field.clone(),
            second_factor_ttl_secs: config.second_factor_ttl_secs,
        }
    }
}

/// Form sanitisation and credential checks backed by a record store.
pub struct InputGuard<'a> {
    store: &'a dyn RecordStore,
    sanitiser: FormSanitiser,
    settings: GuardSettings,
}

impl<'a> InputGuard<'a> {
    /// Creates a guard over `store`.
    pub fn new(
        store: &'a dyn RecordStore,
        sanitiser: FormSanitiser,
        settings: GuardSettings,
    ) -> Self {
        Self {
            store,
            sanitiser,
            settings,
        }
    }

    /// Creates a guard from configuration.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::InvalidParams` if the password cost is out of range.
    pub fn from_config(
        store: &'a dyn RecordStore,
        config: &GuardConfig,
    ) -> Result<Self, PasswordError> {
        let sanitiser = FormSanitiser::new(config.password.clone())?;
        Ok(Self::new(store, sanitiser, GuardSettings::from(config)))
    }

    /// Returns the store layout.
    pub fn settings(&self) -> &GuardSettings {
        &self.settings
    }

    /// Sanitises a submission, failing with every message at once.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` carrying all messages if any check failed.
    pub fn get_sanitised_input_data(
        &self,
        raw: RawFormInput,
        rules: &[LengthRule],
    ) -> Result<CleanData, ValidationError> {
        match self.sanitiser.sanitise(raw, rules) {
            ValidationOutcome::Clean(clean) => Ok(clean),
            ValidationOutcome::Invalid(messages) => Err(ValidationError::new(messages)),
        }
    }

    /// Looks up the user record matching the submission's `email` field.
    ///
    /// # Errors
    ///
    /// - `AuthenticationError::CredentialMismatch` if there is no email or no such user
    /// - `AuthenticationError::LookupFailed` if the store fails
    pub fn find_by_email(&self, clean: &CleanData) -> Result<Record, AuthenticationError> {
        let email = clean
            .get(EMAIL_FIELD)
            .ok_or(AuthenticationError::CredentialMismatch)?;

        self.store
            .find_by_email(&self.settings.users_table, email)
            .map_err(AuthenticationError::LookupFailed)?
            .ok_or_else(|| {
                debug!("no user registered for submitted email");
                AuthenticationError::CredentialMismatch
            })
    }

    /// Verifies `candidate` against the record's stored `password` hash.
    ///
    /// If the stored hash is weaker than the current policy, a fresh hash is
    /// computed and written back to the record.
    ///
    /// # Errors
    ///
    /// - `AuthenticationError::CredentialMismatch` if the password is wrong or
    ///   the record has no readable hash
    /// - `AuthenticationError::PersistenceFailed` if the upgraded hash cannot be stored
    pub fn check_password(
        &self,
        candidate: &str,
        record: &Record,
    ) -> Result<(), AuthenticationError> {
        let stored = record
            .get(PASSWORD_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                warn!("user record has no password hash");
                AuthenticationError::CredentialMismatch
            })?;

        let hasher = self.sanitiser.hasher();
        match hasher.verify(candidate, stored) {
            Ok(true) => {}
            Ok(false) => return Err(AuthenticationError::CredentialMismatch),
            Err(e) => {
                warn!(error = %e, "stored password hash could not be verified");
                return Err(AuthenticationError::CredentialMismatch);
            }
        }

        if hasher.needs_rehash(stored) {
            let id = record_id(record).ok_or_else(|| {
                AuthenticationError::PersistenceFailed(StoreError::QueryFailed(
                    "user record has no id".to_string(),
                ))
            })?;
            let upgraded = hasher.hash(candidate)?;
            self.store
                .update_field(
                    &self.settings.users_table,
                    id,
                    PASSWORD_FIELD,
                    Value::String(upgraded),
                )
                .map_err(AuthenticationError::PersistenceFailed)?;
            info!(subject_id = id, "upgraded password hash to current policy");
        }

        Ok(())
    }

    /// Issues a one-time token for `subject_id` and records the challenge in
    /// the session.
    ///
    /// The token is stored on the user record; the session gets
    /// `two_factor.subject_id` and `two_factor.issued_at` (`now`).
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationError::PersistenceFailed` if the token cannot be
    /// stored. The session is left untouched in that case.
    pub fn generate_and_persist_token(
        &self,
        subject_id: i64,
        session: &mut Session,
        now: u64,
    ) -> Result<String, AuthenticationError> {
        let token = generate_auth_token();

        self.store
            .update_field(
                &self.settings.users_table,
                subject_id,
                &self.settings.token_field,
                Value::String(token.clone()),
            )
            .map_err(AuthenticationError::PersistenceFailed)?;

        session.set(TWO_FACTOR_SUBJECT, Value::from(subject_id));
        session.set(TWO_FACTOR_ISSUED_AT, Value::from(now));
        info!(subject_id, "issued second-factor token");

        Ok(token)
    }

    /// Completes the second-factor step and returns the verified subject id.
    ///
    /// The submitted code is compared case-insensitively with the token on
    /// the user record. On success the stored token and the session
    /// challenge are cleared. An expired challenge is cleared as well; a
    /// wrong code leaves it in place for another attempt.
    ///
    /// # Errors
    ///
    /// - `AuthenticationError::NoPendingChallenge` if the session has no challenge
    /// - `AuthenticationError::TokenExpired` if the challenge is older than the TTL
    /// - `AuthenticationError::CredentialMismatch` if the code is wrong
    /// - `AuthenticationError::LookupFailed` / `PersistenceFailed` on store errors
    pub fn verify_second_factor(
        &self,
        submitted: &str,
        session: &mut Session,
        now: u64,
    ) -> Result<i64, AuthenticationError> {
        let subject_id = session
            .get_i64(TWO_FACTOR_SUBJECT)
            .ok_or(AuthenticationError::NoPendingChallenge)?;
        let issued_at = session
            .get(TWO_FACTOR_ISSUED_AT)
            .and_then(Value::as_u64)
            .ok_or(AuthenticationError::NoPendingChallenge)?;

        if now.saturating_sub(issued_at) > self.settings.second_factor_ttl_secs {
            session.remove(TWO_FACTOR_ROOT);
            return Err(AuthenticationError::TokenExpired);
        }

        let record = self
            .store
            .find_by_id(&self.settings.users_table, subject_id)
            .map_err(AuthenticationError::LookupFailed)?
            .ok_or(AuthenticationError::CredentialMismatch)?;
        let expected = record
            .get(&self.settings.token_field)
            .and_then(Value::as_str)
            .ok_or(AuthenticationError::CredentialMismatch)?;

        if !expected.eq_ignore_ascii_case(submitted.trim()) {
            warn!(subject_id, "second-factor code mismatch");
            return Err(AuthenticationError::CredentialMismatch);
        }

        self.store
            .update_field(
                &self.settings.users_table,
                subject_id,
                &self.settings.token_field,
                Value::Null,
            )
            .map_err(AuthenticationError::PersistenceFailed)?;
        session.remove(TWO_FACTOR_ROOT);
        info!(subject_id, "second factor verified");

        Ok(subject_id)
    }
}

fn record_id(record: &Record) -> Option<i64> {
    match record.get("id")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

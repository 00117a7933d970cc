use std::fmt;

use thiserror::Error;

/// Errors that can occur anywhere in the request guard.
///
/// Component errors convert into this type with `?`, and every variant maps
/// onto an [`HttpError`](crate::HttpError) for the web layer.
#[derive(Debug, Error)]
pub enum Error {
    /// A credential could not be decoded or verified
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// An authorization decision was negative
    #[error(transparent)]
    Denied(#[from] AuthorizationDenied),
    /// Submitted form data failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A password or second-factor check failed
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),
    /// The record store failed
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Password hashing failed
    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Failure to obtain trusted claims from a credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The token could not be split into header, payload and signature
    #[error("credential is malformed")]
    Malformed,
    /// The signature did not verify under the configured key and algorithm
    #[error("credential signature is invalid")]
    SignatureInvalid,
    /// The expiry claim lies in the past
    #[error("credential has expired")]
    Expired,
    /// No carrier (header or cookie) held a credential of the expected shape
    #[error("no credential was presented")]
    CarrierMissing,
}

/// Why an authorization check denied a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// The credential failed to decode
    Credential(DecodeError),
    /// The resolved role is not in the allow-list
    RoleNotAllowed {
        /// The role that was presented
        role: String,
    },
    /// The claims did not carry a usable subject id
    MissingSubject,
    /// The subject could not be confirmed in the record store
    SubjectUnknown {
        /// The subject id that was looked up
        subject_id: i64,
    },
    /// The session holds no authenticated state
    NoSession,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::Credential(e) => write!(f, "{}", e),
            DenialReason::RoleNotAllowed { role } => write!(f, "role '{}' is not allowed", role),
            DenialReason::MissingSubject => write!(f, "credential carries no subject id"),
            DenialReason::SubjectUnknown { subject_id } => {
                write!(f, "subject {} could not be confirmed", subject_id)
            }
            DenialReason::NoSession => write!(f, "no authenticated session"),
        }
    }
}

/// A negative authorization decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("access denied: {reason}")]
pub struct AuthorizationDenied {
    /// What caused the denial
    pub reason: DenialReason,
}

impl AuthorizationDenied {
    /// Creates a denial with the given reason.
    pub fn new(reason: DenialReason) -> Self {
        Self { reason }
    }

    /// Returns `true` when the request carried no acceptable credential at all,
    /// as opposed to a valid credential lacking permission.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self.reason,
            DenialReason::Credential(_) | DenialReason::MissingSubject | DenialReason::NoSession
        )
    }
}

/// Aggregated form validation failure.
///
/// Carries every message produced by the sanitiser, in stage order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    messages: Vec<String>,
}

impl ValidationError {
    /// Sentence that prefixes the joined messages.
    pub const HEADER: &'static str = "Please correct the following errors: ";

    /// Creates a validation error from ordered messages.
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    /// Returns the individual messages.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::HEADER, self.messages.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// Failure while checking a password or second-factor token.
#[derive(Debug, Error)]
pub enum AuthenticationError {
    /// The supplied credential does not match the stored one
    #[error("invalid credentials")]
    CredentialMismatch,
    /// An upgraded hash or issued token could not be written back
    #[error("failed to persist credential update: {0}")]
    PersistenceFailed(#[source] StoreError),
    /// The record store could not be queried
    #[error("credential lookup failed: {0}")]
    LookupFailed(#[source] StoreError),
    /// No second-factor challenge is pending for this session
    #[error("no verification is pending")]
    NoPendingChallenge,
    /// The second-factor token was issued too long ago
    #[error("verification code has expired")]
    TokenExpired,
    /// A fresh hash could not be computed
    #[error(transparent)]
    Hashing(#[from] PasswordError),
}

/// Failure reported by a [`RecordStore`](crate::RecordStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached
    #[error("record store unreachable: {0}")]
    Unreachable(String),
    /// The store was reached but the query failed
    #[error("record store query failed: {0}")]
    QueryFailed(String),
}

/// Failure while loading configuration or key material.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value could not be parsed
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// The configuration key
        key: &'static str,
        /// Why parsing failed
        reason: String,
    },
    /// The verification key is not usable for the configured algorithm
    #[error("verification key rejected: {0}")]
    InvalidKey(String),
    /// The JSON document could not be parsed
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
    /// The tracing subscriber could not be installed
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

/// Failure inside the password hasher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordError {
    /// The configured cost parameters are out of range
    #[error("invalid password hash parameters: {0}")]
    InvalidParams(String),
    /// Hashing itself failed
    #[error("failed to hash password: {0}")]
    Hash(String),
    /// A stored hash could not be parsed
    #[error("stored password hash is unreadable: {0}")]
    Unreadable(String),
}

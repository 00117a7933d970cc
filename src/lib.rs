//! Request guard for web applications: JWT role authorization and form
//! sanitisation with taint tracking.
//!
//! This crate gates inbound requests through:
//! - **Credential decoding**: `HS256` or `RS256` bearer tokens, read from a
//!   header or cookie and checked against an injected clock
//! - **Role authorization**: an allow-list with a default role, composed into
//!   a soft-failing [`web::RoleMiddleware`]
//! - **Taint tracking**: submitted fields are [`Tainted<T>`] until the
//!   sanitiser turns them into [`Verified<T>`]
//! - **Credential checks**: Argon2id password verification with transparent
//!   re-hashing, and one-time second-factor tokens
//!
//! # Core Types
//!
//! - [`Secret<T>`]: Wrapper that redacts sensitive values in logs/output
//! - [`Tainted<T>`]: Wrapper for untrusted data requiring sanitization
//! - [`FormSanitiser`]: Validation and cleanup of a whole form
//! - [`InputGuard`]: Sanitiser plus record-store backed credential checks
//! - [`HttpError`]: The single error type handed to the web layer
//!
//! # Examples
//!
//! ```
//! use request_guard::{FormSanitiser, PasswordPolicy, RawFormInput, Secret, ValidationOutcome};
//!
//! // Secrets are automatically redacted
//! let api_key = Secret::new("super-secret-key".to_string());
//! assert_eq!(format!("{:?}", api_key), "[REDACTED]");
//!
//! // Every violation is reported at once
//! let sanitiser = FormSanitiser::new(PasswordPolicy::default()).unwrap();
//! let raw: RawFormInput = [("name", ""), ("role", "select"), ("age", "30")].into_iter().collect();
//!
//! match sanitiser.sanitise(raw, &[]) {
//!     ValidationOutcome::Invalid(errors) => {
//!         assert_eq!(errors, ["NAME is required", "ROLE is required"]);
//!     }
//!     ValidationOutcome::Clean(_) => unreachable!(),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod authorize;
pub mod config;
mod credential;
pub mod error;
mod form;
mod guard;
mod http;
mod logging;
mod password;
mod report;
mod sanitizer;
mod secret;
mod session;
mod store;
mod tainted;
mod verified;
pub mod web;

#[cfg(test)]
mod test_utils;

pub use authorize::{authorize, AuthorizationResult, Principal, RoleAuthorizer};
pub use config::GuardConfig;
pub use credential::{
    decode, extract_token, issue, parse_bearer, Algorithm, Claims, NestedClaims, TokenCarrier,
    VerificationKey,
};
pub use error::Error;
pub use form::{
    is_valid_email, CleanData, FormSanitiser, LengthRule, RawFormInput, ValidationOutcome,
};
pub use guard::{
    generate_auth_token, GuardSettings, InputGuard, TWO_FACTOR_ISSUED_AT, TWO_FACTOR_SUBJECT,
};
pub use http::{HttpError, HttpErrorKind};
pub use logging::{init_tracing, RequestLog};
pub use password::{PasswordHashing, PasswordPolicy};
pub use report::{ErrorReporter, RecordingReporter, TracingReporter};
pub use sanitizer::{MarkupSanitizer, Sanitizer};
pub use secret::Secret;
pub use session::Session;
pub use store::{check_existence, exists, Existence, Failure, MemoryStore, Record, RecordStore};
pub use tainted::Tainted;
pub use verified::Verified;

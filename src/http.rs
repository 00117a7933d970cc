//! HTTP-facing error type.
//!
//! Every failure the guard can produce converts into one [`HttpError`]. The
//! status code is derived from the [`HttpErrorKind`], never stored
//! separately, so the two cannot disagree.

use std::fmt;

use crate::error::{
    AuthenticationError, AuthorizationDenied, ConfigError, DecodeError, Error, PasswordError,
    StoreError, ValidationError,
};

/// Category of an HTTP error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpErrorKind {
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 405
    MethodNotAllowed,
    /// 422
    UnprocessableEntity,
    /// 429
    TooManyRequests,
    /// 500
    Internal,
    /// 503
    ServiceUnavailable,
}

impl HttpErrorKind {
    /// Returns the status code for this kind.
    pub fn status_code(self) -> u16 {
        match self {
            HttpErrorKind::BadRequest => 400,
            HttpErrorKind::Unauthorized => 401,
            HttpErrorKind::Forbidden => 403,
            HttpErrorKind::NotFound => 404,
            HttpErrorKind::MethodNotAllowed => 405,
            HttpErrorKind::UnprocessableEntity => 422,
            HttpErrorKind::TooManyRequests => 429,
            HttpErrorKind::Internal => 500,
            HttpErrorKind::ServiceUnavailable => 503,
        }
    }

    /// Returns the standard reason phrase.
    pub fn reason_phrase(self) -> &'static str {
        match self {
            HttpErrorKind::BadRequest => "Bad Request",
            HttpErrorKind::Unauthorized => "Unauthorized",
            HttpErrorKind::Forbidden => "Forbidden",
            HttpErrorKind::NotFound => "Not Found",
            HttpErrorKind::MethodNotAllowed => "Method Not Allowed",
            HttpErrorKind::UnprocessableEntity => "Unprocessable Entity",
            HttpErrorKind::TooManyRequests => "Too Many Requests",
            HttpErrorKind::Internal => "Internal Server Error",
            HttpErrorKind::ServiceUnavailable => "Service Unavailable",
        }
    }
}

impl fmt::Display for HttpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status_code(), self.reason_phrase())
    }
}

/// An error ready to be rendered as an HTTP response.
///
/// Server-side failures (5xx) carry a generic message; the detail stays in
/// the logs.
///
/// # Examples
///
/// ```
/// use request_guard::{HttpError, HttpErrorKind};
/// use request_guard::error::ValidationError;
///
/// let err = HttpError::from(ValidationError::new(vec!["NAME is required".to_string()]));
/// assert_eq!(err.kind(), HttpErrorKind::UnprocessableEntity);
/// assert_eq!(err.status_code(), 422);
/// assert_eq!(err.message(), "Please correct the following errors: NAME is required");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    kind: HttpErrorKind,
    message: String,
}

impl HttpError {
    /// Creates an error with a custom message.
    pub fn new(kind: HttpErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates an error whose message is the reason phrase.
    pub fn from_kind(kind: HttpErrorKind) -> Self {
        Self::new(kind, kind.reason_phrase())
    }

    /// Returns the error category.
    pub fn kind(&self) -> HttpErrorKind {
        self.kind
    }

    /// Returns the status code.
    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    /// Returns the client-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` for 5xx errors.
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for HttpError {}

impl From<ValidationError> for HttpError {
    fn from(err: ValidationError) -> Self {
        Self::new(HttpErrorKind::UnprocessableEntity, err.to_string())
    }
}

impl From<DecodeError> for HttpError {
    fn from(err: DecodeError) -> Self {
        Self::new(HttpErrorKind::Unauthorized, err.to_string())
    }
}

impl From<AuthorizationDenied> for HttpError {
    fn from(err: AuthorizationDenied) -> Self {
        if err.is_unauthenticated() {
            Self::new(HttpErrorKind::Unauthorized, err.to_string())
        } else {
            Self::new(HttpErrorKind::Forbidden, err.to_string())
        }
    }
}

impl From<AuthenticationError> for HttpError {
    fn from(err: AuthenticationError) -> Self {
        match err {
            AuthenticationError::CredentialMismatch
            | AuthenticationError::NoPendingChallenge
            | AuthenticationError::TokenExpired => {
                Self::new(HttpErrorKind::Unauthorized, err.to_string())
            }
            AuthenticationError::LookupFailed(e) | AuthenticationError::PersistenceFailed(e) => {
                e.into()
            }
            AuthenticationError::Hashing(e) => e.into(),
        }
    }
}

impl From<StoreError> for HttpError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unreachable(_) => Self::from_kind(HttpErrorKind::ServiceUnavailable),
            StoreError::QueryFailed(_) => Self::from_kind(HttpErrorKind::Internal),
        }
    }
}

impl From<ConfigError> for HttpError {
    fn from(_: ConfigError) -> Self {
        Self::from_kind(HttpErrorKind::Internal)
    }
}

impl From<PasswordError> for HttpError {
    fn from(_: PasswordError) -> Self {
        Self::from_kind(HttpErrorKind::Internal)
    }
}

impl From<Error> for HttpError {
    fn from(err: Error) -> Self {
        match err {
            Error::Decode(e) => e.into(),
            Error::Denied(e) => e.into(),
            Error::Validation(e) => e.into(),
            Error::Authentication(e) => e.into(),
            Error::Store(e) => e.into(),
            Error::Config(e) => e.into(),
            Error::Password(e) => e.into(),
        }
    }
}

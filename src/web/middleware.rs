//! Access-control middleware.
//!
//! Both gates soft-fail: they return a denial value instead of an error, and
//! hand the reason to the [`ErrorReporter`] so the application can still log
//! it.
//!
//! # Flow
//!
//! ```text
//! RequestContext
//!   ↓ extract_token (header / cookie)
//! token
//!   ↓ decode (key, now)
//! Claims
//!   ↓ RoleAuthorizer
//! Principal
//!   ↓ check_existence (optional)
//! AuthorizationResult
//! ```

use crate::authorize::{AuthorizationResult, RoleAuthorizer};
use crate::config::{GuardConfig, DEFAULT_ROLE};
use crate::credential::{self, TokenCarrier, VerificationKey};
use crate::error::{AuthorizationDenied, ConfigError, DenialReason};
use crate::report::ErrorReporter;
use crate::session::Session;
use crate::store::{check_existence, Existence, RecordStore};

use super::RequestContext;

/// Whether and how the middleware confirms the subject in the record store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExistencePolicy {
    /// No lookup
    #[default]
    Skip,
    /// Look the subject up in the named table; log a miss but still authorize
    Advisory(String),
    /// Look the subject up in the named table; deny unless it is confirmed
    Mandatory(String),
}

/// JWT role gate.
///
/// # Examples
///
/// ```
/// use request_guard::web::{RequestContext, RoleMiddleware};
/// use request_guard::{RecordingReporter, RoleAuthorizer, VerificationKey};
///
/// let reporter = RecordingReporter::new();
/// let middleware = RoleMiddleware::new(
///     VerificationKey::hmac(b"secret"),
///     RoleAuthorizer::new(["admin"]),
///     &reporter,
/// );
///
/// // No cookie: denied, never a panic.
/// let result = middleware.check(&RequestContext::new("req-1"));
/// assert!(!result.is_authorized());
/// assert_eq!(reporter.len(), 1);
/// ```
pub struct RoleMiddleware<'a> {
    key: VerificationKey,
    authorizer: RoleAuthorizer,
    carrier: TokenCarrier,
    existence: ExistencePolicy,
    store: Option<&'a dyn RecordStore>,
    reporter: &'a dyn ErrorReporter,
}

impl<'a> RoleMiddleware<'a> {
    /// Creates a middleware reading the default cookie, without an
    /// existence check.
    pub fn new(
        key: VerificationKey,
        authorizer: RoleAuthorizer,
        reporter: &'a dyn ErrorReporter,
    ) -> Self {
        Self {
            key,
            authorizer,
            carrier: TokenCarrier::default(),
            existence: ExistencePolicy::Skip,
            store: None,
            reporter,
        }
    }

    /// Creates a middleware from configuration, allowing `allowed_roles`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidKey` if the verification key is unusable.
    pub fn from_config<I, S>(
        config: &GuardConfig,
        allowed_roles: I,
        reporter: &'a dyn ErrorReporter,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let authorizer =
            RoleAuthorizer::new(allowed_roles).with_default_role(config.default_role.clone());
        Ok(Self::new(config.verification_key()?, authorizer, reporter)
            .with_carrier(config.token_carrier()))
    }

    /// Reads the credential from `carrier`.
    pub fn with_carrier(mut self, carrier: TokenCarrier) -> Self {
        self.carrier = carrier;
        self
    }

    /// Confirms the subject in `store` after authorization.
    pub fn with_existence_check(
        mut self,
        store: &'a dyn RecordStore,
        policy: ExistencePolicy,
    ) -> Self {
        self.store = Some(store);
        self.existence = policy;
        self
    }

    /// Returns the role authorizer.
    pub fn authorizer(&self) -> &RoleAuthorizer {
        &self.authorizer
    }

    /// Authorizes one request.
    ///
    /// Every failure becomes `AuthorizationResult::Denied`; the denial is
    /// logged at `warn` and handed to the reporter.
    pub fn check(&self, ctx: &RequestContext) -> AuthorizationResult {
        let log = ctx.log();

        let claims = match credential::extract_token(ctx, &self.carrier)
            .and_then(|token| credential::decode(token, &self.key, ctx.now()))
        {
            Ok(claims) => claims,
            Err(e) => return self.deny(ctx, DenialReason::Credential(e)),
        };

        let principal = match self.authorizer.authorize(&claims) {
            AuthorizationResult::Authorized(principal) => principal,
            AuthorizationResult::Denied(reason) => return self.deny(ctx, reason),
        };

        let (table, mandatory) = match &self.existence {
            ExistencePolicy::Skip => (None, false),
            ExistencePolicy::Advisory(table) => (Some(table), false),
            ExistencePolicy::Mandatory(table) => (Some(table), true),
        };
        if let (Some(table), Some(store)) = (table, self.store) {
            let existence = check_existence(store, principal.subject_id, table, self.reporter);
            if existence != Existence::Confirmed {
                if mandatory {
                    return self.deny(
                        ctx,
                        DenialReason::SubjectUnknown {
                            subject_id: principal.subject_id,
                        },
                    );
                }
                log.warn(format_args!(
                    "subject {} not confirmed in {} ({:?}); continuing",
                    principal.subject_id, table, existence
                ));
            }
        }

        log.debug(format_args!(
            "authorized subject {} as {}",
            principal.subject_id, principal.role
        ));
        AuthorizationResult::Authorized(principal)
    }

    fn deny(&self, ctx: &RequestContext, reason: DenialReason) -> AuthorizationResult {
        let denied = AuthorizationDenied::new(reason);
        ctx.log().warn(format_args!("{}", denied));
        self.reporter.report(&denied);
        AuthorizationResult::Denied(denied.reason)
    }
}

/// Session-based access gate.
///
/// Requires a value at `path` in the session and, if roles are configured,
/// that `<path>.role` (or the default role when unset) is one of them.
///
/// # Examples
///
/// ```
/// use request_guard::{web::SessionGate, Session};
/// use serde_json::json;
///
/// let gate = SessionGate::new("auth.user").allow_roles(["admin"]);
/// let mut session = Session::new();
/// assert!(gate.check(&session).is_err());
///
/// session.set("auth.user", json!({"id": 1, "role": "admin"}));
/// assert!(gate.check(&session).is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGate {
    path: String,
    default_role: String,
    roles: Option<RoleAuthorizer>,
}

impl SessionGate {
    /// Creates a gate requiring `path` to be set.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            default_role: DEFAULT_ROLE.to_string(),
            roles: None,
        }
    }

    /// Additionally requires the session role to be one of `roles`.
    pub fn allow_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(RoleAuthorizer::new(roles).with_default_role(self.default_role.clone()));
        self
    }

    /// Sets the role assumed when the session stores none.
    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        let role = role.into();
        if let Some(authorizer) = self.roles.take() {
            self.roles = Some(authorizer.with_default_role(role.clone()));
        }
        self.default_role = role;
        self
    }

    /// Checks the session.
    ///
    /// # Errors
    ///
    /// - `DenialReason::NoSession` if nothing (or `null`) is stored at the path
    /// - `DenialReason::RoleNotAllowed` if the role is not in the allow-list
    pub fn check(&self, session: &Session) -> Result<(), AuthorizationDenied> {
        match session.get(&self.path) {
            None | Some(serde_json::Value::Null) => {
                return Err(AuthorizationDenied::new(DenialReason::NoSession));
            }
            Some(_) => {}
        }

        let Some(authorizer) = &self.roles else {
            return Ok(());
        };
        let role_path = format!("{}.role", self.path);
        let role = session
            .get(&role_path)
            .and_then(serde_json::Value::as_str)
            .unwrap_or(authorizer.default_role());

        if authorizer.allowed().contains(role) {
            Ok(())
        } else {
            Err(AuthorizationDenied::new(DenialReason::RoleNotAllowed {
                role: role.to_string(),
            }))
        }
    }
}

use std::collections::BTreeSet;

use crate::credential::Claims;
use crate::error::{AuthorizationDenied, DecodeError, DenialReason};

/// An authorized caller, resolved from verified claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Subject id from the credential
    pub subject_id: i64,
    /// Effective role (claimed or defaulted)
    pub role: String,
    /// Email from the credential, if any
    pub email: Option<String>,
}

/// Outcome of an authorization check. Never partially populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationResult {
    /// The caller may proceed
    Authorized(Principal),
    /// The caller was turned away
    Denied(DenialReason),
}

impl AuthorizationResult {
    /// Returns `true` for [`AuthorizationResult::Authorized`].
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthorizationResult::Authorized(_))
    }

    /// Returns the principal if authorized.
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthorizationResult::Authorized(p) => Some(p),
            AuthorizationResult::Denied(_) => None,
        }
    }

    /// Converts into a `Result` so callers can use `?`.
    pub fn into_result(self) -> Result<Principal, AuthorizationDenied> {
        match self {
            AuthorizationResult::Authorized(p) => Ok(p),
            AuthorizationResult::Denied(reason) => Err(AuthorizationDenied::new(reason)),
        }
    }
}

impl From<DecodeError> for AuthorizationResult {
    fn from(e: DecodeError) -> Self {
        AuthorizationResult::Denied(DenialReason::Credential(e))
    }
}

/// Decides whether verified claims grant access.
///
/// The subject id is checked first, then the role. The role comes from
/// `data.role`, else `role`, else `default_role`; membership in
/// `allowed_roles` is an exact, case-sensitive match.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use request_guard::{authorize, Claims};
///
/// let claims = Claims { sub: Some(3), ..Claims::default() };
/// let allowed: BTreeSet<String> = ["guest".to_string()].into();
///
/// let result = authorize(&claims, &allowed, "guest");
/// assert_eq!(result.principal().map(|p| p.role.as_str()), Some("guest"));
/// ```
pub fn authorize(
    claims: &Claims,
    allowed_roles: &BTreeSet<String>,
    default_role: &str,
) -> AuthorizationResult {
    let Some(subject_id) = claims.subject_id() else {
        return AuthorizationResult::Denied(DenialReason::MissingSubject);
    };

    let role = claims.role().unwrap_or(default_role);
    if !allowed_roles.contains(role) {
        return AuthorizationResult::Denied(DenialReason::RoleNotAllowed {
            role: role.to_string(),
        });
    }

    AuthorizationResult::Authorized(Principal {
        subject_id,
        role: role.to_string(),
        email: claims.email().map(str::to_string),
    })
}

/// An allow-list of roles plus the role assumed for claims without one.
///
/// # Examples
///
/// ```
/// use request_guard::{Claims, RoleAuthorizer};
///
/// let authorizer = RoleAuthorizer::new(["admin", "editor"]);
/// let claims = Claims {
///     sub: Some(1),
///     role: Some("editor".to_string()),
///     ..Claims::default()
/// };
///
/// assert!(authorizer.authorize(&claims).is_authorized());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAuthorizer {
    allowed: BTreeSet<String>,
    default_role: String,
}

impl RoleAuthorizer {
    /// Creates an authorizer allowing the given roles, defaulting to `guest`.
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
            default_role: crate::config::DEFAULT_ROLE.to_string(),
        }
    }

    /// Sets the role assumed when claims carry none.
    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = role.into();
        self
    }

    /// Returns the allowed roles.
    pub fn allowed(&self) -> &BTreeSet<String> {
        &self.allowed
    }

    /// Returns the default role.
    pub fn default_role(&self) -> &str {
        &self.default_role
    }

    /// Authorizes claims against this allow-list.
    pub fn authorize(&self, claims: &Claims) -> AuthorizationResult {
        authorize(claims, &self.allowed, &self.default_role)
    }
}

//! Bearer credential decoding.
//!
//! A credential is a JWT signed with either a shared HMAC secret (`HS256`) or
//! an RSA key pair (`RS256`). A deployment configures exactly one of the two;
//! the algorithm travels with the [`VerificationKey`] so a token can never be
//! checked with a key of the wrong kind.

use std::collections::HashSet;
use std::fmt;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ConfigError, DecodeError};
use crate::web::RequestContext;

/// Signature algorithm accepted for credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Algorithm {
    /// RSA PKCS#1 v1.5 with SHA-256, verified with a public key
    #[serde(rename = "RS256")]
    Rs256,
    /// HMAC with SHA-256, verified with a shared secret
    #[default]
    #[serde(rename = "HS256")]
    Hs256,
}

impl Algorithm {
    fn as_jwt(self) -> jsonwebtoken::Algorithm {
        match self {
            Algorithm::Rs256 => jsonwebtoken::Algorithm::RS256,
            Algorithm::Hs256 => jsonwebtoken::Algorithm::HS256,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Rs256 => write!(f, "RS256"),
            Algorithm::Hs256 => write!(f, "HS256"),
        }
    }
}

impl std::str::FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RS256" => Ok(Algorithm::Rs256),
            "HS256" => Ok(Algorithm::Hs256),
            other => Err(ConfigError::InvalidValue {
                key: "JWT_ALGORITHM",
                reason: format!("unsupported algorithm '{}'", other),
            }),
        }
    }
}

/// Key material used to verify credentials, bound to its algorithm.
#[derive(Clone)]
pub struct VerificationKey {
    algorithm: Algorithm,
    key: DecodingKey,
}

impl VerificationKey {
    /// Creates an `HS256` key from a shared secret.
    pub fn hmac(secret: &[u8]) -> Self {
        Self {
            algorithm: Algorithm::Hs256,
            key: DecodingKey::from_secret(secret),
        }
    }

    /// Creates an `RS256` key from a PEM-encoded RSA public key.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidKey` if the PEM cannot be parsed.
    pub fn rsa_pem(pem: &[u8]) -> Result<Self, ConfigError> {
        let key =
            DecodingKey::from_rsa_pem(pem).map_err(|e| ConfigError::InvalidKey(e.to_string()))?;
        Ok(Self {
            algorithm: Algorithm::Rs256,
            key,
        })
    }

    /// Returns the algorithm this key verifies.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("algorithm", &self.algorithm)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Claims nested under `data`, as issued by the login endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedClaims {
    /// Subject id
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Role name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Verified payload of a credential.
///
/// Identity may be carried at the top level (`sub`, `role`, `email`) or
/// nested under `data`; the nested value wins when both are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject id
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub sub: Option<i64>,
    /// Role name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Nested identity block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<NestedClaims>,
    /// Issued-at (Unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    /// Expiry (Unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

impl Claims {
    /// Subject id, preferring `data.id` over `sub`.
    pub fn subject_id(&self) -> Option<i64> {
        self.data.as_ref().and_then(|d| d.id).or(self.sub)
    }

    /// Role, preferring `data.role` over `role`.
    pub fn role(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.role.as_deref())
            .or(self.role.as_deref())
    }

    /// Email, preferring `data.email` over `email`.
    pub fn email(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .or(self.email.as_deref())
    }
}

/// Accepts numbers and numeric strings; anything else becomes `None`.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Verifies a token and returns its claims.
///
/// The signature is checked first, then `exp` against `now` (Unix seconds).
/// Tokens without an `exp` claim do not expire. The function reads no clock
/// and has no side effects.
///
/// # Errors
///
/// - `DecodeError::Malformed` if the token is not a parseable JWT
/// - `DecodeError::SignatureInvalid` if the signature or algorithm does not match the key
/// - `DecodeError::Expired` if `now` is past `exp`
pub fn decode(token: &str, key: &VerificationKey, now: u64) -> Result<Claims, DecodeError> {
    let mut validation = Validation::new(key.algorithm.as_jwt());
    validation.required_spec_claims = HashSet::new();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;

    let data = jsonwebtoken::decode::<Claims>(token, &key.key, &validation).map_err(|e| {
        match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                DecodeError::SignatureInvalid
            }
            ErrorKind::ExpiredSignature => DecodeError::Expired,
            _ => DecodeError::Malformed,
        }
    })?;

    match data.claims.exp {
        Some(exp) if now > exp => Err(DecodeError::Expired),
        _ => Ok(data.claims),
    }
}

/// Signs claims into a token.
///
/// Used by login endpoints that hold the signing half of the key, and by tests.
///
/// # Errors
///
/// Returns `ConfigError::InvalidKey` if the key cannot sign for `algorithm`.
pub fn issue(
    claims: &Claims,
    algorithm: Algorithm,
    signing_key: &EncodingKey,
) -> Result<String, ConfigError> {
    jsonwebtoken::encode(&Header::new(algorithm.as_jwt()), claims, signing_key)
        .map_err(|e| ConfigError::InvalidKey(e.to_string()))
}

/// Where a request carries its credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenCarrier {
    /// `Authorization: Bearer <token>`
    AuthorizationHeader,
    /// A cookie with the given name
    Cookie(String),
    /// The header if present, otherwise the named cookie
    HeaderOrCookie(String),
}

impl Default for TokenCarrier {
    fn default() -> Self {
        TokenCarrier::Cookie(crate::config::DEFAULT_COOKIE_NAME.to_string())
    }
}

static BEARER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Bearer\s+(\S+)\s*$").expect("static pattern"));

/// Extracts the token from an `Authorization` header value.
///
/// Returns `None` unless the value is `Bearer` followed by a single token.
pub fn parse_bearer(header: &str) -> Option<&str> {
    BEARER
        .captures(header.trim_start())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Finds the credential in a request.
///
/// # Errors
///
/// Returns `DecodeError::CarrierMissing` when the header or cookie is absent,
/// empty, or not in the expected shape.
pub fn extract_token<'r>(
    ctx: &'r RequestContext,
    carrier: &TokenCarrier,
) -> Result<&'r str, DecodeError> {
    let from_header = || ctx.header("authorization").and_then(parse_bearer);
    let from_cookie = |name: &str| ctx.cookie(name).map(str::trim).filter(|t| !t.is_empty());

    let token = match carrier {
        TokenCarrier::AuthorizationHeader => from_header(),
        TokenCarrier::Cookie(name) => from_cookie(name),
        TokenCarrier::HeaderOrCookie(name) => from_header().or_else(|| from_cookie(name)),
    };

    token.ok_or(DecodeError::CarrierMissing)
}

//! Guard configuration.
//!
//! Settings come from a JSON document ([`GuardConfig::from_json`]) or from
//! an environment map ([`GuardConfig::from_env`]). Every field has a
//! default except the verification key, which must be supplied before
//! [`GuardConfig::verification_key`] succeeds.

use std::collections::HashMap;
use std::str::FromStr;

use serde::Deserialize;

use crate::credential::{Algorithm, TokenCarrier, VerificationKey};
use crate::error::ConfigError;
use crate::password::PasswordPolicy;
use crate::Secret;

/// Cookie that carries the credential unless configured otherwise.
pub const DEFAULT_COOKIE_NAME: &str = "auth_token";
/// Role assumed when a credential names none.
pub const DEFAULT_ROLE: &str = "guest";
/// Table holding user records.
pub const DEFAULT_USERS_TABLE: &str = "users";
/// User record field holding the pending second-factor token.
pub const DEFAULT_TOKEN_FIELD: &str = "two_factor_token";
/// Lifetime of a second-factor token, in seconds.
pub const DEFAULT_SECOND_FACTOR_TTL_SECS: u64 = 600;

/// Settings for the middleware and the input guard.
///
/// # Examples
///
/// ```
/// use request_guard::config::GuardConfig;
///
/// let json = r#"{"cookie_name": "sid", "verification_key": "s3cret"}"#;
/// let config = GuardConfig::from_json(json).unwrap();
/// assert_eq!(config.cookie_name, "sid");
/// assert_eq!(config.default_role, "guest");
/// assert!(config.verification_key().is_ok());
/// ```
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Credential signature algorithm
    pub algorithm: Algorithm,
    /// HMAC secret (`HS256`) or PEM public key (`RS256`)
    pub verification_key: Secret<String>,
    /// Cookie carrying the credential
    pub cookie_name: String,
    /// Role assumed when a credential names none
    pub default_role: String,
    /// Table holding user records
    pub users_table: String,
    /// User record field holding the pending second-factor token
    pub token_field: String,
    /// Lifetime of a second-factor token, in seconds
    pub second_factor_ttl_secs: u64,
    /// Password rules and hashing cost
    pub password: PasswordPolicy,
    /// `tracing` filter directive
    pub log_filter: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            verification_key: Secret::default(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            default_role: DEFAULT_ROLE.to_string(),
            users_table: DEFAULT_USERS_TABLE.to_string(),
            token_field: DEFAULT_TOKEN_FIELD.to_string(),
            second_factor_ttl_secs: DEFAULT_SECOND_FACTOR_TTL_SECS,
            password: PasswordPolicy::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl GuardConfig {
    /// Parses a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` if the document is not valid.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds the configuration from environment-style key/value pairs.
    ///
    /// Recognised keys: `JWT_ALGORITHM`, `JWT_KEY`, `AUTH_COOKIE`,
    /// `DEFAULT_ROLE`, `USERS_TABLE`, `TWO_FACTOR_FIELD`, `TWO_FACTOR_TTL`,
    /// `PASSWORD_MIN_LENGTH`, `PASSWORD_MEMORY_KIB`, `PASSWORD_ITERATIONS`,
    /// `PASSWORD_PARALLELISM`, `LOG_FILTER`. Other keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first key that fails to parse.
    pub fn from_env(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        if let Some(value) = get("JWT_ALGORITHM") {
            config.algorithm = value.parse()?;
        }
        if let Some(value) = vars.get("JWT_KEY") {
            config.verification_key = Secret::new(value.clone());
        }
        if let Some(value) = get("AUTH_COOKIE") {
            config.cookie_name = value.to_string();
        }
        if let Some(value) = get("DEFAULT_ROLE") {
            config.default_role = value.to_string();
        }
        if let Some(value) = get("USERS_TABLE") {
            config.users_table = value.to_string();
        }
        if let Some(value) = get("TWO_FACTOR_FIELD") {
            config.token_field = value.to_string();
        }
        if let Some(value) = get("TWO_FACTOR_TTL") {
            config.second_factor_ttl_secs = parse_number("TWO_FACTOR_TTL", value)?;
        }
        if let Some(value) = get("PASSWORD_MIN_LENGTH") {
            config.password.min_length = parse_number("PASSWORD_MIN_LENGTH", value)?;
        }
        if let Some(value) = get("PASSWORD_MEMORY_KIB") {
            config.password.memory_kib = parse_number("PASSWORD_MEMORY_KIB", value)?;
        }
        if let Some(value) = get("PASSWORD_ITERATIONS") {
            config.password.iterations = parse_number("PASSWORD_ITERATIONS", value)?;
        }
        if let Some(value) = get("PASSWORD_PARALLELISM") {
            config.password.parallelism = parse_number("PASSWORD_PARALLELISM", value)?;
        }
        if let Some(value) = get("LOG_FILTER") {
            config.log_filter = value.to_string();
        }

        Ok(config)
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`GuardConfig::from_env`].
    pub fn from_process_env() -> Result<Self, ConfigError> {
        Self::from_env(&std::env::vars().collect())
    }

    /// Builds the key that verifies credentials.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidKey` if the key is empty or, for
    /// `RS256`, not a PEM-encoded RSA public key.
    pub fn verification_key(&self) -> Result<VerificationKey, ConfigError> {
        let material = self.verification_key.expose_secret();
        if material.trim().is_empty() {
            return Err(ConfigError::InvalidKey("verification key is empty".to_string()));
        }

        match self.algorithm {
            Algorithm::Hs256 => Ok(VerificationKey::hmac(material.as_bytes())),
            Algorithm::Rs256 => VerificationKey::rsa_pem(material.as_bytes()),
        }
    }

    /// Installs the global `tracing` subscriber using `log_filter`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Logging` if the filter is not a valid directive
    /// or a subscriber is already installed.
    pub fn init_tracing(&self) -> Result<(), ConfigError> {
        crate::logging::init_tracing(&self.log_filter)
    }

    /// Returns the carrier reading the configured cookie.
    pub fn token_carrier(&self) -> TokenCarrier {
        TokenCarrier::Cookie(self.cookie_name.clone())
    }
}

fn parse_number<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        reason: format!("'{}': {}", value, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = GuardConfig::default();

        assert_eq!(config.algorithm, Algorithm::Hs256);
        assert_eq!(config.cookie_name, "auth_token");
        assert_eq!(config.default_role, "guest");
        assert_eq!(config.users_table, "users");
        assert_eq!(config.token_field, "two_factor_token");
        assert_eq!(config.second_factor_ttl_secs, 600);
        assert_eq!(config.password.min_length, 6);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn from_env_overrides_defaults() {
        let config = GuardConfig::from_env(&env(&[
            ("JWT_ALGORITHM", "rs256"),
            ("AUTH_COOKIE", "session"),
            ("DEFAULT_ROLE", "visitor"),
            ("TWO_FACTOR_TTL", "120"),
            ("PASSWORD_MIN_LENGTH", "12"),
            ("PASSWORD_MEMORY_KIB", "65536"),
            ("UNRELATED", "ignored"),
        ]))
        .unwrap();

        assert_eq!(config.algorithm, Algorithm::Rs256);
        assert_eq!(config.cookie_name, "session");
        assert_eq!(config.default_role, "visitor");
        assert_eq!(config.second_factor_ttl_secs, 120);
        assert_eq!(config.password.min_length, 12);
        assert_eq!(config.password.memory_kib, 65536);
        assert_eq!(config.token_carrier(), TokenCarrier::Cookie("session".to_string()));
    }

    #[test]
    fn from_env_names_bad_key() {
        let err = GuardConfig::from_env(&env(&[("TWO_FACTOR_TTL", "ten minutes")])).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidValue { key: "TWO_FACTOR_TTL", .. }));
    }

    #[test]
    fn from_env_rejects_unknown_algorithm() {
        let err = GuardConfig::from_env(&env(&[("JWT_ALGORITHM", "none")])).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidValue { key: "JWT_ALGORITHM", .. }));
    }

    #[test]
    fn from_json_reads_nested_password_policy() {
        let config = GuardConfig::from_json(
            r#"{"algorithm": "HS256", "password": {"min_length": 10, "iterations": 3}}"#,
        )
        .unwrap();

        assert_eq!(config.password.min_length, 10);
        assert_eq!(config.password.iterations, 3);
        assert_eq!(config.password.parallelism, PasswordPolicy::default().parallelism);
    }

    #[test]
    fn from_json_rejects_invalid_document() {
        assert!(matches!(GuardConfig::from_json("{not json"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn verification_key_requires_material() {
        let config = GuardConfig::default();
        assert!(matches!(config.verification_key(), Err(ConfigError::InvalidKey(_))));

        let config = GuardConfig::from_env(&env(&[("JWT_KEY", "secret")])).unwrap();
        assert_eq!(config.verification_key().unwrap().algorithm(), Algorithm::Hs256);
    }

    #[test]
    fn rs256_key_must_be_pem() {
        let config =
            GuardConfig::from_env(&env(&[("JWT_ALGORITHM", "RS256"), ("JWT_KEY", "not a pem")]))
                .unwrap();

        assert!(matches!(config.verification_key(), Err(ConfigError::InvalidKey(_))));
    }

    #[test]
    fn init_tracing_uses_configured_filter() {
        let config =
            GuardConfig::from_env(&env(&[("LOG_FILTER", "request_guard=loudly")])).unwrap();

        assert_eq!(config.log_filter, "request_guard=loudly");
        assert!(matches!(config.init_tracing(), Err(ConfigError::Logging(_))));
    }

    #[test]
    fn debug_output_redacts_key() {
        let config = GuardConfig::from_env(&env(&[("JWT_KEY", "hunter2")])).unwrap();

        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}

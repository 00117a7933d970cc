//! Password hashing with Argon2id.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use serde::Deserialize;

use crate::error::PasswordError;

/// Password rules applied to new passwords and stored hashes.
///
/// The cost defaults follow the Argon2id recommendation of 19 MiB memory,
/// two passes and one lane.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    /// Minimum number of characters for a new password
    pub min_length: usize,
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 6,
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl PasswordPolicy {
    fn params(&self) -> Result<Params, PasswordError> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))
    }

    /// Builds the hasher for this policy.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::InvalidParams` if the cost values are out of range.
    pub fn hasher(&self) -> Result<PasswordHashing, PasswordError> {
        Ok(PasswordHashing {
            params: self.params()?,
        })
    }
}

/// Argon2id hasher bound to a cost policy.
#[derive(Debug, Clone)]
pub struct PasswordHashing {
    params: Params,
}

impl PasswordHashing {
    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hashes a password with a fresh random salt.
    ///
    /// The output is a PHC string (`$argon2id$v=19$m=...`).
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::Hash(e.to_string()))
    }

    /// Verifies a password against a stored PHC string.
    ///
    /// The parameters encoded in the stored hash are used, so hashes made
    /// under an older policy still verify.
    pub fn verify(&self, password: &str, stored: &str) -> Result<bool, PasswordError> {
        let parsed =
            PasswordHash::new(stored).map_err(|e| PasswordError::Unreadable(e.to_string()))?;

        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::Unreadable(e.to_string())),
        }
    }

    /// Returns `true` when a stored hash is weaker than the current policy.
    ///
    /// A hash is weaker if it is Argon2i or Argon2d, or any of its cost
    /// parameters is below the configured one. Call this only after
    /// [`verify`](Self::verify) succeeded: a hash `verify` cannot read
    /// never gets upgraded.
    pub fn needs_rehash(&self, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return true;
        };
        if parsed.algorithm != Algorithm::Argon2id.ident() {
            return true;
        }
        let Ok(current) = Params::try_from(&parsed) else {
            return true;
        };

        current.m_cost() < self.params.m_cost()
            || current.t_cost() < self.params.t_cost()
            || current.p_cost() < self.params.p_cost()
    }
}

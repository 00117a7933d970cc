use std::fmt;

use serde::{Deserialize, Deserializer};

/// Wrapper for key material and plaintext passwords.
///
/// `Debug` and `Display` always print `[REDACTED]`, so a `Secret` can sit
/// inside configuration structs and error contexts that end up in logs.
/// The value is reachable only through [`expose_secret`](Self::expose_secret).
///
/// # Examples
///
/// ```
/// use request_guard::Secret;
///
/// let key = Secret::new("hs256-shared-secret".to_string());
/// assert_eq!(format!("{:?}", key), "[REDACTED]");
/// assert_eq!(key.expose_secret(), "hs256-shared-secret");
/// ```
// Do NOT derive Clone, Debug or Serialize: each would hand out the value implicitly.
pub struct Secret<T> {
    inner: T,
}

impl<T> Secret<T> {
    /// Wraps a sensitive value.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Explicitly exposes the secret value.
    ///
    /// Keep the returned reference out of log statements.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }
}

impl<T: Default> Default for Secret<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Secret<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Secret::new)
    }
}

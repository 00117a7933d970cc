//! Shared fixtures for unit tests.

use jsonwebtoken::EncodingKey;

use crate::credential::{self, Algorithm, Claims};
use crate::password::PasswordPolicy;

pub(crate) const HS256_SECRET: &[u8] = b"unit-test-shared-secret-0123456789";

/// Argon2id with the smallest practical cost so tests stay fast.
pub(crate) fn cheap_policy() -> PasswordPolicy {
    PasswordPolicy {
        min_length: 6,
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    }
}

pub(crate) fn hs256_token(claims: &Claims) -> String {
    credential::issue(claims, Algorithm::Hs256, &EncodingKey::from_secret(HS256_SECRET))
        .expect("hmac signing cannot fail")
}

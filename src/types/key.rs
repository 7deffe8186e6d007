//! Idempotency key types
//!
//! An [`IdempotencyKey`] names "the same logical order submission" within a
//! [`Scope`]. Two rows that resolve to equal keys in the same scope are
//! duplicates of each other, whichever batch they came from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tenant or uploader boundary within which keys must be unique
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(String);

impl Scope {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Scope {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// What an idempotency key was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdempotencyBasis {
    /// The operator-supplied client reference, trimmed, case preserved
    ClientReference,
    /// A digest over the row's identifying fields
    Hash,
}

impl fmt::Display for IdempotencyBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdempotencyBasis::ClientReference => f.write_str("CLIENT_REFERENCE"),
            IdempotencyBasis::Hash => f.write_str("HASH"),
        }
    }
}

/// Scoped idempotency key
///
/// Equality covers scope, basis and value, so a client reference never
/// collides with a digest that happens to have the same text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdempotencyKey {
    pub scope: Scope,
    pub basis: IdempotencyBasis,
    pub value: String,
}

impl IdempotencyKey {
    pub fn client_reference(scope: Scope, reference: impl Into<String>) -> Self {
        Self {
            scope,
            basis: IdempotencyBasis::ClientReference,
            value: reference.into(),
        }
    }

    pub fn hash(scope: Scope, digest: impl Into<String>) -> Self {
        Self {
            scope,
            basis: IdempotencyBasis::Hash,
            value: digest.into(),
        }
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.scope, self.basis, self.value)
    }
}

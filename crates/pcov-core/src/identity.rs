//! # Domain Identity Newtypes
//!
//! Type-level distinction between identifier namespaces: a `CoverKey` can
//! never be passed where an `AccountId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PcovError;

/// Maximum length of a cover key in bytes. Keys are fixed-width 32-byte
/// words on the ledgers that host cover registries.
pub const COVER_KEY_MAX_LEN: usize = 32;

/// Stable key of a cover (the insured risk), e.g. `"Compound Finance Cover"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CoverKey(String);

impl CoverKey {
    /// Create a cover key, rejecting empty or over-long keys.
    pub fn new(key: impl Into<String>) -> Result<Self, PcovError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(PcovError::Validation("cover key must not be empty".to_string()));
        }
        if key.len() > COVER_KEY_MAX_LEN {
            return Err(PcovError::Validation(format!(
                "cover key {key:?} exceeds {COVER_KEY_MAX_LEN} bytes"
            )));
        }
        Ok(Self(key))
    }

    /// Access the key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CoverKey {
    type Error = PcovError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CoverKey> for String {
    fn from(key: CoverKey) -> Self {
        key.0
    }
}

impl std::fmt::Display for CoverKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A participant account (reporter, disputer, voter, coverage holder).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Create an account identifier. Must be non-empty and free of whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, PcovError> {
        let id = id.into();
        if id.is_empty() {
            return Err(PcovError::Validation("account id must not be empty".to_string()));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(PcovError::Validation(format!(
                "account id {id:?} must not contain whitespace"
            )));
        }
        Ok(Self(id))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountId {
    type Error = PcovError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier of a claim right minted by the coverage issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimRightId(Uuid);

impl ClaimRightId {
    /// Create a new random claim right identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ClaimRightId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClaimRightId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "claim-right:{}", self.0)
    }
}

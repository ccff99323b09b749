//! # Evidence Store Seam
//!
//! Reports and disputes carry an opaque, fixed-size reference to evidence
//! held elsewhere. The engine never interprets the content; it only records
//! the reference. References are SHA-256 digests of canonical bytes, so a
//! store can be audited by recomputing them.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;

use pcov_core::{sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest};

/// Reference to stored evidence.
pub type EvidenceRef = ContentDigest;

/// Errors from an evidence store.
#[derive(Error, Debug)]
pub enum EvidenceError {
    /// The content could not be canonicalized.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Nothing is stored under the reference.
    #[error("no evidence stored under {0}")]
    NotFound(EvidenceRef),

    /// Stored bytes no longer hash to their reference.
    #[error("evidence integrity violation: expected {expected}, got {actual}")]
    IntegrityViolation {
        /// The reference the content was stored under.
        expected: EvidenceRef,
        /// The digest of the content actually held.
        actual: EvidenceRef,
    },

    /// Backend failure.
    #[error("evidence store unavailable: {0}")]
    Unavailable(String),
}

/// Content-addressed evidence storage.
pub trait EvidenceStore: Send + Sync {
    /// Store canonical content and return its reference.
    fn put(&self, content: &CanonicalBytes) -> Result<EvidenceRef, EvidenceError>;

    /// Fetch content by reference.
    fn get(&self, reference: &EvidenceRef) -> Result<CanonicalBytes, EvidenceError>;

    /// Whether content is held under the reference.
    fn contains(&self, reference: &EvidenceRef) -> bool {
        self.get(reference).is_ok()
    }

    /// Recompute the digest of the stored content and compare.
    fn verify(&self, reference: &EvidenceRef) -> Result<(), EvidenceError> {
        let content = self.get(reference)?;
        let actual = sha256_digest(&content);
        if actual != *reference {
            return Err(EvidenceError::IntegrityViolation {
                expected: *reference,
                actual,
            });
        }
        Ok(())
    }
}

/// Canonicalize any serializable report body and store it.
pub fn store_json(
    store: &dyn EvidenceStore,
    body: &impl Serialize,
) -> Result<EvidenceRef, EvidenceError> {
    let canonical = CanonicalBytes::new(body)?;
    store.put(&canonical)
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryEvidenceStore {
    items: RwLock<HashMap<EvidenceRef, CanonicalBytes>>,
}

impl MemoryEvidenceStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EvidenceStore for MemoryEvidenceStore {
    fn put(&self, content: &CanonicalBytes) -> Result<EvidenceRef, EvidenceError> {
        let reference = sha256_digest(content);
        self.items
            .write()
            .entry(reference)
            .or_insert_with(|| content.clone());
        Ok(reference)
    }

    fn get(&self, reference: &EvidenceRef) -> Result<CanonicalBytes, EvidenceError> {
        self.items
            .read()
            .get(reference)
            .cloned()
            .ok_or(EvidenceError::NotFound(*reference))
    }

    fn contains(&self, reference: &EvidenceRef) -> bool {
        self.items.read().contains_key(reference)
    }
}

//! # Claim Rights
//!
//! A claim right is minted by the coverage issuer when coverage is bought.
//! The engine never mints; it only reads rights and decrements their
//! remaining balance on payout. Each right has its own lock so that two
//! concurrent claims on the same right serialize.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use pcov_core::{AccountId, Amount, ClaimRightId, CoverKey, PcovError, Timestamp};

use crate::error::ClaimError;

/// Redeemable unit of purchased coverage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRight {
    /// Unique id.
    pub id: ClaimRightId,
    /// Owning account; the only one that may claim.
    pub owner: AccountId,
    /// The cover this right insures against.
    pub cover: CoverKey,
    /// Total redeemable amount.
    pub face: Amount,
    /// Amount not yet paid out.
    pub remaining: Amount,
    /// When the coverage was bought.
    pub purchased_at: Timestamp,
    /// When the coverage stops applying to new incidents.
    pub expires_at: Timestamp,
}

impl ClaimRight {
    /// Whether nothing remains to claim.
    pub fn is_exhausted(&self) -> bool {
        self.remaining.is_zero()
    }

    /// Total already paid out.
    pub fn claimed(&self) -> Amount {
        self.face.checked_sub(self.remaining).unwrap_or_default()
    }

    /// Whether the coverage applies to an incident on `incident_date`.
    pub fn covers_incident(&self, incident_date: Timestamp) -> bool {
        self.purchased_at < incident_date && incident_date <= self.expires_at
    }
}

/// Terms of a right to issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    /// Buyer.
    pub owner: AccountId,
    /// Cover bought.
    pub cover: CoverKey,
    /// Face value.
    pub face: Amount,
    /// Purchase time.
    pub purchased_at: Timestamp,
    /// Coverage duration in calendar months.
    pub coverage_months: u32,
}

/// All issued rights.
#[derive(Debug, Default)]
pub struct ClaimRightRegistry {
    rights: RwLock<HashMap<ClaimRightId, Arc<Mutex<ClaimRight>>>>,
}

impl ClaimRightRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly purchased right.
    pub fn issue(&self, request: IssueRequest) -> Result<ClaimRightId, ClaimError> {
        if request.face.is_zero() {
            return Err(ClaimError::InvalidAmount(format!(
                "claim right for {} on {} needs a positive face value",
                request.owner, request.cover
            )));
        }
        if request.coverage_months == 0 {
            return Err(PcovError::Validation(format!(
                "claim right for {} on {} needs at least one month of coverage",
                request.owner, request.cover
            ))
            .into());
        }
        let expires_at = request.purchased_at.plus_months(request.coverage_months)?;
        let right = ClaimRight {
            id: ClaimRightId::new(),
            owner: request.owner,
            cover: request.cover,
            face: request.face,
            remaining: request.face,
            purchased_at: request.purchased_at,
            expires_at,
        };
        let id = right.id;
        tracing::info!(
            right = %id,
            owner = %right.owner,
            cover = %right.cover,
            face = %right.face,
            %expires_at,
            "claim right issued"
        );
        self.rights.write().insert(id, Arc::new(Mutex::new(right)));
        Ok(id)
    }

    /// Copy of a right.
    pub fn get(&self, id: &ClaimRightId) -> Option<ClaimRight> {
        self.rights.read().get(id).map(|r| r.lock().clone())
    }

    /// Every right owned by `owner`.
    pub fn rights_of(&self, owner: &AccountId) -> Vec<ClaimRight> {
        self.rights
            .read()
            .values()
            .map(|r| r.lock().clone())
            .filter(|r| &r.owner == owner)
            .collect()
    }

    pub(crate) fn handle(&self, id: &ClaimRightId) -> Option<Arc<Mutex<ClaimRight>>> {
        self.rights.read().get(id).cloned()
    }
}

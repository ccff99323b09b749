//! # Claim Error Types
//!
//! Callers must be able to tell "try later" ([`ClaimError::ReportingStillActive`])
//! from "never" ([`ClaimError::ClaimDenied`], [`ClaimError::ClaimPeriodExpired`])
//! without inspecting messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use pcov_core::{AccountId, Amount, CoverKey, PcovError, Timestamp};
use pcov_governance::GovernanceError;

/// Why a claim can never succeed as submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// No claim right with this id was issued.
    UnknownRight,
    /// The claimant does not own the right.
    NotOwner,
    /// The right covers a different cover.
    CoverMismatch,
    /// No incident with this date exists on the cover.
    NoSuchIncident,
    /// The right was bought at or after the incident date.
    PurchasedAfterIncident,
    /// Coverage lapsed before the incident date.
    CoverageExpired,
    /// The right's balance is already zero.
    Exhausted,
    /// The amount exceeds the right's remaining balance.
    ExceedsBalance,
    /// The incident was resolved as false.
    VerdictRejected,
}

impl DenialReason {
    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownRight => "unknown_right",
            Self::NotOwner => "not_owner",
            Self::CoverMismatch => "cover_mismatch",
            Self::NoSuchIncident => "no_such_incident",
            Self::PurchasedAfterIncident => "purchased_after_incident",
            Self::CoverageExpired => "coverage_expired",
            Self::Exhausted => "exhausted",
            Self::ExceedsBalance => "exceeds_balance",
            Self::VerdictRejected => "verdict_rejected",
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors arising from claim rights, liquidity and settlement.
#[derive(Error, Debug)]
pub enum ClaimError {
    /// The claim will never be honored as submitted.
    #[error("claim denied: {reason}")]
    ClaimDenied {
        /// Why.
        reason: DenialReason,
    },

    /// The incident's reporting window is still open.
    #[error("reporting still active until {deadline}")]
    ReportingStillActive {
        /// The resolution deadline.
        deadline: Timestamp,
    },

    /// The claim window closed.
    #[error("claim period expired at {claim_deadline}")]
    ClaimPeriodExpired {
        /// The claim deadline that has passed.
        claim_deadline: Timestamp,
    },

    /// Zero amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The cover cannot fund the payout.
    #[error("insufficient liquidity on cover {cover}: available {available}, requested {requested}")]
    InsufficientLiquidity {
        /// The cover.
        cover: CoverKey,
        /// Liquidity held.
        available: Amount,
        /// Amount claimed.
        requested: Amount,
    },

    /// The funds transfer to the claimant failed; nothing was applied.
    #[error("transfer of {amount} to {recipient} failed: {source}")]
    TransferFailed {
        /// The claimant.
        recipient: AccountId,
        /// The payout amount.
        amount: Amount,
        /// Underlying failure.
        #[source]
        source: PcovError,
    },

    /// The cover is not registered with governance.
    #[error("unknown cover {0}")]
    UnknownCover(CoverKey),

    /// Governance failure other than a missing cover or incident.
    #[error(transparent)]
    Governance(#[from] GovernanceError),

    /// Foundation-level failure (right terms, liquidity arithmetic).
    #[error(transparent)]
    Core(#[from] PcovError),
}

impl ClaimError {
    pub(crate) fn denied(reason: DenialReason) -> Self {
        Self::ClaimDenied { reason }
    }

    /// Whether the same claim may succeed later without changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ReportingStillActive { .. })
    }
}

//! # Governance Error Types
//!
//! Every rejection carries the cover and incident it concerns so callers
//! can tell "retry with a larger stake" from "someone else got there first"
//! without parsing messages. None of these are transient; the engine never
//! retries on the caller's behalf.

use thiserror::Error;

use pcov_core::{AccountId, Amount, ContentDigest, CoverKey, PcovError, Timestamp};

/// Errors arising from incident governance operations.
#[derive(Error, Debug)]
pub enum GovernanceError {
    /// Reporting or disputing stake below the cover's minimum.
    #[error("stake insufficient for cover {cover}: required {required}, provided {provided}")]
    InsufficientStake {
        /// The cover being reported or disputed.
        cover: CoverKey,
        /// The policy minimum.
        required: Amount,
        /// The stake offered.
        provided: Amount,
    },

    /// A report was attempted while an incident on the cover is unresolved.
    #[error("cover {cover} is actively reporting incident {incident_date}")]
    ActivelyReporting {
        /// The cover.
        cover: CoverKey,
        /// The unresolved incident.
        incident_date: Timestamp,
    },

    /// A second dispute was attempted on the same incident.
    #[error("incident {incident_date} on cover {cover} already disputed by {disputer}")]
    AlreadyDisputed {
        /// The cover.
        cover: CoverKey,
        /// The incident.
        incident_date: Timestamp,
        /// The account whose dispute was accepted.
        disputer: AccountId,
    },

    /// Zero stake.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Dispute or vote after the resolution deadline.
    #[error("reporting on incident {incident_date} of cover {cover} closed at {deadline}")]
    ReportingClosed {
        /// The cover.
        cover: CoverKey,
        /// The incident.
        incident_date: Timestamp,
        /// The resolution deadline that has passed.
        deadline: Timestamp,
    },

    /// The cover was never registered.
    #[error("unknown cover {0}")]
    UnknownCover(CoverKey),

    /// The policy provider registered the same cover twice.
    #[error("cover {0} is already registered")]
    CoverAlreadyRegistered(CoverKey),

    /// No incident with this date exists on the cover.
    #[error("no incident {incident_date} on cover {cover}")]
    IncidentNotFound {
        /// The cover.
        cover: CoverKey,
        /// The requested incident date.
        incident_date: Timestamp,
    },

    /// The incident's per-account ledger was compacted after its claim window.
    #[error("incident {incident_date} on cover {cover} is archived")]
    EpochArchived {
        /// The cover.
        cover: CoverKey,
        /// The incident.
        incident_date: Timestamp,
    },

    /// The evidence reference is not held by the configured evidence store.
    #[error("unknown evidence {0}")]
    UnknownEvidence(ContentDigest),

    /// A stake total would overflow.
    #[error("stake overflow: {0}")]
    AmountOverflow(String),

    /// The stake could not be collected from the staker.
    #[error("could not collect stake from {account}: {source}")]
    StakeCollection {
        /// The staker.
        account: AccountId,
        /// Underlying failure.
        #[source]
        source: PcovError,
    },

    /// Foundation-level failure (terms validation, deadline arithmetic).
    #[error(transparent)]
    Core(#[from] PcovError),
}

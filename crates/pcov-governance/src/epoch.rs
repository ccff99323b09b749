//! # Incident Epochs
//!
//! One report → optional dispute → resolution → claim window lifecycle for
//! a cover, addressed by the time the first report was accepted.
//!
//! ```text
//!              report                dispute
//!   Normal ───────────▶ Reporting ───────────▶ Disputed
//!                           │                     │
//!                           └──── deadline ───────┴──▶ Resolved{Confirmed|Rejected}
//!                                                          │
//!                                          claim deadline  ▼
//!                                                        inert
//! ```
//!
//! Resolution is lazy: nothing is written when the deadline passes. The
//! verdict and the public [`CoverStatus`] are derived from the epoch, the
//! ledger totals and the clock whenever they are queried.

use serde::{Deserialize, Serialize};

use pcov_core::{AccountId, Amount, ContentDigest, CoverKey, Timestamp};

use crate::evidence::EvidenceRef;
use crate::ledger::EpochKey;
use crate::verdict::Verdict;

// ─── Status ──────────────────────────────────────────────────────────

/// Externally visible status of a cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverStatus {
    /// No live incident.
    Normal,
    /// Reported and undisputed, or resolved as confirmed.
    IncidentHappened,
    /// Disputed, or resolved as rejected.
    FalseReporting,
}

impl CoverStatus {
    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::IncidentHappened => "INCIDENT_HAPPENED",
            Self::FalseReporting => "FALSE_REPORTING",
        }
    }
}

impl std::fmt::Display for CoverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Roles ───────────────────────────────────────────────────────────

/// Who currently holds the reporter role of an epoch.
///
/// A successful dispute hands the role to the disputer; the original
/// reporter is kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReporterRole {
    /// Nobody has disputed.
    Original {
        /// The first reporter.
        reporter: AccountId,
    },
    /// The incident was disputed.
    Superseded {
        /// The first reporter.
        reporter: AccountId,
        /// The disputer, now the current reporter.
        disputer: AccountId,
    },
}

impl ReporterRole {
    /// The account currently holding the role.
    pub fn current(&self) -> &AccountId {
        match self {
            Self::Original { reporter } => reporter,
            Self::Superseded { disputer, .. } => disputer,
        }
    }

    /// The account that filed the first report.
    pub fn original(&self) -> &AccountId {
        match self {
            Self::Original { reporter } | Self::Superseded { reporter, .. } => reporter,
        }
    }

    /// The disputer, if any.
    pub fn disputer(&self) -> Option<&AccountId> {
        match self {
            Self::Original { .. } => None,
            Self::Superseded { disputer, .. } => Some(disputer),
        }
    }
}

// ─── Records ─────────────────────────────────────────────────────────

/// The accepted dispute of an epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeFiling {
    /// Initial stake, seeded into the disputer's oppose bucket.
    pub stake: Amount,
    /// Evidence supplied with the dispute.
    pub evidence: EvidenceRef,
    /// When the dispute was accepted.
    pub filed_at: Timestamp,
}

/// What caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// First report accepted.
    Reported,
    /// Dispute accepted.
    Disputed,
}

/// Audit record of a status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentTransition {
    /// Status before.
    pub from: CoverStatus,
    /// Status after.
    pub to: CoverStatus,
    /// Cause.
    pub kind: TransitionKind,
    /// The account whose action caused it.
    pub actor: AccountId,
    /// Stake put up with the action.
    pub stake: Amount,
    /// Evidence supplied with the action.
    pub evidence_digest: Option<ContentDigest>,
    /// When it happened (UTC).
    pub timestamp: Timestamp,
}

/// One incident on a cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentEpoch {
    /// The cover.
    pub cover: CoverKey,
    /// When the first report was accepted.
    pub incident_date: Timestamp,
    /// Reporter, and disputer once there is one.
    pub role: ReporterRole,
    /// Evidence supplied with the report.
    pub report_evidence: EvidenceRef,
    /// Initial reporting stake.
    pub reporter_stake: Amount,
    /// The dispute, if one was accepted.
    pub dispute: Option<DisputeFiling>,
    /// `incident_date + reporting window`. Never moves.
    pub resolution_deadline: Timestamp,
    /// `resolution_deadline + claim window`.
    pub claim_deadline: Timestamp,
    history: Vec<IncidentTransition>,
}

impl IncidentEpoch {
    /// Open an epoch from an accepted report.
    pub(crate) fn open(
        cover: CoverKey,
        reporter: AccountId,
        evidence: EvidenceRef,
        stake: Amount,
        incident_date: Timestamp,
        resolution_deadline: Timestamp,
        claim_deadline: Timestamp,
    ) -> Self {
        let transition = IncidentTransition {
            from: CoverStatus::Normal,
            to: CoverStatus::IncidentHappened,
            kind: TransitionKind::Reported,
            actor: reporter.clone(),
            stake,
            evidence_digest: Some(evidence),
            timestamp: incident_date,
        };
        Self {
            cover,
            incident_date,
            role: ReporterRole::Original { reporter },
            report_evidence: evidence,
            reporter_stake: stake,
            dispute: None,
            resolution_deadline,
            claim_deadline,
            history: vec![transition],
        }
    }

    /// Record an accepted dispute. The caller has checked that the epoch is
    /// open and undisputed.
    pub(crate) fn record_dispute(
        &mut self,
        disputer: AccountId,
        evidence: EvidenceRef,
        stake: Amount,
        now: Timestamp,
    ) {
        self.role = ReporterRole::Superseded {
            reporter: self.role.original().clone(),
            disputer: disputer.clone(),
        };
        self.dispute = Some(DisputeFiling {
            stake,
            evidence,
            filed_at: now,
        });
        self.history.push(IncidentTransition {
            from: CoverStatus::IncidentHappened,
            to: CoverStatus::FalseReporting,
            kind: TransitionKind::Disputed,
            actor: disputer,
            stake,
            evidence_digest: Some(evidence),
            timestamp: now,
        });
    }

    /// Ledger key of this epoch.
    pub fn key(&self) -> EpochKey {
        EpochKey::new(self.cover.clone(), self.incident_date)
    }

    /// Whether a dispute was accepted.
    pub fn is_disputed(&self) -> bool {
        self.dispute.is_some()
    }

    /// Whether votes and disputes are still accepted.
    pub fn is_open(&self, now: Timestamp) -> bool {
        now < self.resolution_deadline
    }

    /// Whether the claim window has passed.
    pub fn is_inert(&self, now: Timestamp) -> bool {
        now > self.claim_deadline
    }

    /// Public status contributed by this epoch under `verdict`.
    pub fn status(&self, verdict: Verdict, now: Timestamp) -> CoverStatus {
        if self.is_inert(now) {
            return CoverStatus::Normal;
        }
        match verdict {
            Verdict::Pending if self.is_disputed() => CoverStatus::FalseReporting,
            Verdict::Pending | Verdict::Confirmed => CoverStatus::IncidentHappened,
            Verdict::Rejected => CoverStatus::FalseReporting,
        }
    }

    /// Transitions in the order they happened.
    pub fn history(&self) -> &[IncidentTransition] {
        &self.history
    }
}

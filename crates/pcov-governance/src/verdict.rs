//! # Verdict Resolver
//!
//! The binding outcome of an incident is a pure function of the epoch's
//! final stake totals and whether its resolution deadline has passed.
//! Ties reject the incident.

use serde::{Deserialize, Serialize};

use pcov_core::Timestamp;

use crate::ledger::StakeTotals;

/// Outcome of an incident epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The resolution window is still open.
    Pending,
    /// Support strictly exceeded opposition.
    Confirmed,
    /// Opposition exceeded or tied support.
    Rejected,
}

impl Verdict {
    /// Whether the verdict is binding.
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve an epoch.
///
/// `Pending` while `now < resolution_deadline`; afterwards `Confirmed` on a
/// strict support majority and `Rejected` otherwise.
pub fn resolve(totals: StakeTotals, resolution_deadline: Timestamp, now: Timestamp) -> Verdict {
    if now < resolution_deadline {
        Verdict::Pending
    } else if totals.support > totals.oppose {
        Verdict::Confirmed
    } else {
        Verdict::Rejected
    }
}

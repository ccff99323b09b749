//! # Stake Ledger
//!
//! Append-only two-bucket accounting keyed by (incident epoch, account).
//! Buckets only grow; there is no withdrawal. Each epoch owns a segment
//! holding its per-account entries and the running aggregate, so
//! `totals()` is O(1) and always equals the sum over accounts.
//!
//! Deposits are two-phase: [`StakeLedger::prepare`] validates and computes
//! the post-deposit state without touching the ledger, and
//! [`StakeLedger::commit`] applies it infallibly. The state machine collects
//! the stake from the staker between the two, so a failed collection leaves
//! no trace.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use pcov_core::{AccountId, Amount, CoverKey, Timestamp};

use crate::error::GovernanceError;

/// Identifies one incident epoch: the cover and the date of its first report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpochKey {
    /// The cover.
    pub cover: CoverKey,
    /// When the first report was accepted.
    pub incident_date: Timestamp,
}

impl EpochKey {
    /// Build a key.
    pub fn new(cover: CoverKey, incident_date: Timestamp) -> Self {
        Self {
            cover,
            incident_date,
        }
    }
}

impl std::fmt::Display for EpochKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.cover, self.incident_date)
    }
}

/// Which side of the incident a stake backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// "The incident is real": reporter stake and attestations.
    Support,
    /// "The incident is false": disputer stake and refutations.
    Oppose,
}

/// A (support, oppose) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeTotals {
    /// Stake backing the incident.
    pub support: Amount,
    /// Stake contesting the incident.
    pub oppose: Amount,
}

impl StakeTotals {
    fn with_deposit(self, bucket: Bucket, amount: Amount) -> Option<Self> {
        let mut next = self;
        match bucket {
            Bucket::Support => next.support = self.support.checked_add(amount)?,
            Bucket::Oppose => next.oppose = self.oppose.checked_add(amount)?,
        }
        Some(next)
    }
}

#[derive(Debug, Clone, Default)]
struct Segment {
    /// `None` once compacted.
    entries: Option<HashMap<AccountId, StakeTotals>>,
    totals: StakeTotals,
}

/// A validated deposit ready to be applied with [`StakeLedger::commit`].
#[derive(Debug, Clone)]
#[must_use = "a prepared deposit does nothing until committed"]
pub struct PreparedDeposit {
    epoch: EpochKey,
    account: AccountId,
    entry: StakeTotals,
    totals: StakeTotals,
}

impl PreparedDeposit {
    /// Epoch aggregate after the deposit.
    pub fn totals(&self) -> StakeTotals {
        self.totals
    }
}

/// The ledger.
#[derive(Debug, Clone, Default)]
pub struct StakeLedger {
    segments: HashMap<EpochKey, Segment>,
}

impl StakeLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a deposit and compute its effect without applying it.
    ///
    /// # Errors
    ///
    /// - [`GovernanceError::InvalidAmount`] if `amount` is zero.
    /// - [`GovernanceError::EpochArchived`] if the epoch was compacted.
    /// - [`GovernanceError::AmountOverflow`] if a bucket would overflow.
    pub fn prepare(
        &self,
        epoch: &EpochKey,
        account: &AccountId,
        bucket: Bucket,
        amount: Amount,
    ) -> Result<PreparedDeposit, GovernanceError> {
        if amount.is_zero() {
            return Err(GovernanceError::InvalidAmount(format!(
                "stake from {account} on {epoch} must be positive"
            )));
        }
        let (entry, totals) = match self.segments.get(epoch) {
            None => (StakeTotals::default(), StakeTotals::default()),
            Some(segment) => {
                let entries = segment.entries.as_ref().ok_or_else(|| GovernanceError::EpochArchived {
                    cover: epoch.cover.clone(),
                    incident_date: epoch.incident_date,
                })?;
                (
                    entries.get(account).copied().unwrap_or_default(),
                    segment.totals,
                )
            }
        };
        let overflow = || GovernanceError::AmountOverflow(format!("{bucket:?} stake on {epoch}"));
        Ok(PreparedDeposit {
            epoch: epoch.clone(),
            account: account.clone(),
            entry: entry.with_deposit(bucket, amount).ok_or_else(overflow)?,
            totals: totals.with_deposit(bucket, amount).ok_or_else(overflow)?,
        })
    }

    /// Apply a prepared deposit.
    ///
    /// Must be called with no other mutation of the same epoch in between;
    /// the state machine guarantees this by holding the cover lock.
    pub fn commit(&mut self, deposit: PreparedDeposit) -> StakeTotals {
        let segment = self.segments.entry(deposit.epoch).or_insert_with(|| Segment {
            entries: Some(HashMap::new()),
            totals: StakeTotals::default(),
        });
        if let Some(entries) = segment.entries.as_mut() {
            entries.insert(deposit.account, deposit.entry);
        }
        segment.totals = deposit.totals;
        segment.totals
    }

    /// Validate and apply in one step.
    pub fn deposit(
        &mut self,
        epoch: &EpochKey,
        account: &AccountId,
        bucket: Bucket,
        amount: Amount,
    ) -> Result<StakeTotals, GovernanceError> {
        let prepared = self.prepare(epoch, account, bucket, amount)?;
        Ok(self.commit(prepared))
    }

    /// Aggregate (support, oppose) for the epoch; zero if nothing was staked.
    pub fn totals(&self, epoch: &EpochKey) -> StakeTotals {
        self.segments
            .get(epoch)
            .map(|s| s.totals)
            .unwrap_or_default()
    }

    /// The account's own (support, oppose), or `None` once compacted.
    pub fn totals_of(&self, epoch: &EpochKey, account: &AccountId) -> Option<StakeTotals> {
        match self.segments.get(epoch) {
            None => Some(StakeTotals::default()),
            Some(segment) => segment
                .entries
                .as_ref()
                .map(|entries| entries.get(account).copied().unwrap_or_default()),
        }
    }

    /// Number of distinct accounts that staked on the epoch.
    pub fn participants(&self, epoch: &EpochKey) -> usize {
        self.segments
            .get(epoch)
            .and_then(|s| s.entries.as_ref())
            .map_or(0, HashMap::len)
    }

    /// Drop the epoch's per-account entries, keeping its aggregate.
    ///
    /// Returns `true` if entries were dropped by this call.
    pub fn compact(&mut self, epoch: &EpochKey) -> bool {
        self.segments
            .get_mut(epoch)
            .and_then(|s| s.entries.take())
            .is_some()
    }

    /// Whether the epoch has been compacted.
    pub fn is_compacted(&self, epoch: &EpochKey) -> bool {
        self.segments
            .get(epoch)
            .is_some_and(|s| s.entries.is_none())
    }
}

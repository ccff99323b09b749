//! # Incident State Machine
//!
//! Owns every registered cover and its incident epochs. Each cover's state
//! lives behind its own mutex inside a read-mostly map, so operations on
//! different covers never contend and operations on one cover are
//! serialized. Reads that only derive status or verdicts take the same
//! mutex briefly and never mutate.
//!
//! ## Security Invariant
//!
//! Every stake-taking operation validates, then collects the stake through
//! the [`StakeCollector`], then commits the ledger entry, all under the
//! cover lock. A rejected operation leaves neither a ledger entry nor a
//! collected stake behind.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use pcov_core::{AccountId, Amount, Clock, CoverKey, CoverTerms, EngineConfig, Timestamp};

use crate::epoch::{CoverStatus, IncidentEpoch, IncidentTransition, ReporterRole};
use crate::error::GovernanceError;
use crate::evidence::{EvidenceRef, EvidenceStore};
use crate::ledger::{Bucket, EpochKey, StakeLedger, StakeTotals};
use crate::stake::StakeCollector;
use crate::verdict::{resolve, Verdict};

/// Read-only view of an epoch at a point in time, as consumed by claims
/// settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentSnapshot {
    /// The epoch record.
    pub epoch: IncidentEpoch,
    /// Aggregate stake.
    pub totals: StakeTotals,
    /// Verdict as of `as_of`.
    pub verdict: Verdict,
    /// Clock reading the snapshot was taken at.
    pub as_of: Timestamp,
}

#[derive(Debug)]
struct CoverState {
    terms: CoverTerms,
    epochs: BTreeMap<Timestamp, IncidentEpoch>,
    ledger: StakeLedger,
}

impl CoverState {
    fn new(terms: CoverTerms) -> Self {
        Self {
            terms,
            epochs: BTreeMap::new(),
            ledger: StakeLedger::new(),
        }
    }

    fn latest(&self) -> Option<&IncidentEpoch> {
        self.epochs.values().next_back()
    }

    fn epoch(&self, incident_date: Timestamp) -> Result<&IncidentEpoch, GovernanceError> {
        self.epochs
            .get(&incident_date)
            .ok_or_else(|| GovernanceError::IncidentNotFound {
                cover: self.terms.key.clone(),
                incident_date,
            })
    }

    fn verdict(&self, epoch: &IncidentEpoch, now: Timestamp) -> Verdict {
        resolve(self.ledger.totals(&epoch.key()), epoch.resolution_deadline, now)
    }

    fn status(&self, now: Timestamp) -> CoverStatus {
        match self.latest() {
            None => CoverStatus::Normal,
            Some(epoch) => epoch.status(self.verdict(epoch, now), now),
        }
    }

    /// Epoch lookup for a vote: it must exist and still be open.
    fn open_epoch(
        &self,
        incident_date: Timestamp,
        now: Timestamp,
    ) -> Result<&IncidentEpoch, GovernanceError> {
        let epoch = self.epoch(incident_date)?;
        if !epoch.is_open(now) {
            return Err(GovernanceError::ReportingClosed {
                cover: epoch.cover.clone(),
                incident_date,
                deadline: epoch.resolution_deadline,
            });
        }
        Ok(epoch)
    }
}

/// The incident governance engine.
pub struct Governance {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    collector: Arc<dyn StakeCollector>,
    evidence: Option<Arc<dyn EvidenceStore>>,
    covers: RwLock<HashMap<CoverKey, Arc<Mutex<CoverState>>>>,
}

impl std::fmt::Debug for Governance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Governance")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("collector", &self.collector)
            .field("evidence_checked", &self.evidence.is_some())
            .field("covers", &self.covers.read().len())
            .finish()
    }
}

impl Governance {
    /// A new engine with no covers.
    pub fn new(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        collector: Arc<dyn StakeCollector>,
    ) -> Self {
        Self {
            config,
            clock,
            collector,
            evidence: None,
            covers: RwLock::new(HashMap::new()),
        }
    }

    /// Require report and dispute evidence to be held by `store`.
    pub fn with_evidence_store(mut self, store: Arc<dyn EvidenceStore>) -> Self {
        self.evidence = Some(store);
        self
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The shared clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn cover(&self, key: &CoverKey) -> Result<Arc<Mutex<CoverState>>, GovernanceError> {
        self.covers
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| GovernanceError::UnknownCover(key.clone()))
    }

    fn check_evidence(&self, evidence: &EvidenceRef) -> Result<(), GovernanceError> {
        match &self.evidence {
            Some(store) if !store.contains(evidence) => {
                Err(GovernanceError::UnknownEvidence(*evidence))
            }
            _ => Ok(()),
        }
    }

    // ─── Policy provider ─────────────────────────────────────────────

    /// Register a cover's immutable terms.
    pub fn register_cover(&self, terms: CoverTerms) -> Result<(), GovernanceError> {
        self.config.validate_terms(&terms)?;
        let mut covers = self.covers.write();
        if covers.contains_key(&terms.key) {
            return Err(GovernanceError::CoverAlreadyRegistered(terms.key));
        }
        tracing::info!(
            cover = %terms.key,
            min_report_stake = %terms.min_report_stake,
            min_dispute_stake = %terms.min_dispute_stake,
            reporting_window_secs = terms.reporting_window_secs,
            claim_window_secs = terms.claim_window_secs,
            "cover registered"
        );
        covers.insert(terms.key.clone(), Arc::new(Mutex::new(CoverState::new(terms))));
        Ok(())
    }

    /// The cover's terms.
    pub fn terms(&self, cover: &CoverKey) -> Result<CoverTerms, GovernanceError> {
        Ok(self.cover(cover)?.lock().terms.clone())
    }

    // ─── Stake-taking operations ─────────────────────────────────────

    /// Open a new incident epoch. Returns its incident date.
    ///
    /// # Errors
    ///
    /// - [`GovernanceError::InvalidAmount`] for a zero stake.
    /// - [`GovernanceError::ActivelyReporting`] while the latest epoch is unresolved.
    /// - [`GovernanceError::InsufficientStake`] below the cover's minimum.
    /// - [`GovernanceError::StakeCollection`] if the stake cannot be collected.
    pub fn report(
        &self,
        cover: &CoverKey,
        account: &AccountId,
        evidence: EvidenceRef,
        stake: Amount,
    ) -> Result<Timestamp, GovernanceError> {
        let result = self.report_inner(cover, account, evidence, stake);
        if let Err(err) = &result {
            tracing::warn!(cover = %cover, account = %account, %stake, error = %err, "report rejected");
        }
        result
    }

    fn report_inner(
        &self,
        cover: &CoverKey,
        account: &AccountId,
        evidence: EvidenceRef,
        stake: Amount,
    ) -> Result<Timestamp, GovernanceError> {
        if stake.is_zero() {
            return Err(GovernanceError::InvalidAmount(format!(
                "report on {cover} by {account} needs a positive stake"
            )));
        }
        let handle = self.cover(cover)?;
        let mut state = handle.lock();
        let now = self.clock.now();

        if let Some(latest) = state.latest() {
            if latest.is_open(now) {
                return Err(GovernanceError::ActivelyReporting {
                    cover: cover.clone(),
                    incident_date: latest.incident_date,
                });
            }
        }
        if stake < state.terms.min_report_stake {
            return Err(GovernanceError::InsufficientStake {
                cover: cover.clone(),
                required: state.terms.min_report_stake,
                provided: stake,
            });
        }
        self.check_evidence(&evidence)?;

        let resolution_deadline = now.plus_secs(state.terms.reporting_window_secs)?;
        let claim_deadline = resolution_deadline.plus_secs(state.terms.claim_window_secs)?;
        let key = EpochKey::new(cover.clone(), now);
        let prepared = state.ledger.prepare(&key, account, Bucket::Support, stake)?;
        self.collector
            .collect(cover, account, stake)
            .map_err(|source| GovernanceError::StakeCollection {
                account: account.clone(),
                source,
            })?;

        state.ledger.commit(prepared);
        state.epochs.insert(
            now,
            IncidentEpoch::open(
                cover.clone(),
                account.clone(),
                evidence,
                stake,
                now,
                resolution_deadline,
                claim_deadline,
            ),
        );
        tracing::info!(
            cover = %cover,
            incident_date = %now,
            reporter = %account,
            %stake,
            %resolution_deadline,
            %claim_deadline,
            "incident reported"
        );
        Ok(now)
    }

    /// Contest an open, undisputed incident. The disputer becomes the
    /// current reporter; the resolution deadline does not move.
    ///
    /// # Errors
    ///
    /// - [`GovernanceError::IncidentNotFound`] if `incident_date` names no epoch.
    /// - [`GovernanceError::ReportingClosed`] once the resolution deadline has passed.
    /// - [`GovernanceError::AlreadyDisputed`] for any dispute after the first.
    /// - [`GovernanceError::InsufficientStake`] below the cover's dispute minimum.
    pub fn dispute(
        &self,
        cover: &CoverKey,
        incident_date: Timestamp,
        account: &AccountId,
        evidence: EvidenceRef,
        stake: Amount,
    ) -> Result<(), GovernanceError> {
        let result = self.dispute_inner(cover, incident_date, account, evidence, stake);
        if let Err(err) = &result {
            tracing::warn!(
                cover = %cover,
                incident_date = %incident_date,
                account = %account,
                %stake,
                error = %err,
                "dispute rejected"
            );
        }
        result
    }

    fn dispute_inner(
        &self,
        cover: &CoverKey,
        incident_date: Timestamp,
        account: &AccountId,
        evidence: EvidenceRef,
        stake: Amount,
    ) -> Result<(), GovernanceError> {
        let handle = self.cover(cover)?;
        let mut state = handle.lock();
        let now = self.clock.now();

        let epoch = state.epoch(incident_date)?;
        if let Some(disputer) = epoch.role.disputer() {
            return Err(GovernanceError::AlreadyDisputed {
                cover: cover.clone(),
                incident_date,
                disputer: disputer.clone(),
            });
        }
        if !epoch.is_open(now) {
            return Err(GovernanceError::ReportingClosed {
                cover: cover.clone(),
                incident_date,
                deadline: epoch.resolution_deadline,
            });
        }
        if stake.is_zero() {
            return Err(GovernanceError::InvalidAmount(format!(
                "dispute on {cover} by {account} needs a positive stake"
            )));
        }
        if stake < state.terms.min_dispute_stake {
            return Err(GovernanceError::InsufficientStake {
                cover: cover.clone(),
                required: state.terms.min_dispute_stake,
                provided: stake,
            });
        }
        self.check_evidence(&evidence)?;

        let key = epoch.key();
        let prepared = state.ledger.prepare(&key, account, Bucket::Oppose, stake)?;
        self.collector
            .collect(cover, account, stake)
            .map_err(|source| GovernanceError::StakeCollection {
                account: account.clone(),
                source,
            })?;

        let totals = state.ledger.commit(prepared);
        if let Some(epoch) = state.epochs.get_mut(&incident_date) {
            epoch.record_dispute(account.clone(), evidence, stake, now);
        }
        tracing::info!(
            cover = %cover,
            incident_date = %incident_date,
            disputer = %account,
            %stake,
            support = %totals.support,
            oppose = %totals.oppose,
            "incident disputed"
        );
        Ok(())
    }

    /// Stake that the incident is real. Returns the epoch totals afterwards.
    pub fn attest(
        &self,
        cover: &CoverKey,
        incident_date: Timestamp,
        account: &AccountId,
        stake: Amount,
    ) -> Result<StakeTotals, GovernanceError> {
        self.vote(cover, incident_date, account, stake, Bucket::Support)
    }

    /// Stake that the incident is false. Returns the epoch totals afterwards.
    pub fn refute(
        &self,
        cover: &CoverKey,
        incident_date: Timestamp,
        account: &AccountId,
        stake: Amount,
    ) -> Result<StakeTotals, GovernanceError> {
        self.vote(cover, incident_date, account, stake, Bucket::Oppose)
    }

    fn vote(
        &self,
        cover: &CoverKey,
        incident_date: Timestamp,
        account: &AccountId,
        stake: Amount,
        bucket: Bucket,
    ) -> Result<StakeTotals, GovernanceError> {
        let handle = self.cover(cover)?;
        let mut state = handle.lock();
        let now = self.clock.now();

        let key = state.open_epoch(incident_date, now)?.key();
        let prepared = state.ledger.prepare(&key, account, bucket, stake)?;
        self.collector
            .collect(cover, account, stake)
            .map_err(|source| GovernanceError::StakeCollection {
                account: account.clone(),
                source,
            })?;
        let totals = state.ledger.commit(prepared);
        tracing::debug!(
            cover = %cover,
            incident_date = %incident_date,
            account = %account,
            ?bucket,
            %stake,
            support = %totals.support,
            oppose = %totals.oppose,
            "stake recorded"
        );
        Ok(totals)
    }

    // ─── Queries ─────────────────────────────────────────────────────

    /// Public status of the cover, derived from its latest epoch.
    pub fn status(&self, cover: &CoverKey) -> Result<CoverStatus, GovernanceError> {
        let handle = self.cover(cover)?;
        let state = handle.lock();
        Ok(state.status(self.clock.now()))
    }

    /// Incident date of the most recent epoch, if any.
    pub fn active_incident_date(&self, cover: &CoverKey) -> Result<Option<Timestamp>, GovernanceError> {
        let handle = self.cover(cover)?;
        let state = handle.lock();
        Ok(state.latest().map(|e| e.incident_date))
    }

    /// Current reporter: the disputer if there is one, else the first reporter.
    pub fn reporter(&self, cover: &CoverKey, incident_date: Timestamp) -> Result<AccountId, GovernanceError> {
        Ok(self.reporter_role(cover, incident_date)?.current().clone())
    }

    /// Both identities behind the reporter role.
    pub fn reporter_role(
        &self,
        cover: &CoverKey,
        incident_date: Timestamp,
    ) -> Result<ReporterRole, GovernanceError> {
        let handle = self.cover(cover)?;
        let state = handle.lock();
        Ok(state.epoch(incident_date)?.role.clone())
    }

    /// Aggregate (support, oppose) of an epoch.
    pub fn stakes(&self, cover: &CoverKey, incident_date: Timestamp) -> Result<StakeTotals, GovernanceError> {
        let handle = self.cover(cover)?;
        let state = handle.lock();
        let epoch = state.epoch(incident_date)?;
        Ok(state.ledger.totals(&epoch.key()))
    }

    /// One account's (support, oppose) on an epoch.
    ///
    /// Fails with [`GovernanceError::EpochArchived`] once the epoch's
    /// per-account entries have been compacted.
    pub fn stakes_of(
        &self,
        cover: &CoverKey,
        incident_date: Timestamp,
        account: &AccountId,
    ) -> Result<StakeTotals, GovernanceError> {
        let handle = self.cover(cover)?;
        let state = handle.lock();
        let epoch = state.epoch(incident_date)?;
        state
            .ledger
            .totals_of(&epoch.key(), account)
            .ok_or_else(|| GovernanceError::EpochArchived {
                cover: cover.clone(),
                incident_date,
            })
    }

    /// Verdict of an epoch as of now.
    pub fn verdict(&self, cover: &CoverKey, incident_date: Timestamp) -> Result<Verdict, GovernanceError> {
        let handle = self.cover(cover)?;
        let state = handle.lock();
        let epoch = state.epoch(incident_date)?;
        Ok(state.verdict(epoch, self.clock.now()))
    }

    /// Copy of the epoch record.
    pub fn epoch(&self, cover: &CoverKey, incident_date: Timestamp) -> Result<IncidentEpoch, GovernanceError> {
        let handle = self.cover(cover)?;
        let state = handle.lock();
        Ok(state.epoch(incident_date)?.clone())
    }

    /// Epoch, totals and verdict read under one lock at one clock reading.
    pub fn snapshot(
        &self,
        cover: &CoverKey,
        incident_date: Timestamp,
    ) -> Result<IncidentSnapshot, GovernanceError> {
        let handle = self.cover(cover)?;
        let state = handle.lock();
        let now = self.clock.now();
        let epoch = state.epoch(incident_date)?;
        let totals = state.ledger.totals(&epoch.key());
        Ok(IncidentSnapshot {
            verdict: resolve(totals, epoch.resolution_deadline, now),
            epoch: epoch.clone(),
            totals,
            as_of: now,
        })
    }

    /// Transition history of an epoch.
    pub fn history(
        &self,
        cover: &CoverKey,
        incident_date: Timestamp,
    ) -> Result<Vec<IncidentTransition>, GovernanceError> {
        let handle = self.cover(cover)?;
        let state = handle.lock();
        Ok(state.epoch(incident_date)?.history().to_vec())
    }

    // ─── Maintenance ─────────────────────────────────────────────────

    /// Drop per-account ledger entries of every epoch past its claim
    /// deadline. Aggregates, epoch records and history are kept. Returns
    /// the number of epochs compacted by this call.
    pub fn compact_inert(&self) -> usize {
        let handles: Vec<_> = self.covers.read().values().cloned().collect();
        let now = self.clock.now();
        let mut compacted = 0;
        for handle in handles {
            let mut state = handle.lock();
            let inert: Vec<EpochKey> = state
                .epochs
                .values()
                .filter(|e| e.is_inert(now))
                .map(IncidentEpoch::key)
                .collect();
            for key in inert {
                if state.ledger.compact(&key) {
                    tracing::debug!(epoch = %key, "epoch ledger compacted");
                    compacted += 1;
                }
            }
        }
        if compacted > 0 {
            tracing::info!(compacted, "inert epochs compacted");
        }
        compacted
    }
}

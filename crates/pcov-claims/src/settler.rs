//! # Claims Settler
//!
//! Pays a claim right holder against a confirmed incident, at most up to
//! the right's face value, only inside the incident's claim window.
//!
//! ## Check Order
//!
//! 1. Zero amount.
//! 2. Right validity: known, owned by the claimant, bound to the cover,
//!    incident exists, bought before the incident, not lapsed, balance
//!    sufficient. These fail the same way at any time.
//! 3. Verdict still pending: try again after the resolution deadline.
//! 4. Verdict rejected.
//! 5. Claim deadline passed.
//! 6. Liquidity, transfer and commit, holding the cover's pool lock and
//!    then the right's lock.
//!
//! ## Security Invariant
//!
//! The right's balance is re-checked under its lock immediately before the
//! transfer, and the transfer happens before any state is touched. A right
//! can therefore never pay out more than its face value in total, and a
//! failed transfer applies nothing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use pcov_core::{AccountId, Amount, ClaimRightId, CoverKey, Timestamp};
use pcov_governance::{Governance, GovernanceError, IncidentSnapshot, Verdict};

use crate::error::{ClaimError, DenialReason};
use crate::liquidity::LiquidityBook;
use crate::right::{ClaimRight, ClaimRightRegistry};
use crate::transfer::FundsTransfer;

/// A request to redeem part or all of a claim right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRequest {
    /// Account asking to be paid.
    pub claimant: AccountId,
    /// Right being redeemed.
    pub right: ClaimRightId,
    /// Cover the incident is on.
    pub cover: CoverKey,
    /// Incident being claimed against.
    pub incident_date: Timestamp,
    /// Amount to redeem.
    pub amount: Amount,
}

/// A completed payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// Who was paid.
    pub recipient: AccountId,
    /// How much.
    pub amount: Amount,
    /// The cover that paid.
    pub cover: CoverKey,
    /// The incident claimed against.
    pub incident_date: Timestamp,
    /// The right redeemed.
    pub right: ClaimRightId,
    /// The right's balance after the payout.
    pub remaining: Amount,
    /// When the payout was made.
    pub paid_at: Timestamp,
}

/// Settles claims against governance verdicts.
#[derive(Debug)]
pub struct ClaimsSettler {
    governance: Arc<Governance>,
    rights: Arc<ClaimRightRegistry>,
    liquidity: Arc<LiquidityBook>,
    transfer: Arc<dyn FundsTransfer>,
}

impl ClaimsSettler {
    /// Settler paying out of `liquidity` through `transfer`.
    pub fn new(
        governance: Arc<Governance>,
        rights: Arc<ClaimRightRegistry>,
        liquidity: Arc<LiquidityBook>,
        transfer: Arc<dyn FundsTransfer>,
    ) -> Self {
        Self {
            governance,
            rights,
            liquidity,
            transfer,
        }
    }

    /// Redeem a claim.
    pub fn claim(&self, request: &ClaimRequest) -> Result<Payout, ClaimError> {
        let result = self.settle(request);
        match &result {
            Ok(payout) => tracing::info!(
                cover = %payout.cover,
                incident_date = %payout.incident_date,
                recipient = %payout.recipient,
                right = %payout.right,
                amount = %payout.amount,
                remaining = %payout.remaining,
                "claim paid"
            ),
            Err(err) => tracing::warn!(
                cover = %request.cover,
                incident_date = %request.incident_date,
                claimant = %request.claimant,
                right = %request.right,
                amount = %request.amount,
                error = %err,
                "claim rejected"
            ),
        }
        result
    }

    fn settle(&self, request: &ClaimRequest) -> Result<Payout, ClaimError> {
        if request.amount.is_zero() {
            return Err(ClaimError::InvalidAmount(format!(
                "claim by {} on {} must be positive",
                request.claimant, request.cover
            )));
        }

        let handle = self
            .rights
            .handle(&request.right)
            .ok_or_else(|| ClaimError::denied(DenialReason::UnknownRight))?;
        let view = handle.lock().clone();
        if view.owner != request.claimant {
            return Err(ClaimError::denied(DenialReason::NotOwner));
        }
        if view.cover != request.cover {
            return Err(ClaimError::denied(DenialReason::CoverMismatch));
        }
        let snapshot = self.snapshot(request)?;
        check_coverage(&view, snapshot.epoch.incident_date)?;

        match snapshot.verdict {
            Verdict::Pending => {
                return Err(ClaimError::ReportingStillActive {
                    deadline: snapshot.epoch.resolution_deadline,
                })
            }
            Verdict::Rejected => return Err(ClaimError::denied(DenialReason::VerdictRejected)),
            Verdict::Confirmed => {}
        }
        if snapshot.as_of > snapshot.epoch.claim_deadline {
            return Err(ClaimError::ClaimPeriodExpired {
                claim_deadline: snapshot.epoch.claim_deadline,
            });
        }

        let insufficient = |available: Amount| ClaimError::InsufficientLiquidity {
            cover: request.cover.clone(),
            available,
            requested: request.amount,
        };
        let pool = self
            .liquidity
            .pool(&request.cover)
            .ok_or_else(|| insufficient(Amount::ZERO))?;
        let mut liquidity = pool.lock();
        let mut right = handle.lock();

        check_balance(&right, request.amount)?;
        let remaining = right
            .remaining
            .checked_sub(request.amount)
            .ok_or_else(|| ClaimError::denied(DenialReason::ExceedsBalance))?;
        let pool_left = liquidity
            .checked_sub(request.amount)
            .ok_or_else(|| insufficient(*liquidity))?;

        self.transfer
            .transfer(&request.cover, &request.claimant, request.amount)
            .map_err(|source| ClaimError::TransferFailed {
                recipient: request.claimant.clone(),
                amount: request.amount,
                source,
            })?;

        *liquidity = pool_left;
        right.remaining = remaining;
        Ok(Payout {
            recipient: request.claimant.clone(),
            amount: request.amount,
            cover: request.cover.clone(),
            incident_date: snapshot.epoch.incident_date,
            right: request.right,
            remaining,
            paid_at: snapshot.as_of,
        })
    }

    fn snapshot(&self, request: &ClaimRequest) -> Result<IncidentSnapshot, ClaimError> {
        self.governance
            .snapshot(&request.cover, request.incident_date)
            .map_err(|err| match err {
                GovernanceError::UnknownCover(cover) => ClaimError::UnknownCover(cover),
                GovernanceError::IncidentNotFound { .. } => {
                    ClaimError::denied(DenialReason::NoSuchIncident)
                }
                other => ClaimError::Governance(other),
            })
    }
}

fn check_coverage(right: &ClaimRight, incident_date: Timestamp) -> Result<(), ClaimError> {
    if right.covers_incident(incident_date) {
        return Ok(());
    }
    let reason = if right.purchased_at >= incident_date {
        DenialReason::PurchasedAfterIncident
    } else {
        DenialReason::CoverageExpired
    };
    Err(ClaimError::denied(reason))
}

fn check_balance(right: &ClaimRight, amount: Amount) -> Result<(), ClaimError> {
    if right.is_exhausted() {
        return Err(ClaimError::denied(DenialReason::Exhausted));
    }
    if amount > right.remaining {
        return Err(ClaimError::denied(DenialReason::ExceedsBalance));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcov_core::{BalanceBook, Clock, ContentDigest, CoverTerms, EngineConfig, ManualClock, PcovError};
    use pcov_governance::BookStakeCollector;

    use crate::right::IssueRequest;
    use crate::transfer::BookFundsTransfer;

    pub(super) struct Fixture {
        pub governance: Arc<Governance>,
        pub rights: Arc<ClaimRightRegistry>,
        pub liquidity: Arc<LiquidityBook>,
        pub book: Arc<BalanceBook>,
        pub clock: Arc<ManualClock>,
        pub settler: ClaimsSettler,
        pub cover: CoverKey,
    }

    pub(super) fn acct(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    pub(super) fn at(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    pub(super) fn fixture_with(transfer: Option<Arc<dyn FundsTransfer>>) -> Fixture {
        let clock = Arc::new(ManualClock::new(at("2026-01-15T12:00:00Z")));
        let book = Arc::new(BalanceBook::new());
        for name in ["alice", "bob", "george"] {
            book.credit(&acct(name), Amount::new(1_000_000)).unwrap();
        }
        book.credit(&acct("vault"), Amount::new(1_000_000)).unwrap();

        let config = EngineConfig::default();
        let governance = Arc::new(Governance::new(
            config.clone(),
            clock.clone(),
            Arc::new(BookStakeCollector::new(Arc::clone(&book), acct("governance"))),
        ));
        let cover = CoverKey::new("Compound Finance Cover").unwrap();
        governance
            .register_cover(CoverTerms::builder(cover.clone(), &config).build(&config).unwrap())
            .unwrap();

        let rights = Arc::new(ClaimRightRegistry::new());
        let liquidity = Arc::new(LiquidityBook::new());
        liquidity.provision(&cover, Amount::new(1_000_000)).unwrap();
        let transfer = transfer
            .unwrap_or_else(|| Arc::new(BookFundsTransfer::new(Arc::clone(&book), acct("vault"))));
        let settler = ClaimsSettler::new(
            Arc::clone(&governance),
            Arc::clone(&rights),
            Arc::clone(&liquidity),
            transfer,
        );
        Fixture { governance, rights, liquidity, book, clock, settler, cover }
    }

    pub(super) fn fixture() -> Fixture {
        fixture_with(None)
    }

    impl Fixture {
        pub fn issue(&self, owner: &str, face: u64, purchased_at: &str, months: u32) -> ClaimRightId {
            self.rights
                .issue(IssueRequest {
                    owner: acct(owner),
                    cover: self.cover.clone(),
                    face: Amount::from(face),
                    purchased_at: at(purchased_at),
                    coverage_months: months,
                })
                .unwrap()
        }

        pub fn report(&self) -> Timestamp {
            self.governance
                .report(&self.cover, &acct("alice"), ContentDigest::new([1; 32]), Amount::new(250))
                .unwrap()
        }

        /// Report, then advance past the resolution deadline with the given
        /// opposition against the 250 reporting stake.
        pub fn resolved(&self, oppose: u64) -> Timestamp {
            let date = self.report();
            if oppose > 0 {
                self.governance
                    .refute(&self.cover, date, &acct("bob"), Amount::from(oppose))
                    .unwrap();
            }
            self.clock.advance_days(7).unwrap();
            date
        }

        pub fn request(&self, claimant: &str, right: ClaimRightId, date: Timestamp, amount: u64) -> ClaimRequest {
            ClaimRequest {
                claimant: acct(claimant),
                right,
                cover: self.cover.clone(),
                incident_date: date,
                amount: Amount::from(amount),
            }
        }
    }

    fn denial(result: Result<Payout, ClaimError>) -> DenialReason {
        match result {
            Err(ClaimError::ClaimDenied { reason }) => reason,
            other => panic!("expected ClaimDenied, got {other:?}"),
        }
    }

    #[test]
    fn pays_confirmed_incident() {
        let f = fixture();
        let right = f.issue("kimberly", 500_000, "2026-01-10T00:00:00Z", 3);
        let date = f.resolved(0);

        let payout = f.settler.claim(&f.request("kimberly", right, date, 500_000)).unwrap();
        assert_eq!(payout.amount, Amount::new(500_000));
        assert_eq!(payout.remaining, Amount::ZERO);
        assert_eq!(payout.incident_date, date);
        assert_eq!(f.book.balance_of(&acct("kimberly")), Amount::new(500_000));
        assert_eq!(f.liquidity.balance(&f.cover), Amount::new(500_000));
        assert!(f.rights.get(&right).unwrap().is_exhausted());

        assert_eq!(
            denial(f.settler.claim(&f.request("kimberly", right, date, 1))),
            DenialReason::Exhausted
        );
    }

    #[test]
    fn partial_claims_up_to_face() {
        let f = fixture();
        let right = f.issue("kimberly", 1_000, "2026-01-10T00:00:00Z", 3);
        let date = f.resolved(0);
        f.settler.claim(&f.request("kimberly", right, date, 400)).unwrap();
        assert_eq!(
            denial(f.settler.claim(&f.request("kimberly", right, date, 601))),
            DenialReason::ExceedsBalance
        );
        let last = f.settler.claim(&f.request("kimberly", right, date, 600)).unwrap();
        assert_eq!(last.remaining, Amount::ZERO);
        assert_eq!(f.rights.get(&right).unwrap().claimed(), Amount::new(1_000));
    }

    #[test]
    fn pending_verdict_is_retryable() {
        let f = fixture();
        let right = f.issue("kimberly", 500, "2026-01-10T00:00:00Z", 3);
        let date = f.report();
        match f.settler.claim(&f.request("kimberly", right, date, 500)) {
            Err(ClaimError::ReportingStillActive { deadline }) => {
                assert_eq!(deadline, date.plus_secs(604_800).unwrap())
            }
            other => panic!("expected ReportingStillActive, got {other:?}"),
        }
    }

    #[test]
    fn invalid_right_denied_even_while_pending() {
        let f = fixture();
        let right = f.issue("kimberly", 500, "2026-01-10T00:00:00Z", 3);
        let date = f.report();
        assert_eq!(
            denial(f.settler.claim(&f.request("lewis", right, date, 500))),
            DenialReason::NotOwner
        );
        // Balance is only judged once the window is open.
        assert!(matches!(
            f.settler.claim(&f.request("kimberly", right, date, 501)),
            Err(ClaimError::ReportingStillActive { .. })
        ));
    }

    #[test]
    fn exhausted_right_reports_expiry_after_claim_deadline() {
        let f = fixture();
        let right = f.issue("kimberly", 500, "2026-01-10T00:00:00Z", 3);
        let date = f.resolved(0);
        f.settler.claim(&f.request("kimberly", right, date, 500)).unwrap();
        assert_eq!(
            denial(f.settler.claim(&f.request("kimberly", right, date, 500))),
            DenialReason::Exhausted
        );

        f.clock.advance_days(8).unwrap();
        match f.settler.claim(&f.request("kimberly", right, date, 500)) {
            Err(ClaimError::ClaimPeriodExpired { claim_deadline }) => {
                assert_eq!(claim_deadline, date.plus_secs(2 * 604_800).unwrap())
            }
            other => panic!("expected ClaimPeriodExpired, got {other:?}"),
        }
        assert_eq!(f.liquidity.balance(&f.cover), Amount::new(999_500));
    }

    #[test]
    fn rejected_verdict_denied() {
        let f = fixture();
        let right = f.issue("kimberly", 500, "2026-01-10T00:00:00Z", 3);
        let date = f.resolved(250);
        assert_eq!(
            denial(f.settler.claim(&f.request("kimberly", right, date, 500))),
            DenialReason::VerdictRejected
        );
    }

    #[test]
    fn claim_window_boundaries() {
        let f = fixture();
        let a = f.issue("kimberly", 500, "2026-01-10T00:00:00Z", 3);
        let b = f.issue("lewis", 500, "2026-01-10T00:00:00Z", 3);
        let date = f.resolved(0);
        f.clock.advance_days(7).unwrap();
        // Exactly at the claim deadline: still open.
        f.settler.claim(&f.request("kimberly", a, date, 500)).unwrap();
        f.clock.advance(std::time::Duration::from_secs(1)).unwrap();
        match f.settler.claim(&f.request("lewis", b, date, 500)) {
            Err(ClaimError::ClaimPeriodExpired { claim_deadline }) => {
                assert_eq!(claim_deadline, date.plus_secs(2 * 604_800).unwrap())
            }
            other => panic!("expected ClaimPeriodExpired, got {other:?}"),
        }
    }

    #[test]
    fn provenance_denials() {
        let f = fixture();
        let date = f.resolved(0);

        assert_eq!(
            denial(f.settler.claim(&f.request("kimberly", ClaimRightId::new(), date, 1))),
            DenialReason::UnknownRight
        );

        let late = f.issue("kimberly", 500, "2026-01-15T12:00:00Z", 3);
        assert_eq!(
            denial(f.settler.claim(&f.request("kimberly", late, date, 1))),
            DenialReason::PurchasedAfterIncident
        );

        let lapsed = f.issue("kimberly", 500, "2025-10-01T00:00:00Z", 3);
        assert_eq!(
            denial(f.settler.claim(&f.request("kimberly", lapsed, date, 1))),
            DenialReason::CoverageExpired
        );

        let ok = f.issue("kimberly", 500, "2026-01-10T00:00:00Z", 3);
        assert_eq!(
            denial(f.settler.claim(&f.request("kimberly", ok, date.plus_secs(5).unwrap(), 1))),
            DenialReason::NoSuchIncident
        );

        let mut wrong_cover = f.request("kimberly", ok, date, 1);
        wrong_cover.cover = CoverKey::new("Other Cover").unwrap();
        assert_eq!(denial(f.settler.claim(&wrong_cover)), DenialReason::CoverMismatch);
    }

    #[test]
    fn unknown_cover() {
        let f = fixture();
        let other = CoverKey::new("Unregistered").unwrap();
        let right = f
            .rights
            .issue(IssueRequest {
                owner: acct("kimberly"),
                cover: other.clone(),
                face: Amount::new(10),
                purchased_at: at("2026-01-10T00:00:00Z"),
                coverage_months: 1,
            })
            .unwrap();
        let mut request = f.request("kimberly", right, f.clock.now(), 1);
        request.cover = other;
        assert!(matches!(f.settler.claim(&request), Err(ClaimError::UnknownCover(_))));
    }

    #[test]
    fn zero_amount() {
        let f = fixture();
        let right = f.issue("kimberly", 500, "2026-01-10T00:00:00Z", 3);
        let date = f.resolved(0);
        assert!(matches!(
            f.settler.claim(&f.request("kimberly", right, date, 0)),
            Err(ClaimError::InvalidAmount(_))
        ));
    }

    #[test]
    fn insufficient_liquidity_applies_nothing() {
        let f = fixture();
        let right = f.issue("kimberly", 2_000_000, "2026-01-10T00:00:00Z", 3);
        let date = f.resolved(0);
        match f.settler.claim(&f.request("kimberly", right, date, 1_500_000)) {
            Err(ClaimError::InsufficientLiquidity { available, .. }) => {
                assert_eq!(available, Amount::new(1_000_000))
            }
            other => panic!("expected InsufficientLiquidity, got {other:?}"),
        }
        assert_eq!(f.rights.get(&right).unwrap().remaining, Amount::new(2_000_000));
    }

    #[derive(Debug)]
    struct Broken;

    impl FundsTransfer for Broken {
        fn transfer(&self, _: &CoverKey, _: &AccountId, _: Amount) -> Result<(), PcovError> {
            Err(PcovError::Validation("vault frozen".to_string()))
        }
    }

    #[test]
    fn failed_transfer_applies_nothing() {
        let f = fixture_with(Some(Arc::new(Broken)));
        let right = f.issue("kimberly", 500, "2026-01-10T00:00:00Z", 3);
        let date = f.resolved(0);
        assert!(matches!(
            f.settler.claim(&f.request("kimberly", right, date, 500)),
            Err(ClaimError::TransferFailed { .. })
        ));
        assert_eq!(f.rights.get(&right).unwrap().remaining, Amount::new(500));
        assert_eq!(f.liquidity.balance(&f.cover), Amount::new(1_000_000));
    }
}

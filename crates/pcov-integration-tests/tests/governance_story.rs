//! End-to-end incident governance story on a single cover.
//!
//! A reporter raises an incident, a disputer contests it, a crowd stakes on
//! both sides, and coverage holders try to claim before, during and after
//! the claim window.

use std::sync::Arc;

use pcov_claims::{
    BookFundsTransfer, ClaimError, ClaimRequest, ClaimRightRegistry, ClaimsSettler, DenialReason,
    IssueRequest, LiquidityBook,
};
use pcov_core::{
    AccountId, Amount, BalanceBook, ClaimRightId, Clock, CoverKey, CoverTerms, EngineConfig,
    ManualClock, Timestamp,
};
use pcov_governance::{
    store_json, BookStakeCollector, CoverStatus, EvidenceRef, Governance, GovernanceError,
    MemoryEvidenceStore, StakeTotals, Verdict,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PEOPLE: &[&str] = &[
    "alice", "bob", "chris", "david", "emily", "franklin", "george", "henry", "isabel", "john",
];

struct World {
    clock: Arc<ManualClock>,
    book: Arc<BalanceBook>,
    evidence: Arc<MemoryEvidenceStore>,
    governance: Arc<Governance>,
    rights: Arc<ClaimRightRegistry>,
    settler: ClaimsSettler,
    cover: CoverKey,
    kimberly: ClaimRightId,
    lewis: ClaimRightId,
}

fn acct(name: &str) -> AccountId {
    AccountId::new(name).unwrap()
}

fn amt(n: u64) -> Amount {
    Amount::from(n)
}

fn world() -> World {
    let clock = Arc::new(ManualClock::new(Timestamp::parse("2026-01-01T00:00:00Z").unwrap()));
    let book = Arc::new(BalanceBook::new());
    for name in PEOPLE {
        book.credit(&acct(name), amt(1_000_000)).unwrap();
    }
    book.credit(&acct("vault"), amt(4_000_000)).unwrap();

    let config = EngineConfig::default();
    let evidence = Arc::new(MemoryEvidenceStore::new());
    let governance = Arc::new(
        Governance::new(
            config.clone(),
            clock.clone(),
            Arc::new(BookStakeCollector::new(Arc::clone(&book), acct("governance"))),
        )
        .with_evidence_store(evidence.clone()),
    );
    let cover = CoverKey::new("Compound Finance Cover").unwrap();
    governance
        .register_cover(CoverTerms::builder(cover.clone(), &config).build(&config).unwrap())
        .unwrap();

    let liquidity = Arc::new(LiquidityBook::new());
    liquidity.provision(&cover, amt(4_000_000)).unwrap();

    let rights = Arc::new(ClaimRightRegistry::new());
    let issue = |owner: &str, face: u64| {
        rights
            .issue(IssueRequest {
                owner: acct(owner),
                cover: cover.clone(),
                face: amt(face),
                purchased_at: clock.now(),
                coverage_months: 3,
            })
            .unwrap()
    };
    let kimberly = issue("kimberly", 500_000);
    let lewis = issue("lewis", 20_000);

    let settler = ClaimsSettler::new(
        Arc::clone(&governance),
        Arc::clone(&rights),
        liquidity,
        Arc::new(BookFundsTransfer::new(Arc::clone(&book), acct("vault"))),
    );
    clock.advance_days(1).unwrap();

    World { clock, book, evidence, governance, rights, settler, cover, kimberly, lewis }
}

impl World {
    fn evidence(&self, body: serde_json::Value) -> EvidenceRef {
        store_json(&*self.evidence, &body).unwrap()
    }

    fn claim(&self, who: &str, right: ClaimRightId, date: Timestamp, amount: u64) -> Result<pcov_claims::Payout, ClaimError> {
        self.settler.claim(&ClaimRequest {
            claimant: acct(who),
            right,
            cover: self.cover.clone(),
            incident_date: date,
            amount: amt(amount),
        })
    }

    fn attest(&self, date: Timestamp, who: &str, amounts: &[u64]) {
        for &a in amounts {
            self.governance.attest(&self.cover, date, &acct(who), amt(a)).unwrap();
        }
    }

    fn refute(&self, date: Timestamp, who: &str, amounts: &[u64]) {
        for &a in amounts {
            self.governance.refute(&self.cover, date, &acct(who), amt(a)).unwrap();
        }
    }

    /// Report, dispute and vote, leaving the reporting window open.
    fn staged_incident(&self) -> Timestamp {
        let report = self.evidence(json!({"title": "Compound oracle exploit", "tx": "0xabc"}));

        assert!(matches!(
            self.governance.report(&self.cover, &acct("alice"), report, amt(1)),
            Err(GovernanceError::InsufficientStake { .. })
        ));
        let date = self.governance.report(&self.cover, &acct("alice"), report, amt(250)).unwrap();
        assert_eq!(self.governance.status(&self.cover).unwrap(), CoverStatus::IncidentHappened);
        assert_eq!(self.governance.active_incident_date(&self.cover).unwrap(), Some(date));

        assert!(matches!(
            self.governance.report(&self.cover, &acct("bob"), report, amt(250)),
            Err(GovernanceError::ActivelyReporting { .. })
        ));

        let rebuttal = self.evidence(json!({"title": "Not an exploit, intended liquidation"}));
        assert!(matches!(
            self.governance.dispute(&self.cover, date, &acct("bob"), rebuttal, amt(1)),
            Err(GovernanceError::InsufficientStake { .. })
        ));
        self.governance.dispute(&self.cover, date, &acct("bob"), rebuttal, amt(251)).unwrap();
        assert_eq!(self.governance.status(&self.cover).unwrap(), CoverStatus::FalseReporting);
        assert!(matches!(
            self.governance.dispute(&self.cover, date, &acct("chris"), rebuttal, amt(5_000)),
            Err(GovernanceError::AlreadyDisputed { .. })
        ));
        assert_eq!(self.governance.reporter(&self.cover, date).unwrap(), acct("bob"));

        self.attest(date, "chris", &[101, 200]);
        self.refute(date, "bob", &[100, 200]);
        self.refute(date, "david", &[20_000]);
        self.attest(date, "emily", &[400]);
        self.refute(date, "franklin", &[10, 200]);
        self.attest(date, "george", &[6_000, 200]);
        self.refute(date, "henry", &[3_000]);
        self.attest(date, "isabel", &[300]);
        self.refute(date, "john", &[300, 200]);

        date
    }
}

// ---------------------------------------------------------------------------
// Story
// ---------------------------------------------------------------------------

#[test]
fn stake_totals_match_contributions() {
    let w = world();
    let date = w.staged_incident();

    assert_eq!(
        w.governance.stakes(&w.cover, date).unwrap(),
        StakeTotals { support: amt(7_451), oppose: amt(24_261) }
    );
    assert_eq!(
        w.governance.stakes_of(&w.cover, date, &acct("alice")).unwrap(),
        StakeTotals { support: amt(250), oppose: Amount::ZERO }
    );
    assert_eq!(
        w.governance.stakes_of(&w.cover, date, &acct("bob")).unwrap(),
        StakeTotals { support: Amount::ZERO, oppose: amt(551) }
    );
    assert_eq!(
        w.governance.stakes_of(&w.cover, date, &acct("chris")).unwrap().support,
        amt(301)
    );
    assert_eq!(
        w.governance.stakes_of(&w.cover, date, &acct("george")).unwrap().support,
        amt(6_200)
    );
    assert_eq!(
        w.governance.stakes_of(&w.cover, date, &acct("kimberly")).unwrap(),
        StakeTotals::default()
    );

    // Every staked token sits in governance custody.
    assert_eq!(w.book.balance_of(&acct("governance")), amt(7_451 + 24_261));
    assert_eq!(w.book.balance_of(&acct("david")), amt(980_000));
}

#[test]
fn claim_before_any_incident_is_denied() {
    let w = world();
    let err = w.claim("kimberly", w.kimberly, w.clock.now(), 500_000).unwrap_err();
    assert!(matches!(err, ClaimError::ClaimDenied { reason: DenialReason::NoSuchIncident }));
}

#[test]
fn opposed_incident_is_rejected() {
    let w = world();
    let date = w.staged_incident();

    let err = w.claim("kimberly", w.kimberly, date, 500_000).unwrap_err();
    assert!(matches!(err, ClaimError::ReportingStillActive { .. }));
    assert!(err.is_retryable());

    w.clock.advance_days(7).unwrap();
    assert_eq!(w.governance.verdict(&w.cover, date).unwrap(), Verdict::Rejected);
    assert_eq!(w.governance.status(&w.cover).unwrap(), CoverStatus::FalseReporting);

    let err = w.claim("kimberly", w.kimberly, date, 500_000).unwrap_err();
    assert!(matches!(err, ClaimError::ClaimDenied { reason: DenialReason::VerdictRejected }));
    assert_eq!(w.rights.get(&w.kimberly).unwrap().remaining, amt(500_000));
}

#[test]
fn supported_incident_pays_out_once_within_window() {
    let w = world();
    let date = w.staged_incident();
    w.attest(date, "george", &[100_000]);
    assert_eq!(w.governance.stakes(&w.cover, date).unwrap().support, amt(107_451));
    // A dispute flips status but the majority decides.
    assert_eq!(w.governance.status(&w.cover).unwrap(), CoverStatus::FalseReporting);

    w.clock.advance_days(7).unwrap();
    assert_eq!(w.governance.verdict(&w.cover, date).unwrap(), Verdict::Confirmed);
    assert_eq!(w.governance.status(&w.cover).unwrap(), CoverStatus::IncidentHappened);
    assert!(matches!(
        w.governance.attest(&w.cover, date, &acct("emily"), amt(1)),
        Err(GovernanceError::ReportingClosed { .. })
    ));

    let payout = w.claim("kimberly", w.kimberly, date, 500_000).unwrap();
    assert_eq!(payout.amount, amt(500_000));
    assert_eq!(w.book.balance_of(&acct("kimberly")), amt(500_000));
    assert!(w.rights.get(&w.kimberly).unwrap().is_exhausted());

    let err = w.claim("kimberly", w.kimberly, date, 500_000).unwrap_err();
    assert!(matches!(err, ClaimError::ClaimDenied { reason: DenialReason::Exhausted }));

    w.clock.advance_days(7).unwrap();
    w.clock.advance(std::time::Duration::from_secs(1)).unwrap();
    let err = w.claim("lewis", w.lewis, date, 20_000).unwrap_err();
    assert!(matches!(err, ClaimError::ClaimPeriodExpired { .. }));
    assert_eq!(w.book.balance_of(&acct("lewis")), Amount::ZERO);
    // Past the window even an exhausted right reports the expiry.
    let err = w.claim("kimberly", w.kimberly, date, 500_000).unwrap_err();
    assert!(matches!(err, ClaimError::ClaimPeriodExpired { .. }));

    // Past the claim window the cover is back to normal and can be reported again.
    assert_eq!(w.governance.status(&w.cover).unwrap(), CoverStatus::Normal);
    let again = w.evidence(json!({"title": "second exploit"}));
    let next = w.governance.report(&w.cover, &acct("alice"), again, amt(250)).unwrap();
    assert!(next > date);
    assert_eq!(w.governance.status(&w.cover).unwrap(), CoverStatus::IncidentHappened);
}

#[test]
fn history_records_report_and_dispute() {
    let w = world();
    let date = w.staged_incident();
    let history = w.governance.history(&w.cover, date).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].actor, acct("alice"));
    assert_eq!(history[0].from, CoverStatus::Normal);
    assert_eq!(history[0].stake, amt(250));
    assert_eq!(history[1].actor, acct("bob"));
    assert_eq!(history[1].to, CoverStatus::FalseReporting);
    assert_eq!(history[1].stake, amt(251));

    let role = w.governance.reporter_role(&w.cover, date).unwrap();
    assert_eq!(role.original(), &acct("alice"));
    assert_eq!(role.disputer(), Some(&acct("bob")));

    let epoch = w.governance.epoch(&w.cover, date).unwrap();
    let json = serde_json::to_value(&epoch).unwrap();
    assert_eq!(json["role"]["kind"], "superseded");
    assert_eq!(json["reporter_stake"], "250");
}

#[test]
fn compaction_after_claim_window() {
    let w = world();
    let date = w.staged_incident();
    w.clock.advance_days(14).unwrap();
    assert_eq!(w.governance.compact_inert(), 0);
    w.clock.advance(std::time::Duration::from_secs(1)).unwrap();
    assert_eq!(w.governance.compact_inert(), 1);
    assert_eq!(
        w.governance.stakes(&w.cover, date).unwrap(),
        StakeTotals { support: amt(7_451), oppose: amt(24_261) }
    );
    assert!(matches!(
        w.governance.stakes_of(&w.cover, date, &acct("bob")),
        Err(GovernanceError::EpochArchived { .. })
    ));
}

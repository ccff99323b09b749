//! # pcov-governance — Incident Governance
//!
//! Decides, by stake-weighted vote, whether an incident on a cover really
//! happened:
//!
//! - **Ledger** (`ledger.rs`): append-only (support, oppose) stake buckets
//!   per incident epoch and account.
//!
//! - **Epochs** (`epoch.rs`): incident records, reporter roles, public
//!   cover status and the transition audit trail.
//!
//! - **Machine** (`machine.rs`): the [`Governance`] engine. Reporting,
//!   disputing, attesting and refuting, plus every status and stake query.
//!
//! - **Verdict** (`verdict.rs`): the pure majority rule applied once an
//!   epoch's reporting window closes.
//!
//! - **Seams** (`evidence.rs`, `stake.rs`): evidence storage and stake
//!   custody, supplied by the embedder.
//!
//! ## Crate Policy
//!
//! - Depends on `pcov-core` only.
//! - Time is read exclusively through the injected `Clock`.

pub mod epoch;
pub mod error;
pub mod evidence;
pub mod ledger;
pub mod machine;
pub mod stake;
pub mod verdict;

pub use epoch::{
    CoverStatus, DisputeFiling, IncidentEpoch, IncidentTransition, ReporterRole, TransitionKind,
};
pub use error::GovernanceError;
pub use evidence::{store_json, EvidenceError, EvidenceRef, EvidenceStore, MemoryEvidenceStore};
pub use ledger::{Bucket, EpochKey, PreparedDeposit, StakeLedger, StakeTotals};
pub use machine::{Governance, IncidentSnapshot};
pub use stake::{BookStakeCollector, StakeCollector};
pub use verdict::{resolve, Verdict};

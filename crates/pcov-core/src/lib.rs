//! # pcov-core — Foundational Types for the Parametric Cover Stack
//!
//! Every other crate in the workspace depends on `pcov-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `CoverKey`, `AccountId`,
//!    `ClaimRightId`, `Amount` — no bare strings or integers cross a crate
//!    boundary where an identifier or a balance is meant.
//!
//! 2. **One clock.** All window arithmetic reads time through the [`Clock`]
//!    trait. Production uses [`SystemClock`]; tests advance a [`ManualClock`]
//!    so window boundaries are deterministic.
//!
//! 3. **`CanonicalBytes` newtype.** Evidence references are digests of
//!    canonical bytes, never of ad-hoc serializations.
//!
//! 4. **UTC-only timestamps** truncated to seconds.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `pcov-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod balances;
pub mod canonical;
pub mod config;
pub mod cover;
pub mod digest;
pub mod error;
pub mod identity;
pub mod telemetry;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use amount::Amount;
pub use balances::BalanceBook;
pub use canonical::CanonicalBytes;
pub use config::{ClaimWindowPolicy, EngineConfig, LoggingConfig};
pub use cover::{CoverTerms, CoverTermsBuilder};
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, PcovError};
pub use identity::{AccountId, ClaimRightId, CoverKey};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};

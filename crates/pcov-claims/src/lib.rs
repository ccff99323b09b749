//! # pcov-claims — Claims Settlement
//!
//! Pays coverage holders once governance has confirmed an incident:
//!
//! - **Rights** (`right.rs`): claim rights minted by the coverage issuer.
//! - **Liquidity** (`liquidity.rs`): per-cover funds available for payouts.
//! - **Transfer** (`transfer.rs`): the seam that actually moves funds.
//! - **Settler** (`settler.rs`): the eligibility checks and the payout.
//!
//! ## Crate Policy
//!
//! - Reads governance state only through `Governance::snapshot`; never
//!   mutates it.
//! - The settler is the only component that moves coverage funds.

pub mod error;
pub mod liquidity;
pub mod right;
pub mod settler;
pub mod transfer;

pub use error::{ClaimError, DenialReason};
pub use liquidity::LiquidityBook;
pub use right::{ClaimRight, ClaimRightRegistry, IssueRequest};
pub use settler::{ClaimRequest, ClaimsSettler, Payout};
pub use transfer::{BookFundsTransfer, FundsTransfer};

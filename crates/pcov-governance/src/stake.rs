//! # Stake Collection Seam
//!
//! Staking moves tokens from the staker into governance custody before the
//! ledger records anything. The state machine calls the collector once all
//! validation has passed and only commits the ledger entry if collection
//! succeeds.

use std::sync::Arc;

use pcov_core::{AccountId, Amount, BalanceBook, CoverKey, PcovError};

/// Takes custody of a stake.
pub trait StakeCollector: Send + Sync + std::fmt::Debug {
    /// Move `amount` out of `account` into governance custody for `cover`.
    fn collect(&self, cover: &CoverKey, account: &AccountId, amount: Amount) -> Result<(), PcovError>;
}

/// Collects stakes into a single escrow account of a [`BalanceBook`].
#[derive(Debug, Clone)]
pub struct BookStakeCollector {
    book: Arc<BalanceBook>,
    escrow: AccountId,
}

impl BookStakeCollector {
    /// Collector crediting `escrow`.
    pub fn new(book: Arc<BalanceBook>, escrow: AccountId) -> Self {
        Self { book, escrow }
    }

    /// The escrow account.
    pub fn escrow(&self) -> &AccountId {
        &self.escrow
    }
}

impl StakeCollector for BookStakeCollector {
    fn collect(&self, _cover: &CoverKey, account: &AccountId, amount: Amount) -> Result<(), PcovError> {
        self.book.transfer(account, &self.escrow, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_stake_into_escrow() {
        let book = Arc::new(BalanceBook::new());
        let alice = AccountId::new("alice").unwrap();
        let escrow = AccountId::new("governance").unwrap();
        book.credit(&alice, Amount::new(10_000)).unwrap();

        let collector = BookStakeCollector::new(Arc::clone(&book), escrow.clone());
        let cover = CoverKey::new("Compound Finance Cover").unwrap();
        collector.collect(&cover, &alice, Amount::new(250)).unwrap();

        assert_eq!(book.balance_of(&alice), Amount::new(9_750));
        assert_eq!(book.balance_of(collector.escrow()), Amount::new(250));
    }

    #[test]
    fn unfunded_staker_fails() {
        let book = Arc::new(BalanceBook::new());
        let collector = BookStakeCollector::new(book, AccountId::new("governance").unwrap());
        let cover = CoverKey::new("Compound Finance Cover").unwrap();
        assert!(collector
            .collect(&cover, &AccountId::new("nobody").unwrap(), Amount::new(1))
            .is_err());
    }
}

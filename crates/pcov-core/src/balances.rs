//! # In-Memory Token Balances
//!
//! A thread-safe balance sheet used where no external token backend is
//! wired in. The governance and claims crates adapt it to their money
//! seams (stake collection, claim payout).

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::amount::Amount;
use crate::error::PcovError;
use crate::identity::AccountId;

/// Account balances behind a single `parking_lot::RwLock`.
#[derive(Debug, Default)]
pub struct BalanceBook {
    balances: RwLock<HashMap<AccountId, Amount>>,
}

impl BalanceBook {
    /// An empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance of `account` (zero if unknown).
    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances
            .read()
            .get(account)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Mint `amount` into `account`.
    pub fn credit(&self, account: &AccountId, amount: Amount) -> Result<Amount, PcovError> {
        let mut guard = self.balances.write();
        let entry = guard.entry(account.clone()).or_insert(Amount::ZERO);
        *entry = entry.try_add(amount)?;
        Ok(*entry)
    }

    /// Move `amount` from `from` to `to` atomically.
    ///
    /// # Errors
    ///
    /// [`PcovError::InsufficientBalance`] if `from` cannot cover the debit;
    /// [`PcovError::Overflow`] if the credit would overflow. Neither balance
    /// changes on error.
    pub fn transfer(&self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<(), PcovError> {
        let mut guard = self.balances.write();
        let available = guard.get(from).copied().unwrap_or(Amount::ZERO);
        let debited = available
            .checked_sub(amount)
            .ok_or_else(|| PcovError::InsufficientBalance {
                account: from.to_string(),
                available: available.to_string(),
                requested: amount.to_string(),
            })?;
        if from == to {
            return Ok(());
        }
        let credited = guard
            .get(to)
            .copied()
            .unwrap_or(Amount::ZERO)
            .try_add(amount)?;
        guard.insert(from.clone(), debited);
        guard.insert(to.clone(), credited);
        Ok(())
    }
}

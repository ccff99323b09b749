//! Funds transfer seam: moves a payout from the cover's vault to the claimant.

use std::sync::Arc;

use pcov_core::{AccountId, Amount, BalanceBook, CoverKey, PcovError};

/// Pays claimants.
pub trait FundsTransfer: Send + Sync + std::fmt::Debug {
    /// Send `amount` of `cover`'s funds to `recipient`.
    fn transfer(&self, cover: &CoverKey, recipient: &AccountId, amount: Amount) -> Result<(), PcovError>;
}

/// Pays out of a single vault account of a [`BalanceBook`].
#[derive(Debug, Clone)]
pub struct BookFundsTransfer {
    book: Arc<BalanceBook>,
    vault: AccountId,
}

impl BookFundsTransfer {
    /// Transfer paying out of `vault`.
    pub fn new(book: Arc<BalanceBook>, vault: AccountId) -> Self {
        Self { book, vault }
    }
}

impl FundsTransfer for BookFundsTransfer {
    fn transfer(&self, _cover: &CoverKey, recipient: &AccountId, amount: Amount) -> Result<(), PcovError> {
        self.book.transfer(&self.vault, recipient, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pays_from_vault() {
        let book = Arc::new(BalanceBook::new());
        let vault = AccountId::new("vault").unwrap();
        book.credit(&vault, Amount::new(1_000)).unwrap();
        let transfer = BookFundsTransfer::new(Arc::clone(&book), vault.clone());
        let kim = AccountId::new("kimberly").unwrap();
        transfer
            .transfer(&CoverKey::new("c").unwrap(), &kim, Amount::new(400))
            .unwrap();
        assert_eq!(book.balance_of(&kim), Amount::new(400));
        assert_eq!(book.balance_of(&vault), Amount::new(600));
        assert!(transfer
            .transfer(&CoverKey::new("c").unwrap(), &kim, Amount::new(601))
            .is_err());
    }
}

//! # Cover Liquidity
//!
//! Funds available to pay claims on each cover. Provisioned by the
//! liquidity provider and only ever debited by the settler, under the
//! cover's pool lock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use pcov_core::{Amount, CoverKey};

use crate::error::ClaimError;

/// Per-cover liquidity pools.
#[derive(Debug, Default)]
pub struct LiquidityBook {
    pools: RwLock<HashMap<CoverKey, Arc<Mutex<Amount>>>>,
}

impl LiquidityBook {
    /// No pools.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add liquidity to a cover. Returns the new balance.
    pub fn provision(&self, cover: &CoverKey, amount: Amount) -> Result<Amount, ClaimError> {
        if amount.is_zero() {
            return Err(ClaimError::InvalidAmount(format!(
                "liquidity for {cover} must be positive"
            )));
        }
        let pool = self.pool_or_create(cover);
        let mut balance = pool.lock();
        let total = balance.try_add(amount)?;
        *balance = total;
        tracing::info!(cover = %cover, %amount, balance = %total, "liquidity provisioned");
        Ok(total)
    }

    /// Current liquidity of a cover; zero when never provisioned.
    pub fn balance(&self, cover: &CoverKey) -> Amount {
        self.pools.read().get(cover).map(|p| *p.lock()).unwrap_or_default()
    }

    pub(crate) fn pool(&self, cover: &CoverKey) -> Option<Arc<Mutex<Amount>>> {
        self.pools.read().get(cover).cloned()
    }

    fn pool_or_create(&self, cover: &CoverKey) -> Arc<Mutex<Amount>> {
        if let Some(pool) = self.pool(cover) {
            return pool;
        }
        Arc::clone(
            self.pools
                .write()
                .entry(cover.clone())
                .or_insert_with(|| Arc::new(Mutex::new(Amount::ZERO))),
        )
    }
}

//! # Cover Terms
//!
//! The immutable governance parameters of a cover, supplied once by the
//! policy provider: stake thresholds and the two chained windows.
//!
//! ```text
//! incident date ──reporting window──▶ resolution deadline ──claim window──▶ claim deadline
//! ```

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::config::EngineConfig;
use crate::error::PcovError;
use crate::identity::CoverKey;

/// Governance parameters of a cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverTerms {
    /// Stable cover key.
    pub key: CoverKey,
    /// Minimum stake accepted from the first reporter.
    pub min_report_stake: Amount,
    /// Minimum stake accepted from the disputer.
    pub min_dispute_stake: Amount,
    /// Length of the reporting (voting) window in seconds.
    pub reporting_window_secs: u64,
    /// Length of the claim window in seconds, starting at the resolution deadline.
    pub claim_window_secs: u64,
}

impl CoverTerms {
    /// Start building terms for `key` with the engine defaults.
    pub fn builder(key: CoverKey, config: &EngineConfig) -> CoverTermsBuilder {
        CoverTermsBuilder {
            terms: CoverTerms {
                key,
                min_report_stake: config.default_min_report_stake,
                min_dispute_stake: config.default_min_dispute_stake,
                reporting_window_secs: config.default_reporting_window_secs,
                claim_window_secs: config.default_reporting_window_secs,
            },
        }
    }

    /// Structural validation independent of engine policy.
    pub fn validate(&self) -> Result<(), PcovError> {
        if self.min_report_stake.is_zero() || self.min_dispute_stake.is_zero() {
            return Err(PcovError::Validation(format!(
                "cover {}: minimum stakes must be positive",
                self.key
            )));
        }
        if self.reporting_window_secs == 0 || self.claim_window_secs == 0 {
            return Err(PcovError::Validation(format!(
                "cover {}: reporting and claim windows must be positive",
                self.key
            )));
        }
        Ok(())
    }
}

/// Builder returned by [`CoverTerms::builder`].
#[derive(Debug, Clone)]
pub struct CoverTermsBuilder {
    terms: CoverTerms,
}

impl CoverTermsBuilder {
    /// Override the minimum reporting stake.
    pub fn min_report_stake(mut self, stake: Amount) -> Self {
        self.terms.min_report_stake = stake;
        self
    }

    /// Override the minimum dispute stake.
    pub fn min_dispute_stake(mut self, stake: Amount) -> Self {
        self.terms.min_dispute_stake = stake;
        self
    }

    /// Override the reporting window. The claim window follows it unless set
    /// explicitly afterwards.
    pub fn reporting_window_secs(mut self, secs: u64) -> Self {
        self.terms.reporting_window_secs = secs;
        self.terms.claim_window_secs = secs;
        self
    }

    /// Override the claim window.
    pub fn claim_window_secs(mut self, secs: u64) -> Self {
        self.terms.claim_window_secs = secs;
        self
    }

    /// Validate against `config` and produce the terms.
    pub fn build(self, config: &EngineConfig) -> Result<CoverTerms, PcovError> {
        config.validate_terms(&self.terms)?;
        Ok(self.terms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClaimWindowPolicy;

    fn key() -> CoverKey {
        CoverKey::new("Compound Finance Cover").unwrap()
    }

    #[test]
    fn builder_applies_defaults() {
        let config = EngineConfig::default();
        let terms = CoverTerms::builder(key(), &config).build(&config).unwrap();
        assert_eq!(terms.reporting_window_secs, 7 * 86_400);
        assert_eq!(terms.claim_window_secs, terms.reporting_window_secs);
    }

    #[test]
    fn claim_window_follows_reporting_window() {
        let config = EngineConfig::default();
        let terms = CoverTerms::builder(key(), &config)
            .reporting_window_secs(3_600)
            .build(&config)
            .unwrap();
        assert_eq!(terms.claim_window_secs, 3_600);
    }

    #[test]
    fn differing_windows_need_independent_policy() {
        let config = EngineConfig::default();
        let builder = CoverTerms::builder(key(), &config).claim_window_secs(60);
        assert!(builder.clone().build(&config).is_err());

        let independent = EngineConfig {
            claim_window_policy: ClaimWindowPolicy::Independent,
            ..EngineConfig::default()
        };
        assert!(builder.build(&independent).is_ok());
    }

    #[test]
    fn zero_stake_rejected() {
        let config = EngineConfig::default();
        let result = CoverTerms::builder(key(), &config)
            .min_report_stake(Amount::ZERO)
            .build(&config);
        assert!(result.is_err());
    }
}

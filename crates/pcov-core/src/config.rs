//! # Engine Configuration
//!
//! Deployment-level defaults and policy switches, loaded from YAML.
//!
//! ```yaml
//! default_reporting_window_secs: 604800
//! claim_window_policy: match_reporting
//! default_min_report_stake: "250"
//! default_min_dispute_stake: "250"
//! logging:
//!   filter: "info,pcov_governance=debug"
//!   json: true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::cover::CoverTerms;
use crate::error::PcovError;

/// Whether a cover's claim window may differ from its reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimWindowPolicy {
    /// Claim window must equal the reporting window.
    #[default]
    MatchReporting,
    /// Claim window is configured per cover.
    Independent,
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

/// Engine-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Reporting window applied to covers that do not set their own.
    #[serde(default = "default_reporting_window")]
    pub default_reporting_window_secs: u64,
    /// Claim window policy.
    #[serde(default)]
    pub claim_window_policy: ClaimWindowPolicy,
    /// Minimum reporting stake applied to covers that do not set their own.
    #[serde(default = "default_min_stake")]
    pub default_min_report_stake: Amount,
    /// Minimum dispute stake applied to covers that do not set their own.
    #[serde(default = "default_min_stake")]
    pub default_min_dispute_stake: Amount,
    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_reporting_window_secs: default_reporting_window(),
            claim_window_policy: ClaimWindowPolicy::default(),
            default_min_report_stake: default_min_stake(),
            default_min_dispute_stake: default_min_stake(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a YAML document. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PcovError> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| PcovError::Config(format!("invalid engine config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PcovError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&raw)
    }

    /// Reject configurations that would produce unusable covers.
    pub fn validate(&self) -> Result<(), PcovError> {
        if self.default_reporting_window_secs == 0 {
            return Err(PcovError::Config(
                "default_reporting_window_secs must be positive".to_string(),
            ));
        }
        if self.default_min_report_stake.is_zero() || self.default_min_dispute_stake.is_zero() {
            return Err(PcovError::Config(
                "default minimum stakes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Check cover terms against this configuration's policy.
    pub fn validate_terms(&self, terms: &CoverTerms) -> Result<(), PcovError> {
        terms.validate()?;
        if self.claim_window_policy == ClaimWindowPolicy::MatchReporting
            && terms.claim_window_secs != terms.reporting_window_secs
        {
            return Err(PcovError::Validation(format!(
                "cover {}: claim window {}s must equal reporting window {}s",
                terms.key, terms.claim_window_secs, terms.reporting_window_secs
            )));
        }
        Ok(())
    }
}

fn default_reporting_window() -> u64 {
    7 * 86_400
}

fn default_min_stake() -> Amount {
    Amount::new(250)
}

fn default_filter() -> String {
    "info".to_string()
}

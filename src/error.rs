//! Error taxonomy for the mining core

use thiserror::Error;

/// Errors surfaced by the encoder, miner and rule generator.
///
/// None of these are retried internally: mining is deterministic, so the same
/// inputs always produce the same error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MiningError {
    /// The (filtered) transaction log contained no records.
    #[error("no transactions match the selected criteria")]
    EmptyDataset,

    /// A tuning parameter was outside its valid range.
    #[error("invalid {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    /// No ranked rule has the requested antecedent.
    #[error("no recommendation available for '{antecedent}'")]
    RuleNotFound { antecedent: String },
}

impl MiningError {
    pub(crate) fn invalid(name: &'static str, value: impl ToString, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}

//! End-to-end query: encode, mine, derive rules

use crate::encoder::{encode, FilterCriteria, IncidenceMatrix, TransactionRecord};
use crate::error::MiningError;
use crate::miner::{mine_frequent_itemsets, validate_min_support, FrequentItemsets};
use crate::rules::{generate_rules, validate_min_lift, RankKey, RuleSet};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Tuning knobs for one mining query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningParams {
    pub min_support: f64,
    pub min_lift: f64,
    pub max_len: Option<usize>,
    pub rank_key: RankKey,
    pub top_n: Option<usize>,
}

impl Default for MiningParams {
    fn default() -> Self {
        Self {
            min_support: 0.01,
            min_lift: 0.0,
            max_len: None,
            rank_key: RankKey::ConfSupp,
            top_n: Some(10),
        }
    }
}

impl MiningParams {
    /// Reject out-of-range parameters before any work is done
    pub fn validate(&self) -> Result<(), MiningError> {
        validate_min_support(self.min_support)?;
        validate_min_lift(self.min_lift)?;
        if self.max_len == Some(0) {
            return Err(MiningError::invalid("max_len", 0, "must be at least 1"));
        }
        Ok(())
    }
}

/// Everything produced by one query
#[derive(Debug, Clone)]
pub struct Analysis {
    pub matrix: IncidenceMatrix,
    pub itemsets: FrequentItemsets,
    pub rules: RuleSet,
}

/// Run encode -> mine -> generate on a transaction log
pub fn analyze(
    records: &[TransactionRecord],
    criteria: &FilterCriteria,
    params: &MiningParams,
) -> Result<Analysis, MiningError> {
    params.validate()?;

    let matrix = encode(records, criteria)?;
    let itemsets = mine_frequent_itemsets(&matrix, params.min_support, params.max_len)?;
    let rules = generate_rules(&itemsets, params.min_lift, params.rank_key, params.top_n)?;

    info!(
        transactions = matrix.n_transactions(),
        items = matrix.n_items(),
        itemsets = itemsets.len(),
        rules = rules.len(),
        "analysis complete"
    );

    Ok(Analysis {
        matrix,
        itemsets,
        rules,
    })
}

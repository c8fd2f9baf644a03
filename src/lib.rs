//! basketforge: market basket analysis with Apriori
//!
//! Encodes sales records into a transaction x item matrix, mines frequent
//! itemsets level by level and derives ranked, deduplicated association rules.

pub mod cli;
pub mod data;
pub mod encoder;
pub mod error;
pub mod miner;
pub mod pipeline;
pub mod report;
pub mod rules;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{load_transactions, CsvColumns};
pub use encoder::{encode, FilterCriteria, IncidenceMatrix, TransactionRecord};
pub use error::MiningError;
pub use miner::{mine_frequent_itemsets, FrequentItemset, FrequentItemsets, Itemset};
pub use pipeline::{analyze, Analysis, MiningParams};
pub use rules::{generate_rules, AssociationRule, RankKey, RuleSet};

/// Result type for ingestion and CLI glue
pub type Result<T> = anyhow::Result<T>;

//! Association rule derivation, reverse-pair deduplication and ranking

use crate::error::MiningError;
use crate::miner::{FrequentItemset, FrequentItemsets, Itemset};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

/// Directional rule "customers who buy `antecedents` also buy `consequents`"
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationRule {
    pub antecedents: Itemset,
    pub consequents: Itemset,
    /// Support of antecedents and consequents together
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
    /// `confidence * support`
    pub conf_supp: f64,
    pub antecedent_support: f64,
    pub consequent_support: f64,
    pub leverage: f64,
    /// Infinite when confidence is 1; serialized as `null` then
    pub conviction: f64,
}

impl AssociationRule {
    /// Score a rule from the supports of its two sides and of their union
    pub fn new(
        antecedents: Itemset,
        consequents: Itemset,
        support: f64,
        antecedent_support: f64,
        consequent_support: f64,
    ) -> Self {
        let confidence = support / antecedent_support;
        let lift = confidence / consequent_support;
        let conviction = if confidence >= 1.0 {
            f64::INFINITY
        } else {
            (1.0 - consequent_support) / (1.0 - confidence)
        };

        Self {
            antecedents,
            consequents,
            support,
            confidence,
            lift,
            conf_supp: confidence * support,
            antecedent_support,
            consequent_support,
            leverage: support - antecedent_support * consequent_support,
            conviction,
        }
    }
}

impl fmt::Display for AssociationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.antecedents, self.consequents)
    }
}

/// Primary key used to rank rules, descending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankKey {
    Confidence,
    #[default]
    ConfSupp,
}

impl RankKey {
    pub fn score(self, rule: &AssociationRule) -> f64 {
        match self {
            RankKey::Confidence => rule.confidence,
            RankKey::ConfSupp => rule.conf_supp,
        }
    }
}

impl fmt::Display for RankKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankKey::Confidence => f.write_str("confidence"),
            RankKey::ConfSupp => f.write_str("conf_supp"),
        }
    }
}

/// Ranked, deduplicated rules from one query
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    rules: Vec<AssociationRule>,
    rank_key: RankKey,
}

impl RuleSet {
    pub fn rules(&self) -> &[AssociationRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AssociationRule> {
        self.rules.iter()
    }

    pub fn rank_key(&self) -> RankKey {
        self.rank_key
    }

    /// Highest-ranked rule whose antecedent is exactly `antecedent`
    pub fn recommend(&self, antecedent: &Itemset) -> Result<&AssociationRule, MiningError> {
        self.rules
            .iter()
            .find(|rule| &rule.antecedents == antecedent)
            .ok_or_else(|| MiningError::RuleNotFound {
                antecedent: antecedent.to_string(),
            })
    }

    /// Shorthand for [`RuleSet::recommend`] with a single-item antecedent
    pub fn recommend_item(&self, item: &str) -> Result<&AssociationRule, MiningError> {
        self.recommend(&Itemset::single(item))
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a AssociationRule;
    type IntoIter = std::slice::Iter<'a, AssociationRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// Check that a lift threshold is a non-negative number
pub fn validate_min_lift(min_lift: f64) -> Result<(), MiningError> {
    if !(min_lift >= 0.0) {
        return Err(MiningError::invalid(
            "min_lift",
            min_lift,
            "must be a non-negative number",
        ));
    }
    Ok(())
}

/// Derive ranked association rules from frequent itemsets
///
/// Every frequent itemset of two or more items is split into each
/// antecedent/consequent pair, largest antecedents first and in item order
/// within a size. Rules below `min_lift` are dropped, then a rule is dropped
/// when its reverse was already kept. The survivors are stably sorted by
/// `rank_key` (descending) and cut to `top_n`.
///
/// # Arguments
/// * `itemsets` - Output of [`crate::miner::mine_frequent_itemsets`]
/// * `min_lift` - Lift threshold, `0.0` keeps everything
/// * `rank_key` - Ranking metric
/// * `top_n` - Optional cap on the number of rules returned
pub fn generate_rules(
    itemsets: &FrequentItemsets,
    min_lift: f64,
    rank_key: RankKey,
    top_n: Option<usize>,
) -> Result<RuleSet, MiningError> {
    validate_min_lift(min_lift)?;

    let mut rules = Vec::new();
    let mut kept: HashSet<(Itemset, Itemset)> = HashSet::new();
    let mut below_lift = 0usize;
    let mut reversed = 0usize;

    for frequent in itemsets.iter().filter(|entry| entry.itemset.len() >= 2) {
        for rule in split_itemset(itemsets, frequent) {
            if rule.lift < min_lift {
                below_lift += 1;
                continue;
            }
            let reverse = (rule.consequents.clone(), rule.antecedents.clone());
            if kept.contains(&reverse) {
                reversed += 1;
                continue;
            }
            kept.insert((rule.antecedents.clone(), rule.consequents.clone()));
            rules.push(rule);
        }
    }

    let generated = rules.len();
    rank_rules(&mut rules, rank_key);
    if let Some(n) = top_n {
        rules.truncate(n);
    }

    info!(
        itemsets = itemsets.len(),
        generated,
        below_lift,
        reversed,
        returned = rules.len(),
        rank_key = %rank_key,
        "association rules generated"
    );

    Ok(RuleSet { rules, rank_key })
}

/// Stable descending sort; equal scores keep enumeration order
fn rank_rules(rules: &mut [AssociationRule], rank_key: RankKey) {
    rules.sort_by(|a, b| rank_key.score(b).total_cmp(&rank_key.score(a)));
}

/// All directional splits of one frequent itemset
fn split_itemset(itemsets: &FrequentItemsets, frequent: &FrequentItemset) -> Vec<AssociationRule> {
    let items: Vec<&str> = frequent.itemset.iter().collect();
    let mut rules = Vec::new();

    for size in (1..items.len()).rev() {
        for picked in combinations(items.len(), size) {
            let antecedents: Itemset = picked.iter().map(|&i| items[i]).collect();
            let consequents: Itemset = items
                .iter()
                .enumerate()
                .filter(|(i, _)| !picked.contains(i))
                .map(|(_, &item)| item)
                .collect();

            // subsets of a frequent itemset are always frequent
            let (Some(antecedent_support), Some(consequent_support)) =
                (itemsets.support(&antecedents), itemsets.support(&consequents))
            else {
                debug!(itemset = %frequent.itemset, "subset support missing, skipping split");
                continue;
            };

            rules.push(AssociationRule::new(
                antecedents,
                consequents,
                frequent.support,
                antecedent_support,
                consequent_support,
            ));
        }
    }

    rules
}

/// Index combinations of size `r` drawn from `0..n`, in lexicographic order
fn combinations(n: usize, r: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if r == 0 || r > n {
        return out;
    }

    let mut indices: Vec<usize> = (0..r).collect();
    loop {
        out.push(indices.clone());

        let mut i = r;
        while i > 0 && indices[i - 1] == n - r + i - 1 {
            i -= 1;
        }
        if i == 0 {
            break;
        }
        indices[i - 1] += 1;
        for j in i..r {
            indices[j] = indices[j - 1] + 1;
        }
    }

    out
}

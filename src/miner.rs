//! Level-wise (Apriori) frequent itemset mining

use crate::encoder::IncidenceMatrix;
use crate::error::MiningError;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::{debug, info};

/// Unordered set of distinct item names
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Itemset(BTreeSet<String>);

impl Itemset {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        items.into_iter().collect()
    }

    pub fn single(item: impl Into<String>) -> Self {
        Self::new([item])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Items in ascending order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_subset(&self, other: &Itemset) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn is_disjoint(&self, other: &Itemset) -> bool {
        self.0.is_disjoint(&other.0)
    }

    pub fn union(&self, other: &Itemset) -> Itemset {
        Itemset(self.0.union(&other.0).cloned().collect())
    }
}

impl<S: Into<String>> FromIterator<S> for Itemset {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Itemset(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Itemset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(item)?;
        }
        Ok(())
    }
}

/// An itemset that met the support threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequentItemset {
    pub itemset: Itemset,
    /// Fraction of transactions containing every item
    pub support: f64,
    /// Number of transactions containing every item
    pub count: usize,
}

/// Result of a mining run: frequent itemsets ordered by size, then by items
#[derive(Debug, Clone)]
pub struct FrequentItemsets {
    entries: Vec<FrequentItemset>,
    index: HashMap<Itemset, usize>,
    n_transactions: usize,
    min_support: f64,
}

impl FrequentItemsets {
    fn empty(n_transactions: usize, min_support: f64) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            n_transactions,
            min_support,
        }
    }

    fn push(&mut self, matrix: &IncidenceMatrix, columns: &[usize], count: usize) {
        let itemset: Itemset = columns.iter().map(|&col| matrix.items()[col].as_str()).collect();
        let support = count as f64 / self.n_transactions as f64;
        self.index.insert(itemset.clone(), self.entries.len());
        self.entries.push(FrequentItemset {
            itemset,
            support,
            count,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrequentItemset> {
        self.entries.iter()
    }

    pub fn get(&self, itemset: &Itemset) -> Option<&FrequentItemset> {
        self.index.get(itemset).map(|&i| &self.entries[i])
    }

    pub fn support(&self, itemset: &Itemset) -> Option<f64> {
        self.get(itemset).map(|entry| entry.support)
    }

    /// Frequent itemsets with exactly `len` items
    pub fn of_len(&self, len: usize) -> impl Iterator<Item = &FrequentItemset> {
        self.entries.iter().filter(move |entry| entry.itemset.len() == len)
    }

    /// Size of the largest frequent itemset (0 when empty)
    pub fn max_len(&self) -> usize {
        self.entries.last().map_or(0, |entry| entry.itemset.len())
    }

    /// Transaction count the supports are relative to
    pub fn n_transactions(&self) -> usize {
        self.n_transactions
    }

    pub fn min_support(&self) -> f64 {
        self.min_support
    }
}

impl<'a> IntoIterator for &'a FrequentItemsets {
    type Item = &'a FrequentItemset;
    type IntoIter = std::slice::Iter<'a, FrequentItemset>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Check that a support threshold lies in `(0, 1]`
pub fn validate_min_support(min_support: f64) -> Result<(), MiningError> {
    // negated so NaN is rejected too
    if !(min_support > 0.0 && min_support <= 1.0) {
        return Err(MiningError::invalid(
            "min_support",
            min_support,
            "must be in (0, 1]",
        ));
    }
    Ok(())
}

/// Mine every itemset whose support is at least `min_support`
///
/// # Arguments
/// * `matrix` - Encoded transactions
/// * `min_support` - Support threshold in `(0, 1]`
/// * `max_len` - Optional cap on itemset size
///
/// # Returns
/// * `FrequentItemsets` ordered by itemset size, then by item names. An empty
///   result is a success, not an error.
pub fn mine_frequent_itemsets(
    matrix: &IncidenceMatrix,
    min_support: f64,
    max_len: Option<usize>,
) -> Result<FrequentItemsets, MiningError> {
    validate_min_support(min_support)?;
    if max_len == Some(0) {
        return Err(MiningError::invalid("max_len", 0, "must be at least 1"));
    }

    let n_transactions = matrix.n_transactions();
    let n_items = matrix.n_items();
    let limit = max_len.unwrap_or(n_items).min(n_items);
    let mut frequent = FrequentItemsets::empty(n_transactions, min_support);

    if n_items == 0 || n_transactions == 0 {
        return Ok(frequent);
    }

    let meets_threshold = |count: usize| count as f64 / n_transactions as f64 >= min_support;

    let mut level: Vec<Vec<usize>> = Vec::new();
    for (col, count) in matrix.item_counts().into_iter().enumerate() {
        if meets_threshold(count) {
            frequent.push(matrix, &[col], count);
            level.push(vec![col]);
        }
    }
    debug!(level = 1, candidates = n_items, frequent = level.len(), "apriori level");

    let mut k = 2;
    while !level.is_empty() && k <= limit {
        let candidates = generate_candidates(&level);
        if candidates.is_empty() {
            debug!(level = k, "no candidates survived pruning");
            break;
        }

        let n_candidates = candidates.len();
        let counts = count_candidates(matrix, &candidates);

        let mut next = Vec::new();
        for (candidate, count) in candidates.into_iter().zip(counts) {
            if meets_threshold(count) {
                frequent.push(matrix, &candidate, count);
                next.push(candidate);
            }
        }
        debug!(level = k, candidates = n_candidates, frequent = next.len(), "apriori level");

        level = next;
        k += 1;
    }

    info!(
        transactions = n_transactions,
        items = n_items,
        min_support,
        frequent = frequent.len(),
        "frequent itemsets mined"
    );

    Ok(frequent)
}

/// Join frequent (k-1)-itemsets that share their first k-2 columns, then drop
/// candidates with an infrequent (k-1)-subset.
///
/// `level` must be sorted lexicographically; the output is too.
fn generate_candidates(level: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let frequent: HashSet<&[usize]> = level.iter().map(Vec::as_slice).collect();
    let mut candidates = Vec::new();

    for (i, left) in level.iter().enumerate() {
        let prefix = &left[..left.len() - 1];
        for right in &level[i + 1..] {
            if &right[..prefix.len()] != prefix {
                break;
            }
            let mut candidate = left.clone();
            candidate.push(right[right.len() - 1]);
            if all_subsets_frequent(&candidate, &frequent) {
                candidates.push(candidate);
            }
        }
    }

    candidates
}

fn all_subsets_frequent(candidate: &[usize], frequent: &HashSet<&[usize]>) -> bool {
    // dropping either of the last two columns gives back a joined parent
    let mut subset = Vec::with_capacity(candidate.len() - 1);
    (0..candidate.len().saturating_sub(2)).all(|skip| {
        subset.clear();
        subset.extend(
            candidate
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != skip)
                .map(|(_, &col)| col),
        );
        frequent.contains(subset.as_slice())
    })
}

fn tally_row(row: ArrayView1<'_, bool>, candidates: &[Vec<usize>], counts: &mut [usize]) {
    for (candidate, count) in candidates.iter().zip(counts.iter_mut()) {
        if candidate.iter().all(|&col| row[col]) {
            *count += 1;
        }
    }
}

/// One pass over the matrix, counting the rows containing each candidate
#[cfg(not(feature = "parallel"))]
fn count_candidates(matrix: &IncidenceMatrix, candidates: &[Vec<usize>]) -> Vec<usize> {
    let mut counts = vec![0; candidates.len()];
    for row in matrix.cells().outer_iter() {
        tally_row(row, candidates, &mut counts);
    }
    counts
}

/// Rows are split across rayon workers; partial integer counts are summed
/// before any support is computed, so the result matches the serial pass.
#[cfg(feature = "parallel")]
fn count_candidates(matrix: &IncidenceMatrix, candidates: &[Vec<usize>]) -> Vec<usize> {
    use rayon::prelude::*;

    let cells = matrix.cells();
    (0..cells.nrows())
        .into_par_iter()
        .fold(
            || vec![0usize; candidates.len()],
            |mut counts, row| {
                tally_row(cells.row(row), candidates, &mut counts);
                counts
            },
        )
        .reduce(
            || vec![0usize; candidates.len()],
            |mut total, partial| {
                for (sum, count) in total.iter_mut().zip(partial) {
                    *sum += count;
                }
                total
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_matrix() -> IncidenceMatrix {
        IncidenceMatrix::from_baskets([
            ("T1", vec!["A", "B"]),
            ("T2", vec!["A", "B"]),
            ("T3", vec!["A"]),
            ("T4", vec!["B", "C"]),
        ])
        .unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn test_mine_reference_scenario() {
        let itemsets = mine_frequent_itemsets(&create_test_matrix(), 0.5, None).unwrap();

        assert_eq!(itemsets.len(), 3);
        assert_close(itemsets.support(&Itemset::single("A")).unwrap(), 0.75);
        assert_close(itemsets.support(&Itemset::single("B")).unwrap(), 0.75);
        assert_close(itemsets.support(&Itemset::new(["A", "B"])).unwrap(), 0.5);
        assert_eq!(itemsets.support(&Itemset::single("C")), None);
        assert_eq!(itemsets.n_transactions(), 4);
    }

    #[test]
    fn test_result_order_is_size_then_items() {
        let itemsets = mine_frequent_itemsets(&create_test_matrix(), 0.25, None).unwrap();
        let order: Vec<String> = itemsets.iter().map(|e| e.itemset.to_string()).collect();

        assert_eq!(order, vec!["A", "B", "C", "A, B", "B, C"]);
        assert_eq!(itemsets.max_len(), 2);
        assert_eq!(itemsets.of_len(2).count(), 2);
    }

    #[test]
    fn test_invalid_min_support() {
        let matrix = create_test_matrix();

        for bad in [0.0, -0.1, 1.5, f64::NAN] {
            let result = mine_frequent_itemsets(&matrix, bad, None);
            assert!(matches!(
                result,
                Err(MiningError::InvalidParameter { name: "min_support", .. })
            ));
        }

        let result = mine_frequent_itemsets(&matrix, 0.5, Some(0));
        assert!(matches!(
            result,
            Err(MiningError::InvalidParameter { name: "max_len", .. })
        ));
    }

    #[test]
    fn test_threshold_above_max_support_is_empty() {
        let itemsets = mine_frequent_itemsets(&create_test_matrix(), 0.99, None).unwrap();
        assert!(itemsets.is_empty());
        assert_eq!(itemsets.max_len(), 0);
    }

    #[test]
    fn test_no_items_is_empty() {
        let matrix = IncidenceMatrix::from_baskets([("T1", Vec::<&str>::new())]).unwrap();
        let itemsets = mine_frequent_itemsets(&matrix, 0.1, None).unwrap();
        assert!(itemsets.is_empty());
    }

    #[test]
    fn test_max_len_caps_levels() {
        let matrix = IncidenceMatrix::from_baskets([
            ("T1", vec!["A", "B", "C"]),
            ("T2", vec!["A", "B", "C"]),
        ])
        .unwrap();

        let all = mine_frequent_itemsets(&matrix, 1.0, None).unwrap();
        assert_eq!(all.len(), 7);
        assert_eq!(all.max_len(), 3);

        let capped = mine_frequent_itemsets(&matrix, 1.0, Some(2)).unwrap();
        assert_eq!(capped.len(), 6);
        assert_eq!(capped.max_len(), 2);
    }

    #[test]
    fn test_candidate_join_and_prune() {
        // {0,1},{0,2},{1,2},{1,3}: {0,1,2} survives, {1,2,3} lacks {2,3}
        let level = vec![vec![0, 1], vec![0, 2], vec![1, 2], vec![1, 3]];
        assert_eq!(generate_candidates(&level), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_count_candidates() {
        let matrix = create_test_matrix();
        let counts = count_candidates(&matrix, &[vec![0], vec![0, 1], vec![1, 2], vec![0, 2]]);
        assert_eq!(counts, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_itemset_display_and_set_ops() {
        let ab = Itemset::new(["B", "A"]);
        let c = Itemset::single("C");

        assert_eq!(ab.to_string(), "A, B");
        assert!(ab.is_disjoint(&c));
        assert!(Itemset::single("A").is_subset(&ab));
        assert_eq!(ab.union(&c), Itemset::new(["A", "B", "C"]));
        assert_eq!(serde_json::to_string(&ab).unwrap(), r#"["A","B"]"#);
    }
}

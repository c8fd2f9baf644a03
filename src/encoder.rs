//! Transaction log encoding into a boolean transaction x item matrix

use crate::error::MiningError;
use chrono::{Datelike, Month, NaiveDate, Weekday};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// One raw sales row: an item (with a quantity) sold as part of a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub item: String,
    pub quantity: i64,
    /// Sale date, only consulted by date-based filter criteria
    pub date: Option<NaiveDate>,
}

impl TransactionRecord {
    pub fn new(transaction_id: impl Into<String>, item: impl Into<String>, quantity: i64) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            item: item.into(),
            quantity,
            date: None,
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Row predicate applied before encoding.
///
/// Every populated field must match. Empty `months` / `weekdays` mean "any".
/// Records without a date never match criteria that constrain dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    /// Inclusive lower bound
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound
    pub date_to: Option<NaiveDate>,
    pub months: Vec<Month>,
    pub weekdays: Vec<Weekday>,
}

impl FilterCriteria {
    /// Criteria that accept every record
    pub fn any() -> Self {
        Self::default()
    }

    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    pub fn in_months(mut self, months: impl IntoIterator<Item = Month>) -> Self {
        self.months.extend(months);
        self
    }

    pub fn on_weekdays(mut self, weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        self.weekdays.extend(weekdays);
        self
    }

    /// Whether any date-based constraint is set
    pub fn constrains_dates(&self) -> bool {
        self.date_from.is_some()
            || self.date_to.is_some()
            || !self.months.is_empty()
            || !self.weekdays.is_empty()
    }

    pub fn matches(&self, record: &TransactionRecord) -> bool {
        if !self.constrains_dates() {
            return true;
        }
        let Some(date) = record.date else {
            return false;
        };

        if self.date_from.is_some_and(|from| date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| date > to) {
            return false;
        }
        if !self.months.is_empty()
            && !self
                .months
                .iter()
                .any(|month| month.number_from_month() == date.month())
        {
            return false;
        }
        if !self.weekdays.is_empty() && !self.weekdays.contains(&date.weekday()) {
            return false;
        }
        true
    }
}

/// Immutable presence matrix: one row per transaction, one column per item.
///
/// Rows are sorted by transaction id and columns by item name, so the same
/// input always yields the same layout.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidenceMatrix {
    transaction_ids: Vec<String>,
    items: Vec<String>,
    cells: Array2<bool>,
}

impl IncidenceMatrix {
    /// Build a matrix straight from item baskets, one per transaction.
    ///
    /// An empty basket still contributes a row.
    pub fn from_baskets<I, T, B, S>(baskets: I) -> Result<Self, MiningError>
    where
        I: IntoIterator<Item = (T, B)>,
        T: Into<String>,
        B: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut totals: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();
        let mut universe = BTreeSet::new();

        for (transaction_id, basket) in baskets {
            let row = totals.entry(transaction_id.into()).or_default();
            for item in basket {
                let item = item.into();
                universe.insert(item.clone());
                *row.entry(item).or_insert(0) += 1;
            }
        }

        if totals.is_empty() {
            return Err(MiningError::EmptyDataset);
        }
        Ok(Self::build(totals, universe))
    }

    fn build(
        totals: BTreeMap<String, BTreeMap<String, i64>>,
        universe: BTreeSet<String>,
    ) -> Self {
        let items: Vec<String> = universe.into_iter().collect();
        let mut cells = Array2::from_elem((totals.len(), items.len()), false);
        let mut transaction_ids = Vec::with_capacity(totals.len());

        for (row, (transaction_id, basket)) in totals.into_iter().enumerate() {
            // every basket item is in the universe, so the search always hits
            for (item, _) in basket.iter().filter(|(_, &total)| total > 0) {
                if let Ok(col) = items.binary_search(item) {
                    cells[[row, col]] = true;
                }
            }
            transaction_ids.push(transaction_id);
        }

        Self {
            transaction_ids,
            items,
            cells,
        }
    }

    pub fn n_transactions(&self) -> usize {
        self.transaction_ids.len()
    }

    pub fn n_items(&self) -> usize {
        self.items.len()
    }

    /// Column labels, sorted ascending
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Row labels, sorted ascending
    pub fn transaction_ids(&self) -> &[String] {
        &self.transaction_ids
    }

    /// Raw presence cells, shape `(n_transactions, n_items)`
    pub fn cells(&self) -> &Array2<bool> {
        &self.cells
    }

    pub fn item_index(&self, item: &str) -> Option<usize> {
        self.items.binary_search_by(|probe| probe.as_str().cmp(item)).ok()
    }

    fn transaction_index(&self, transaction_id: &str) -> Option<usize> {
        self.transaction_ids
            .binary_search_by(|probe| probe.as_str().cmp(transaction_id))
            .ok()
    }

    /// Whether `item` was bought in `transaction_id`
    pub fn contains(&self, transaction_id: &str, item: &str) -> bool {
        match (self.transaction_index(transaction_id), self.item_index(item)) {
            (Some(row), Some(col)) => self.cells[[row, col]],
            _ => false,
        }
    }

    /// Items present in one transaction, or `None` for an unknown id
    pub fn basket(&self, transaction_id: &str) -> Option<Vec<&str>> {
        let row = self.transaction_index(transaction_id)?;
        Some(
            self.cells
                .row(row)
                .iter()
                .zip(&self.items)
                .filter(|(&present, _)| present)
                .map(|(_, item)| item.as_str())
                .collect(),
        )
    }

    /// Number of transactions containing each item, in column order
    pub fn item_counts(&self) -> Vec<usize> {
        self.cells
            .axis_iter(Axis(1))
            .map(|column| column.iter().filter(|&&present| present).count())
            .collect()
    }
}

/// Encode a raw transaction log into an incidence matrix.
///
/// Quantities are summed per `(transaction, item)` pair; a positive total
/// marks the item present. Every item and transaction seen in the filtered
/// input gets a column or row, even when all of its quantities are zero or
/// negative.
pub fn encode(
    records: &[TransactionRecord],
    criteria: &FilterCriteria,
) -> Result<IncidenceMatrix, MiningError> {
    let mut totals: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();
    let mut universe = BTreeSet::new();
    let mut kept = 0usize;

    for record in records.iter().filter(|record| criteria.matches(record)) {
        kept += 1;
        universe.insert(record.item.clone());
        let total = totals
            .entry(record.transaction_id.clone())
            .or_default()
            .entry(record.item.clone())
            .or_insert(0);
        *total = total.saturating_add(record.quantity);
    }

    if kept == 0 {
        return Err(MiningError::EmptyDataset);
    }

    debug!(
        records = records.len(),
        kept,
        transactions = totals.len(),
        items = universe.len(),
        "encoded transaction log"
    );

    Ok(IncidenceMatrix::build(totals, universe))
}

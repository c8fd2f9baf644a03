//! Transaction log loading from CSV using Polars

use crate::encoder::TransactionRecord;
use anyhow::Context;
use chrono::NaiveDate;
use polars::prelude::*;
use tracing::debug;

/// Column layout of the input CSV
#[derive(Debug, Clone, PartialEq)]
pub struct CsvColumns {
    pub transaction_id: String,
    pub item: String,
    /// When absent every row counts as one unit
    pub quantity: Option<String>,
    /// When absent records carry no date and date filters match nothing
    pub date: Option<String>,
    /// chrono format string for the date column
    pub date_format: String,
}

impl Default for CsvColumns {
    fn default() -> Self {
        Self {
            transaction_id: "transaction_id".to_string(),
            item: "item".to_string(),
            quantity: None,
            date: None,
            date_format: "%d-%m-%Y".to_string(),
        }
    }
}

/// Load a CSV transaction log into records
///
/// # Arguments
/// * `file_path` - Path to the CSV file (with a header row)
/// * `columns` - Which columns hold the transaction id, item, quantity and date
///
/// # Returns
/// * One `TransactionRecord` per row. Rows with a null id or item are skipped;
///   a null quantity counts as zero. A header-only file yields no records.
pub fn load_transactions(
    file_path: &str,
    columns: &CsvColumns,
) -> crate::Result<Vec<TransactionRecord>> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(file_path.into()))
        .with_context(|| format!("failed to open {file_path}"))?
        .finish()
        .with_context(|| format!("failed to read CSV from {file_path}"))?;

    records_from_frame(&df, columns)
}

/// Convert an already loaded frame into records
pub fn records_from_frame(
    df: &DataFrame,
    columns: &CsvColumns,
) -> crate::Result<Vec<TransactionRecord>> {
    let ids = string_column(df, &columns.transaction_id)?;
    let items = string_column(df, &columns.item)?;
    let quantities = match &columns.quantity {
        Some(name) => integer_column(df, name)?,
        None => vec![Some(1); df.height()],
    };
    let dates = match &columns.date {
        Some(name) => parse_dates(&string_column(df, name)?, &columns.date_format)?,
        None => vec![None; df.height()],
    };

    let mut records = Vec::with_capacity(df.height());
    let mut skipped = 0usize;
    for (((id, item), quantity), date) in ids.into_iter().zip(items).zip(quantities).zip(dates) {
        let (Some(transaction_id), Some(item)) = (id, item) else {
            skipped += 1;
            continue;
        };
        records.push(TransactionRecord {
            transaction_id,
            item: item.trim().to_string(),
            quantity: quantity.unwrap_or(0),
            date,
        });
    }

    debug!(rows = df.height(), records = records.len(), skipped, "loaded transaction log");

    // an empty log is reported by the encoder as `MiningError::EmptyDataset`
    Ok(records)
}

fn string_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .with_context(|| format!("missing column '{name}'"))?
        .cast(&DataType::String)?;

    Ok(column
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

fn integer_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<i64>>> {
    let column = df
        .column(name)
        .with_context(|| format!("missing column '{name}'"))?
        .cast(&DataType::Int64)?;

    Ok(column.as_materialized_series().i64()?.into_iter().collect())
}

fn parse_dates(values: &[Option<String>], format: &str) -> crate::Result<Vec<Option<NaiveDate>>> {
    values
        .iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(raw) => NaiveDate::parse_from_str(raw.trim(), format)
                .map(Some)
                .with_context(|| {
                    format!("row {row}: cannot parse date '{raw}' with format '{format}'")
                }),
            None => Ok(None),
        })
        .collect()
}

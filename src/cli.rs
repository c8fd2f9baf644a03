//! Command-line interface definitions and argument parsing

use crate::data::CsvColumns;
use crate::encoder::FilterCriteria;
use crate::miner::Itemset;
use crate::pipeline::MiningParams;
use crate::rules::RankKey;
use chrono::{Month, NaiveDate, Weekday};
use clap::{Parser, ValueEnum};

/// Market basket analysis: frequent itemsets and association rules with Apriori
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "transactions.csv")]
    pub input: String,

    /// Column holding the transaction id
    #[arg(long, default_value = "transaction_id")]
    pub transaction_column: String,

    /// Column holding the item name
    #[arg(long, default_value = "item")]
    pub item_column: String,

    /// Column holding the quantity; without it every row counts once
    #[arg(long)]
    pub quantity_column: Option<String>,

    /// Column holding the sale date, required for date filters
    #[arg(long)]
    pub date_column: Option<String>,

    /// chrono format of the date column
    #[arg(long, default_value = "%d-%m-%Y")]
    pub date_format: String,

    /// Minimum support, in (0, 1]
    #[arg(long, default_value = "0.01")]
    pub min_support: f64,

    /// Minimum lift; 0 disables the filter
    #[arg(long, default_value = "0.0")]
    pub min_lift: f64,

    /// Maximum itemset size
    #[arg(long)]
    pub max_len: Option<usize>,

    /// Ranking metric
    #[arg(long, value_enum, default_value_t = RankArg::ConfSupp)]
    pub rank: RankArg,

    /// Number of top rules to keep, 0 keeps all
    #[arg(short, long, default_value = "10")]
    pub top: usize,

    /// Only keep sales on or after this date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Only keep sales on or before this date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,

    /// Only keep sales in this month (1-12); repeatable
    #[arg(long = "month")]
    pub months: Vec<u8>,

    /// Only keep sales on this weekday (e.g. sat); repeatable
    #[arg(long = "weekday")]
    pub weekdays: Vec<String>,

    /// Recommend companions for this product (comma-separated for several)
    #[arg(short, long)]
    pub product: Option<String>,

    /// Write the ranked rules as JSON to this path
    #[arg(long)]
    pub json: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Ranking metric as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RankArg {
    Confidence,
    ConfSupp,
}

impl From<RankArg> for RankKey {
    fn from(arg: RankArg) -> Self {
        match arg {
            RankArg::Confidence => RankKey::Confidence,
            RankArg::ConfSupp => RankKey::ConfSupp,
        }
    }
}

impl Args {
    pub fn csv_columns(&self) -> CsvColumns {
        CsvColumns {
            transaction_id: self.transaction_column.clone(),
            item: self.item_column.clone(),
            quantity: self.quantity_column.clone(),
            date: self.date_column.clone(),
            date_format: self.date_format.clone(),
        }
    }

    pub fn mining_params(&self) -> MiningParams {
        MiningParams {
            min_support: self.min_support,
            min_lift: self.min_lift,
            max_len: self.max_len,
            rank_key: self.rank.into(),
            top_n: (self.top > 0).then_some(self.top),
        }
    }

    /// Build the row filter from the date, month and weekday flags
    pub fn filter_criteria(&self) -> crate::Result<FilterCriteria> {
        let date_from = self.from.as_deref().map(parse_date).transpose()?;
        let date_to = self.to.as_deref().map(parse_date).transpose()?;

        let months = self
            .months
            .iter()
            .map(|&m| Month::try_from(m).map_err(|_| anyhow::anyhow!("Invalid month: {}", m)))
            .collect::<crate::Result<Vec<_>>>()?;

        let weekdays = self
            .weekdays
            .iter()
            .map(|w| {
                w.trim()
                    .parse::<Weekday>()
                    .map_err(|_| anyhow::anyhow!("Invalid weekday: {}", w))
            })
            .collect::<crate::Result<Vec<_>>>()?;

        Ok(FilterCriteria::any()
            .between(date_from, date_to)
            .in_months(months)
            .on_weekdays(weekdays))
    }

    /// Parse the product flag into an antecedent itemset
    /// Expected format: "item" or "item a, item b"
    pub fn product_antecedent(&self) -> Option<Itemset> {
        let product = self.product.as_deref()?;
        let itemset: Itemset = product
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect();
        (!itemset.is_empty()).then_some(itemset)
    }
}

fn parse_date(value: &str) -> crate::Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Invalid date (expected YYYY-MM-DD): {}", value))
}

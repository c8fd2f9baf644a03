//! Console and JSON output for mining results

use crate::miner::FrequentItemsets;
use crate::pipeline::Analysis;
use crate::rules::{AssociationRule, RuleSet};
use anyhow::Context;
use std::fs::File;
use std::io::{BufWriter, Write};

/// Render rules as a fixed-width table, one rule per line
pub fn format_rule_table(rules: &RuleSet) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {:>3} | {:<30} | {:<30} | {:>7} | {:>10} | {:>6} | {:>9}\n",
        "#", "antecedents", "consequents", "support", "confidence", "lift", "conf_supp"
    ));
    out.push_str(&format!("  {}\n", "-".repeat(116)));

    for (rank, rule) in rules.iter().enumerate() {
        out.push_str(&format_rule_row(rank + 1, rule));
        out.push('\n');
    }
    out
}

fn format_rule_row(rank: usize, rule: &AssociationRule) -> String {
    format!(
        "  {:>3} | {:<30} | {:<30} | {:>7.4} | {:>10.4} | {:>6.3} | {:>9.4}",
        rank,
        rule.antecedents.to_string(),
        rule.consequents.to_string(),
        rule.support,
        rule.confidence,
        rule.lift,
        rule.conf_supp
    )
}

/// Print frequent itemset counts per size
pub fn print_itemset_summary(itemsets: &FrequentItemsets) {
    println!("\n=== Frequent Itemsets ===");
    println!("Transactions: {}", itemsets.n_transactions());
    println!("Minimum support: {}", itemsets.min_support());
    println!("Frequent itemsets: {}", itemsets.len());
    for len in 1..=itemsets.max_len() {
        println!("  size {}: {}", len, itemsets.of_len(len).count());
    }
}

/// Print the ranked rule table
pub fn print_rule_table(rules: &RuleSet) {
    println!("\n=== Association Rules (ranked by {}) ===", rules.rank_key());
    if rules.is_empty() {
        println!("No association rules found for the selected criteria.");
        return;
    }
    print!("{}", format_rule_table(rules));
}

/// Serialize rule records to a JSON string
pub fn rules_to_json(rules: &RuleSet) -> crate::Result<String> {
    Ok(serde_json::to_string_pretty(rules.rules())?)
}

/// Serialize rule records into `writer` and flush it
pub fn write_rules<W: Write>(rules: &RuleSet, writer: W) -> crate::Result<()> {
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, rules.rules())?;
    writer.flush().context("failed to flush rule output")?;
    Ok(())
}

/// Write rule records as a JSON array
pub fn write_rules_json(rules: &RuleSet, output_path: &str) -> crate::Result<()> {
    let file =
        File::create(output_path).with_context(|| format!("failed to create {output_path}"))?;
    write_rules(rules, file).with_context(|| format!("failed to write {output_path}"))?;
    println!("Rules saved to: {}", output_path);
    Ok(())
}

/// Print the full report and optionally export the rules
pub fn generate_report(analysis: &Analysis, json_path: Option<&str>) -> crate::Result<()> {
    println!(
        "Encoded {} transactions over {} items",
        analysis.matrix.n_transactions(),
        analysis.matrix.n_items()
    );
    print_itemset_summary(&analysis.itemsets);
    print_rule_table(&analysis.rules);

    if let Some(path) = json_path {
        write_rules_json(&analysis.rules, path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{FilterCriteria, TransactionRecord};
    use crate::pipeline::{analyze, MiningParams};
    use std::path::Path;
    use tempfile::tempdir;

    fn create_test_analysis() -> Analysis {
        let records = vec![
            TransactionRecord::new("T1", "boba shake", 1),
            TransactionRecord::new("T1", "mango sundae", 1),
            TransactionRecord::new("T2", "boba shake", 1),
            TransactionRecord::new("T2", "mango sundae", 1),
            TransactionRecord::new("T3", "boba shake", 1),
        ];
        let params = MiningParams {
            min_support: 0.5,
            ..MiningParams::default()
        };
        analyze(&records, &FilterCriteria::any(), &params).unwrap()
    }

    #[test]
    fn test_format_rule_table() {
        let analysis = create_test_analysis();
        let table = format_rule_table(&analysis.rules);

        assert!(table.contains("conf_supp"));
        assert!(table.contains("boba shake"));
        assert_eq!(table.lines().count(), 2 + analysis.rules.len());
    }

    #[test]
    fn test_rules_to_json_field_names() {
        let analysis = create_test_analysis();
        let json: serde_json::Value =
            serde_json::from_str(&rules_to_json(&analysis.rules).unwrap()).unwrap();

        let first = &json[0];
        for field in ["antecedents", "consequents", "support", "confidence", "lift", "conf_supp"] {
            assert!(first.get(field).is_some(), "missing field {field}");
        }
    }

    /// Accepts writes but fails every flush, like a full disk
    struct FailingFlush(Vec<u8>);

    impl Write for FailingFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("no space left"))
        }
    }

    #[test]
    fn test_write_rules_reports_flush_failure() {
        let analysis = create_test_analysis();

        let result = write_rules(&analysis.rules, FailingFlush(Vec::new()));
        assert!(result.is_err());

        let mut buffer = Vec::new();
        write_rules(&analysis.rules, &mut buffer).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(json.as_array().map(Vec::len), Some(analysis.rules.len()));
    }

    #[test]
    fn test_generate_report_writes_json() {
        let analysis = create_test_analysis();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("rules.json");
        let output_str = output_path.to_str().unwrap();

        let result = generate_report(&analysis, Some(output_str));
        assert!(result.is_ok());
        assert!(Path::new(output_str).exists());
    }
}

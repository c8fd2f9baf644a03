//! basketforge: market basket analysis CLI
//!
//! Loads a transaction log, mines frequent itemsets with Apriori, derives
//! ranked association rules and answers "what else do buyers of X take".

use anyhow::Result;
use basketforge::{analyze, load_transactions, report, Args, MiningError};
use clap::Parser;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        println!("basketforge - Market Basket Analysis using Apriori");
        println!("==================================================\n");
    }

    run_pipeline(&args)
}

/// Log to stderr; `BASKETFORGE_LOG` overrides the level chosen by `--verbose`
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("BASKETFORGE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_pipeline(args: &Args) -> Result<()> {
    let start_time = Instant::now();

    // Parse filters and parameters up front so bad flags fail before loading
    let criteria = args.filter_criteria()?;
    let params = args.mining_params();
    params.validate()?;

    if args.verbose {
        println!("Step 1: Loading transactions");
        println!("  Input file: {}", args.input);
    }

    let load_start = Instant::now();
    let records = load_transactions(&args.input, &args.csv_columns())?;
    println!("✓ Data loaded: {} rows", records.len());
    if args.verbose {
        println!("  Loading time: {:.2}s", load_start.elapsed().as_secs_f64());
        println!("\nStep 2: Mining association rules");
        println!("  Minimum support: {}", params.min_support);
        println!("  Minimum lift: {}", params.min_lift);
        println!("  Ranking: {}", params.rank_key);
    }

    let mining_start = Instant::now();
    let analysis = match analyze(&records, &criteria, &params) {
        Ok(analysis) => analysis,
        Err(MiningError::EmptyDataset) => {
            println!("\nNo matching transactions for the selected criteria.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    if args.verbose {
        println!("  Mining time: {:.2}s", mining_start.elapsed().as_secs_f64());
    }

    report::generate_report(&analysis, args.json.as_deref())?;

    if let Some(antecedent) = args.product_antecedent() {
        println!("\n=== Recommendation ===");
        match analysis.rules.recommend(&antecedent) {
            Ok(rule) => println!(
                "Customers who buy {} also buy {} (confidence {:.1}%, lift {:.2})",
                rule.antecedents,
                rule.consequents,
                rule.confidence * 100.0,
                rule.lift
            ),
            Err(e @ MiningError::RuleNotFound { .. }) => println!("{}", e),
            Err(e) => return Err(e.into()),
        }
    }

    println!("\n=== Pipeline Complete ===");
    println!(
        "Total processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

//! Price a batch of credit requests from a CSV file
//!
//! One output row per request and acquisition scenario. Requests that fail
//! validation or lookup are written with their error and do not stop the run.

use anyhow::{Context, Result};
use clap::Parser;
use insurance_pricing::reference::DEFAULT_REFERENCE_PATH;
use insurance_pricing::scenario::{CreditRequest, CreditRequestRow};
use insurance_pricing::{ColumnPolicy, ScenarioRunner};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "price_batch", about = "Price credit insurance requests in bulk")]
struct Args {
    /// CSV of requests (id, province, bank_type, sector, credit_type, coverage, loan_rate, tenor_years)
    #[arg(long, default_value = "data/requests/credit_batch.csv")]
    input: PathBuf,

    #[arg(long, default_value = "credit_batch_output.csv")]
    output: PathBuf,

    #[arg(long, default_value = DEFAULT_REFERENCE_PATH)]
    reference_dir: PathBuf,

    /// Match reference headers by keyword instead of exact name
    #[arg(long)]
    keyword_columns: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let policy = if args.keyword_columns {
        ColumnPolicy::Keyword
    } else {
        ColumnPolicy::Exact
    };

    let start = Instant::now();
    let runner = ScenarioRunner::from_reference_dir(&args.reference_dir, policy)
        .with_context(|| format!("loading reference tables from {}", args.reference_dir.display()))?;
    println!("Loaded reference tables in {:?}", start.elapsed());

    let mut reader = csv::Reader::from_path(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    let requests: Vec<CreditRequest> = reader
        .deserialize::<CreditRequestRow>()
        .map(|row| row.map(CreditRequest::from))
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("reading {}", args.input.display()))?;
    println!("Read {} requests", requests.len());

    let run_start = Instant::now();
    let outcomes = runner.run_batch_parallel(&requests);
    println!("Priced in {:?}", run_start.elapsed());

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    writer.write_record(["id", "acquisition", "pure_rate", "gross_rate", "status"])?;

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(quote) => {
                for s in &quote.scenarios {
                    writer.write_record([
                        outcome.id.clone(),
                        format!("{:.4}", s.acquisition),
                        format!("{:.8}", quote.breakdown.pure_rate),
                        s.gross_rate.map(|r| format!("{:.8}", r)).unwrap_or_default(),
                        if s.is_valid() { "valid".to_string() } else { "invalid".to_string() },
                    ])?;
                }
            }
            Err(err) => {
                failed += 1;
                writer.write_record([
                    outcome.id.clone(),
                    String::new(),
                    String::new(),
                    String::new(),
                    format!("error: {}", err),
                ])?;
            }
        }
    }
    writer.flush()?;

    println!(
        "{} requests, {} failed; results written to {}",
        outcomes.len(),
        failed,
        args.output.display()
    );
    Ok(())
}

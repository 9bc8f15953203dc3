//! Insurance Pricing CLI
//!
//! Prices credit insurance and product bundles from JSON request files
//! against the reference tables in data/reference/.

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use insurance_pricing::bundling::FactorSelection;
use insurance_pricing::credit::{CoverageApplication, RepaymentSchedule, SeverityPolicy};
use insurance_pricing::report::{format_bundle, format_credit_quote};
use insurance_pricing::scenario::{BundleRequest, CreditRequest};
use insurance_pricing::{
    ColumnPolicy, CreditPricingConfig, QuoteDocument, ReferenceStore, ScenarioRunner,
};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "insurance_pricing",
    about = "Price credit insurance and bundled general insurance products",
    version
)]
struct Cli {
    /// Directory holding the reference CSV files
    #[arg(long, global = true, default_value = insurance_pricing::reference::DEFAULT_REFERENCE_PATH)]
    reference_dir: PathBuf,

    /// How reference headers are matched to the fields the engines read
    #[arg(long, global = true, value_enum, default_value_t = ColumnArg::Exact)]
    columns: ColumnArg,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Price a credit insurance request across the acquisition menu
    Credit(CreditArgs),
    /// Price a bundle of products from the rate matrix
    Bundle(BundleArgs),
    /// List the selectable coverages, subcovers or factor values
    Choices(ChoicesArgs),
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Quote date (YYYY-MM-DD), defaults to today
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
struct CreditArgs {
    /// JSON request file
    #[arg(long)]
    request: PathBuf,

    /// Severity formula
    #[arg(long, value_enum, default_value_t = SeverityArg::Simplified)]
    severity: SeverityArg,

    /// Where the coverage share multiplies
    #[arg(long, value_enum, default_value_t = CoverageArg::PureRate)]
    coverage: CoverageArg,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct BundleArgs {
    /// JSON request file
    #[arg(long)]
    request: PathBuf,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct ChoicesArgs {
    #[arg(long)]
    coverage: Option<String>,

    #[arg(long, requires = "coverage")]
    subcover: Option<String>,

    /// Prior factor selection as COLUMN=VALUE, repeatable
    #[arg(long = "factor", value_parser = parse_factor)]
    factors: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColumnArg {
    Exact,
    Keyword,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SeverityArg {
    Simplified,
    Annuity,
    StraightLine,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CoverageArg {
    PureRate,
    Probability,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl From<ColumnArg> for ColumnPolicy {
    fn from(arg: ColumnArg) -> Self {
        match arg {
            ColumnArg::Exact => ColumnPolicy::Exact,
            ColumnArg::Keyword => ColumnPolicy::Keyword,
        }
    }
}

impl From<SeverityArg> for SeverityPolicy {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Simplified => SeverityPolicy::Simplified,
            SeverityArg::Annuity => SeverityPolicy::ScheduleAverage {
                schedule: RepaymentSchedule::Annuity,
            },
            SeverityArg::StraightLine => SeverityPolicy::ScheduleAverage {
                schedule: RepaymentSchedule::StraightLine,
            },
        }
    }
}

impl From<CoverageArg> for CoverageApplication {
    fn from(arg: CoverageArg) -> Self {
        match arg {
            CoverageArg::PureRate => CoverageApplication::OnPureRate,
            CoverageArg::Probability => CoverageApplication::OnProbability,
            CoverageArg::Both => CoverageApplication::OnBoth,
        }
    }
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date '{}': {}", s, e))
}

fn parse_factor(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => {
            Ok((column.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected COLUMN=VALUE, got '{}'", s)),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("opening request {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing request {}", path.display()))
}

fn emit(document: &QuoteDocument, text: String, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print!("{}", text),
        OutputFormat::Json => println!("{}", document.to_json()?),
        OutputFormat::Csv => document.write_csv(io::stdout().lock())?,
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let store = ReferenceStore::load_from(&cli.reference_dir, cli.columns.into())
        .with_context(|| format!("loading reference tables from {}", cli.reference_dir.display()))?;

    match cli.command {
        Command::Credit(args) => {
            let request: CreditRequest = read_json(&args.request)?;
            let config = CreditPricingConfig {
                severity: args.severity.into(),
                coverage: args.coverage.into(),
                ..CreditPricingConfig::default()
            };
            let runner = ScenarioRunner::with_store(store).with_config(config);

            let quote = runner.price_credit(&request.inputs, &request.assumptions)?;
            let date = args.output.date.unwrap_or_else(|| Local::now().date_naive());
            let document = QuoteDocument::from_credit(&quote, date);
            emit(&document, format_credit_quote(&quote), args.output.format)?;
        }
        Command::Bundle(args) => {
            let request: BundleRequest = read_json(&args.request)?;
            let runner = ScenarioRunner::with_store(store);

            let result = runner.price_bundle(&request.products, &request.assumptions)?;
            let date = args.output.date.unwrap_or_else(|| Local::now().date_naive());
            let document = QuoteDocument::from_bundle(&result, request.identity, date);
            emit(&document, format_bundle(&result), args.output.format)?;
        }
        Command::Choices(args) => {
            let matrix = store.rate_matrix()?;
            match (args.coverage, args.subcover) {
                (None, _) => {
                    for coverage in matrix.coverages() {
                        println!("{}", coverage);
                    }
                }
                (Some(coverage), None) => {
                    let subcovers = matrix.subcovers(&coverage);
                    if subcovers.is_empty() {
                        bail!("unknown coverage '{}'", coverage);
                    }
                    for subcover in subcovers {
                        println!("{}", subcover);
                    }
                }
                (Some(coverage), Some(subcover)) => {
                    let selection: FactorSelection = args.factors.into_iter().collect();
                    for choice in matrix.factor_choices(&coverage, &subcover, &selection) {
                        let marker = choice.selected.as_deref().unwrap_or("-");
                        println!("{} [{}]: {}", choice.column, marker, choice.values.join(", "));
                    }
                }
            }
        }
    }

    Ok(())
}

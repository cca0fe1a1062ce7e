//! basis-report: cost basis, holding terms and wash sales from a QIF export.
//!
//! Reads the investment transactions of a Quicken export, optionally fills in
//! confirmed sale prices from a CSV file, and prints one report per security.
//!
//! Usage:
//!   cargo run -p basis-report -- account.qif
//!   cargo run -p basis-report -- account.qif --supplement sales.csv --summary
//!   cargo run -p basis-report -- account.qif --security "Vanguard 500" --json

mod qif;
mod render;
mod supplement;

use anyhow::{bail, Context};
use cost_basis::{Engine, EngineConfig, Portfolio, SecurityReport, TaxYearSummary};
use std::fs;

struct Options {
    input: String,
    supplement: Option<String>,
    securities: Vec<String>,
    json: bool,
    lots: bool,
    summary: bool,
}

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  basis-report INPUT.qif [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --supplement PATH   CSV of confirmed sales (security,date,price,amount,shares)");
    eprintln!("  --security NAME     Only report this security (repeatable)");
    eprintln!("  --json              Print reports as JSON");
    eprintln!("  --no-lots           Omit lot snapshots");
    eprintln!("  --summary           Append per-tax-year totals");
    std::process::exit(1);
}

fn parse_args(args: &[String]) -> Options {
    let value_of = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };

    let securities: Vec<String> = args
        .iter()
        .enumerate()
        .filter(|(_, a)| *a == "--security")
        .filter_map(|(i, _)| args.get(i + 1).cloned())
        .collect();

    // The input is the first argument that is neither a flag nor a flag value
    let takes_value = ["--supplement", "--security"];
    let input = args
        .iter()
        .enumerate()
        .skip(1)
        .find(|(i, a)| !a.starts_with("--") && !takes_value.contains(&args[i - 1].as_str()))
        .map(|(_, a)| a.clone());

    let Some(input) = input else {
        usage();
    };

    Options {
        input,
        supplement: value_of("--supplement"),
        securities,
        json: args.iter().any(|a| a == "--json"),
        lots: !args.iter().any(|a| a == "--no-lots"),
        summary: args.iter().any(|a| a == "--summary"),
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "basis_report=info,cost_basis=warn".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let options = parse_args(&args);

    let mut config = EngineConfig::from_env()?;
    if !options.lots {
        config.lot_snapshots = false;
    }

    let text = fs::read_to_string(&options.input)
        .with_context(|| format!("reading {}", options.input))?;
    let records = qif::parse(&text).with_context(|| format!("parsing {}", options.input))?;
    let mut portfolio = Portfolio::from_records(records)?;
    tracing::info!(
        "basis-report: {} securities from {}",
        portfolio.len(),
        options.input
    );

    if let Some(path) = &options.supplement {
        let file = fs::File::open(path).with_context(|| format!("opening {}", path))?;
        let rows = supplement::read(file).with_context(|| format!("reading {}", path))?;
        let merged = portfolio.merge_supplement(&rows)?;
        portfolio.require_sale_prices()?;
        tracing::info!("merged {} supplemental sale prices from {}", merged, path);
    }

    if !options.securities.is_empty() {
        portfolio.retain_securities(&options.securities);
        if portfolio.is_empty() {
            bail!("none of the requested securities are in {}", options.input);
        }
    }

    let engine = Engine::new(config);
    let mut reports: Vec<SecurityReport> = Vec::new();
    let mut failed = 0usize;

    for (security, result) in engine.process_portfolio(portfolio) {
        match result {
            Ok(report) => {
                if !options.json {
                    println!("{}", render::report(&report));
                }
                reports.push(report);
            }
            Err(e) => {
                failed += 1;
                eprintln!("{}: {}", security, e);
            }
        }
    }

    let summaries = options
        .summary
        .then(|| TaxYearSummary::from_events(reports.iter().flat_map(|r| r.events.iter())));

    if options.json {
        let output = serde_json::json!({
            "reports": reports,
            "summary": summaries,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if let Some(summaries) = &summaries {
        println!("{}", render::summaries(summaries));
    }

    if failed > 0 {
        bail!("{} securities could not be processed", failed);
    }
    Ok(())
}

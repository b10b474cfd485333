use ag_backtest::{parse_timestamp, BacktestConfig, BacktestEngine, BacktestSummary, TradeFeed};
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

mod config;

use config::{Config, DataConfig, LedgerFormat, OutputConfig};

#[derive(Parser, Debug)]
#[clap(name = "holdbot", about = "Buy-and-hold backtest over historical trades")]
struct Args {
    /// YAML config; flags below override its values
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Trade CSV with timestamp,side,price,volume columns
    #[clap(long)]
    csv: Option<PathBuf>,

    /// Entry date, e.g. "2025-05-16 04:03:09"
    #[clap(long)]
    entry: Option<String>,

    /// Exit date
    #[clap(long)]
    exit: Option<String>,

    /// Starting capital in USD
    #[clap(long)]
    capital: Option<f64>,

    /// Fractional slippage (0.0075 = 0.75%)
    #[clap(long)]
    slippage: Option<f64>,

    /// Flat fee per transaction in USD
    #[clap(long)]
    fee: Option<f64>,

    /// Directory to write one ledger file per scenario
    #[clap(long)]
    ledger_dir: Option<PathBuf>,

    /// Ledger file format
    #[clap(long, value_enum)]
    format: Option<LedgerFormat>,
}

fn build_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Config::load(path)?
        }
        None => {
            let csv_path = args
                .csv
                .clone()
                .ok_or_else(|| anyhow!("--csv is required without --config"))?;
            let entry = args
                .entry
                .as_deref()
                .ok_or_else(|| anyhow!("--entry is required without --config"))?;
            let exit = args
                .exit
                .as_deref()
                .ok_or_else(|| anyhow!("--exit is required without --config"))?;
            let capital = args
                .capital
                .ok_or_else(|| anyhow!("--capital is required without --config"))?;

            Config {
                data: DataConfig { csv_path },
                backtest: BacktestConfig::new(
                    parse_timestamp(entry)?,
                    parse_timestamp(exit)?,
                    capital,
                ),
                scenarios: Vec::new(),
                output: OutputConfig::default(),
            }
        }
    };

    // Command line wins over the file
    if let Some(csv) = &args.csv {
        config.data.csv_path = csv.clone();
    }
    if let Some(entry) = &args.entry {
        config.backtest.entry_date = parse_timestamp(entry)?;
    }
    if let Some(exit) = &args.exit {
        config.backtest.exit_date = parse_timestamp(exit)?;
    }
    if let Some(capital) = args.capital {
        config.backtest.initial_capital = capital;
    }
    if let Some(slippage) = args.slippage {
        config.backtest.slippage_pct = slippage;
    }
    if let Some(fee) = args.fee {
        config.backtest.trading_fee_usd = fee;
    }
    if let Some(dir) = &args.ledger_dir {
        config.output.ledger_dir = Some(dir.clone());
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }

    config.validate()?;
    Ok(config)
}

fn run_scenario(
    name: &str,
    backtest: BacktestConfig,
    feed: &TradeFeed,
    output: &OutputConfig,
) -> Result<()> {
    info!(
        scenario = %name,
        slippage_pct = backtest.slippage_pct,
        trading_fee_usd = backtest.trading_fee_usd,
        "Running scenario"
    );

    let engine = BacktestEngine::new(backtest)?;
    let report = engine.run(feed.trades());
    let summary = BacktestSummary::from_report(&report);

    println!();
    println!("=== {} ===", name);
    println!(
        "  Slippage: {:.2}%  Fee: ${:.2}",
        engine.config().slippage_pct * 100.0,
        engine.config().trading_fee_usd
    );
    println!("{}", summary);

    if let Some(dir) = &output.ledger_dir {
        let path = ledger_path(dir, name, output.format);
        match output.format {
            LedgerFormat::Csv => report.ledger.to_csv_file(&path),
            LedgerFormat::Json => report.ledger.to_json_file(&path),
        }
        .with_context(|| format!("Failed to write ledger {:?}", path))?;
        info!(path = %path.display(), records = report.ledger.len(), "Ledger written");
    }

    Ok(())
}

fn ledger_path(dir: &Path, scenario: &str, format: LedgerFormat) -> PathBuf {
    let stem: String = scenario
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    dir.join(format!("ledger_{}.{}", stem, format.extension()))
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    let feed = TradeFeed::from_csv_path(&config.data.csv_path)
        .with_context(|| format!("Failed to load trades from {:?}", config.data.csv_path))?;
    match feed.time_range() {
        Some((first, last)) => info!(first = %first, last = %last, "Feed time range"),
        None => warn!("Trade feed is empty"),
    }

    if let Some(dir) = &config.output.ledger_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {:?}", dir))?;
    }

    run_scenario("default", config.backtest.clone(), &feed, &config.output)?;
    for scenario in &config.scenarios {
        run_scenario(
            &scenario.name,
            scenario.apply(&config.backtest),
            &feed,
            &config.output,
        )?;
    }

    println!();
    info!("Backtest complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["holdbot"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_build_config_from_flags() {
        let config = build_config(&args(&[
            "--csv",
            "trades.csv",
            "--entry",
            "2025-05-16 04:03:09",
            "--exit",
            "2025-05-17 00:27:20",
            "--capital",
            "1000",
            "--fee",
            "1.0",
        ]))
        .unwrap();

        assert_eq!(config.data.csv_path, PathBuf::from("trades.csv"));
        assert_eq!(config.backtest.initial_capital, 1000.0);
        assert_eq!(config.backtest.slippage_pct, 0.0075);
        assert_eq!(config.backtest.trading_fee_usd, 1.0);
        assert!(config.scenarios.is_empty());
    }

    #[test]
    fn test_build_config_requires_window_without_file() {
        let err = build_config(&args(&["--csv", "trades.csv", "--capital", "1000"]));
        assert!(err.is_err());
    }

    #[test]
    fn test_build_config_rejects_inverted_window() {
        let err = build_config(&args(&[
            "--csv",
            "trades.csv",
            "--entry",
            "2025-05-17",
            "--exit",
            "2025-05-16",
            "--capital",
            "1000",
        ]));
        assert!(err.is_err());
    }

    #[test]
    fn test_run_scenario_writes_ledger() {
        let csv = "\
timestamp,side,price,volume
2025-05-16 04:03:09,buy,100.0,1.0
2025-05-16 12:00:00,sell,110.0,1.0
";
        let feed = TradeFeed::from_reader(csv.as_bytes()).unwrap();
        let backtest = BacktestConfig::new(
            parse_timestamp("2025-05-16 04:03:09").unwrap(),
            parse_timestamp("2025-05-17 00:27:20").unwrap(),
            1000.0,
        );

        let dir = tempfile::tempdir().unwrap();
        let output = OutputConfig {
            ledger_dir: Some(dir.path().to_path_buf()),
            format: LedgerFormat::Csv,
        };
        run_scenario("default", backtest.clone(), &feed, &output).unwrap();

        let path = dir.path().join("ledger_default.csv");
        assert!(path.exists());
        let contents = std::fs::read_to_string(&path).unwrap();
        // header + seed + two trades + exit
        assert_eq!(contents.lines().count(), 5);
        assert!(contents.starts_with("timestamp,capital,position"));

        let json_output = OutputConfig {
            ledger_dir: Some(dir.path().to_path_buf()),
            format: LedgerFormat::Json,
        };
        run_scenario("custom", backtest, &feed, &json_output).unwrap();
        assert!(dir.path().join("ledger_custom.json").exists());
    }

    #[test]
    fn test_ledger_path_sanitizes_name() {
        let path = ledger_path(Path::new("out"), "1% slip / $1 fee", LedgerFormat::Csv);
        assert_eq!(path, PathBuf::from("out/ledger_1__slip____1_fee.csv"));
    }
}

//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{DEFAULT_BENCHMARK, DEFAULT_TRANSACTION_COST_BPS};
use crate::domain::config_validation::{parse_date, validate_config, validate_parameters};
use crate::domain::error::PairsError;
use crate::domain::metrics::{BETA_NEUTRAL_LIMIT, NET_EXPOSURE_LIMIT};
use crate::domain::panel::{DEFAULT_MIN_HISTORY, align_prices};
use crate::domain::position::{DEFAULT_ENTRY_THRESHOLD, DEFAULT_EXIT_THRESHOLD};
use crate::domain::price::{DateRange, PriceHistory};
use crate::domain::signal::DEFAULT_ROLLING_WINDOW;
use crate::domain::strategy::{
    PAIR_PRESETS, PairRun, PairStrategy, find_preset, run_pairs_backtest,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

const DEFAULT_DATA_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(name = "pairtrader", about = "Market-neutral pairs trading backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a pairs backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker1: Option<String>,
        #[arg(long)]
        ticker2: Option<String>,
        /// Built-in pair, see `presets`
        #[arg(short, long)]
        preset: Option<String>,
        /// Directory holding <TICKER>.csv price files
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List built-in pair presets
    Presets,
    /// List tickers with price files in the data directory
    Tickers {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },
}

/// Command-line replacements for the configured pair.
#[derive(Debug, Clone, Default)]
pub struct PairOverrides {
    pub ticker1: Option<String>,
    pub ticker2: Option<String>,
    pub preset: Option<String>,
}

impl PairOverrides {
    pub fn is_empty(&self) -> bool {
        self.ticker1.is_none() && self.ticker2.is_none() && self.preset.is_none()
    }
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            ticker1,
            ticker2,
            preset,
            data_dir,
        } => {
            let overrides = PairOverrides {
                ticker1,
                ticker2,
                preset,
            };
            run_backtest(&config, &overrides, data_dir)
        }
        Command::Validate { config } => run_validate(&config),
        Command::Presets => run_presets(),
        Command::Tickers { config, data_dir } => run_tickers(config.as_ref(), data_dir),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_backtest(
    config_path: &PathBuf,
    overrides: &PairOverrides,
    data_dir: Option<PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let validation = if overrides.is_empty() {
        validate_config(&adapter)
    } else {
        validate_parameters(&adapter)
    };
    if let Err(e) = validation {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let strategy = match apply_overrides(build_strategy(&adapter), overrides) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let range = match build_date_range(&adapter) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let data_dir = resolve_data_dir(data_dir, Some(&adapter as &dyn ConfigPort));
    let data_port = CsvAdapter::new(data_dir);

    eprintln!(
        "Running pairs backtest: {} vs {} ({} to {})",
        strategy.ticker1, strategy.ticker2, range.start, range.end
    );

    match run_backtest_pipeline(&data_port, &strategy, range) {
        Ok(run) => {
            print_summary(&strategy, &run);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Strategy parameters from config, with defaults for absent keys and tickers upper-cased.
pub fn build_strategy(config: &dyn ConfigPort) -> PairStrategy {
    let ticker = |key: &str| {
        config
            .get_string("pair", key)
            .map(|t| normalize_ticker(&t))
            .unwrap_or_default()
    };

    PairStrategy {
        ticker1: ticker("ticker1"),
        ticker2: ticker("ticker2"),
        benchmark: config
            .get_string("pair", "benchmark")
            .map(|t| normalize_ticker(&t))
            .unwrap_or_else(|| DEFAULT_BENCHMARK.to_string()),
        rolling_window: to_count(config.get_int(
            "signal",
            "rolling_window",
            DEFAULT_ROLLING_WINDOW as i64,
        )),
        entry_threshold: config.get_double("signal", "entry_threshold", DEFAULT_ENTRY_THRESHOLD),
        exit_threshold: config.get_double("signal", "exit_threshold", DEFAULT_EXIT_THRESHOLD),
        transaction_cost_bps: config.get_double(
            "costs",
            "transaction_cost_bps",
            DEFAULT_TRANSACTION_COST_BPS,
        ),
        min_history: to_count(config.get_int(
            "backtest",
            "min_history",
            DEFAULT_MIN_HISTORY as i64,
        )),
    }
}

/// Preset first, then explicit tickers on top; the result is validated.
pub fn apply_overrides(
    mut strategy: PairStrategy,
    overrides: &PairOverrides,
) -> Result<PairStrategy, PairsError> {
    if let Some(key) = &overrides.preset {
        let preset = find_preset(key).ok_or_else(|| {
            PairsError::invalid("pair", "preset", format!("unknown preset {key:?}"))
        })?;
        strategy.ticker1 = preset.ticker1.to_string();
        strategy.ticker2 = preset.ticker2.to_string();
    }
    if let Some(t) = &overrides.ticker1 {
        strategy.ticker1 = normalize_ticker(t);
    }
    if let Some(t) = &overrides.ticker2 {
        strategy.ticker2 = normalize_ticker(t);
    }
    strategy.validate()?;
    Ok(strategy)
}

pub fn build_date_range(config: &dyn ConfigPort) -> Result<DateRange, PairsError> {
    let start = parse_date(
        config.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end = parse_date(
        config.get_string("backtest", "end_date").as_deref(),
        "end_date",
    )?;
    Ok(DateRange::new(start, end))
}

/// `--data-dir`, then `[data] csv_dir`, then `./data`.
pub fn resolve_data_dir(flag: Option<PathBuf>, config: Option<&dyn ConfigPort>) -> PathBuf {
    flag.or_else(|| {
        config
            .and_then(|c| c.get_string("data", "csv_dir"))
            .map(PathBuf::from)
    })
    .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

fn normalize_ticker(raw: &str) -> String {
    raw.trim().to_uppercase()
}

// negative values become 0 so that validation rejects them
fn to_count(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

/// Fetch the pair and benchmark, align, and run the engine.
///
/// Pair fetch failures abort the run. The benchmark is best-effort: a failed
/// fetch is logged and the run continues with beta reported as zero.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    strategy: &PairStrategy,
    range: DateRange,
) -> Result<PairRun, PairsError> {
    let mut histories = Vec::with_capacity(2);
    for ticker in [&strategy.ticker1, &strategy.ticker2] {
        let points = data_port.fetch_closes(ticker, range.start, range.end)?;
        histories.push(PriceHistory::new(ticker.as_str(), points));
    }

    let benchmark = if histories.iter().any(|h| h.ticker == strategy.benchmark) {
        None
    } else {
        match data_port.fetch_closes(&strategy.benchmark, range.start, range.end) {
            Ok(points) => Some(PriceHistory::new(strategy.benchmark.as_str(), points)),
            Err(e) => {
                warn!(
                    benchmark = %strategy.benchmark,
                    error = %e,
                    "benchmark fetch failed, continuing without it"
                );
                None
            }
        }
    };

    let panel = align_prices(&histories, range, strategy.min_history)?;
    eprintln!(
        "  Aligned {} trading days ({} to {})",
        panel.len(),
        panel.first_date().map(|d| d.to_string()).unwrap_or_default(),
        panel.last_date().map(|d| d.to_string()).unwrap_or_default(),
    );

    run_pairs_backtest(&panel, strategy, benchmark.as_ref())
}

fn print_summary(strategy: &PairStrategy, run: &PairRun) {
    let metrics = &run.result.metrics;

    eprintln!(
        "\n=== Pairs Backtest: {} vs {} ===",
        strategy.ticker1, strategy.ticker2
    );
    for (label, value) in metrics.entries() {
        eprintln!("{:<28}{}", format!("{label}:"), value);
    }

    eprintln!("\n=== Market Neutrality ===");
    eprintln!(
        "Beta neutral (|beta| < {}):       {}",
        BETA_NEUTRAL_LIMIT,
        pass_fail(metrics.beta_check_passes())
    );
    eprintln!(
        "Dollar neutral (|net| < {}):       {}",
        NET_EXPOSURE_LIMIT,
        pass_fail(metrics.exposure_check_passes())
    );

    eprintln!("\n=== Activity ===");
    eprintln!(
        "Active periods:   {} of {}",
        run.active_periods(),
        run.positions.len()
    );
    eprintln!("Final equity:     {:.4}", run.result.final_equity());
    eprintln!(
        "Total costs:      {:.4}%",
        run.result.total_transaction_costs() * 100.0
    );
}

fn pass_fail(ok: bool) -> &'static str {
    if ok { "PASS" } else { "FAIL" }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let strategy = build_strategy(&adapter);

    eprintln!("\nPair:         {} vs {}", strategy.ticker1, strategy.ticker2);
    eprintln!("Benchmark:    {}", strategy.benchmark);
    eprintln!("Window:       {}", strategy.rolling_window);
    eprintln!(
        "Thresholds:   entry {} / exit {}",
        strategy.entry_threshold, strategy.exit_threshold
    );
    eprintln!("Costs:        {} bps", strategy.transaction_cost_bps);
    eprintln!("Min history:  {}", strategy.min_history);
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_presets() -> ExitCode {
    for preset in PAIR_PRESETS {
        println!(
            "{:<10}{:<6}{:<6}{}",
            preset.key, preset.ticker1, preset.ticker2, preset.label
        );
    }
    ExitCode::SUCCESS
}

fn run_tickers(config_path: Option<&PathBuf>, data_dir: Option<PathBuf>) -> ExitCode {
    let config = match config_path.map(load_config).transpose() {
        Ok(c) => c,
        Err(code) => return code,
    };
    let dir = resolve_data_dir(data_dir, config.as_ref().map(|c| c as &dyn ConfigPort));
    let adapter = CsvAdapter::new(dir.clone());

    let tickers = match adapter.list_tickers() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if tickers.is_empty() {
        eprintln!("No price files found in {}", dir.display());
    } else {
        for ticker in &tickers {
            println!("{}", ticker);
        }
        eprintln!("{} tickers found", tickers.len());
    }
    ExitCode::SUCCESS
}

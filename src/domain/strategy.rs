//! Pair strategy parameters and the signal-to-metrics pipeline.

use crate::domain::backtest::{
    BacktestConfig, BacktestResult, DEFAULT_BENCHMARK, DEFAULT_TRANSACTION_COST_BPS, run_backtest,
};
use crate::domain::error::PairsError;
use crate::domain::panel::{DEFAULT_MIN_HISTORY, PricePanel};
use crate::domain::position::{
    DEFAULT_ENTRY_THRESHOLD, DEFAULT_EXIT_THRESHOLD, PairWeight, PositionState, Thresholds,
    active_periods, generate_positions, position_weights,
};
use crate::domain::price::PriceHistory;
use crate::domain::signal::{DEFAULT_ROLLING_WINDOW, Signal, compute_signal};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct PairStrategy {
    pub ticker1: String,
    pub ticker2: String,
    pub benchmark: String,
    pub rolling_window: usize,
    pub entry_threshold: f64,
    pub exit_threshold: f64,
    pub transaction_cost_bps: f64,
    pub min_history: usize,
}

impl PairStrategy {
    pub fn new(ticker1: impl Into<String>, ticker2: impl Into<String>) -> Self {
        Self {
            ticker1: ticker1.into(),
            ticker2: ticker2.into(),
            benchmark: DEFAULT_BENCHMARK.to_string(),
            rolling_window: DEFAULT_ROLLING_WINDOW,
            entry_threshold: DEFAULT_ENTRY_THRESHOLD,
            exit_threshold: DEFAULT_EXIT_THRESHOLD,
            transaction_cost_bps: DEFAULT_TRANSACTION_COST_BPS,
            min_history: DEFAULT_MIN_HISTORY,
        }
    }

    pub fn thresholds(&self) -> Result<Thresholds, PairsError> {
        Thresholds::new(self.entry_threshold, self.exit_threshold)
    }

    pub fn backtest_config(&self) -> BacktestConfig {
        BacktestConfig {
            ticker1: self.ticker1.clone(),
            ticker2: self.ticker2.clone(),
            benchmark: self.benchmark.clone(),
            transaction_cost_bps: self.transaction_cost_bps,
        }
    }

    /// Checks the parameters the engine relies on, independent of where they came from.
    pub fn validate(&self) -> Result<(), PairsError> {
        if self.ticker1.trim().is_empty() {
            return Err(PairsError::missing("pair", "ticker1"));
        }
        if self.ticker2.trim().is_empty() {
            return Err(PairsError::missing("pair", "ticker2"));
        }
        if self.ticker1.eq_ignore_ascii_case(&self.ticker2) {
            return Err(PairsError::invalid(
                "pair",
                "ticker2",
                "tickers must be different",
            ));
        }
        if self.rolling_window < 2 {
            return Err(PairsError::invalid(
                "signal",
                "rolling_window",
                "rolling_window must be at least 2",
            ));
        }
        self.thresholds()?;
        if !(self.transaction_cost_bps.is_finite() && self.transaction_cost_bps >= 0.0) {
            return Err(PairsError::invalid(
                "costs",
                "transaction_cost_bps",
                "transaction_cost_bps must be non-negative",
            ));
        }
        if self.min_history < 2 {
            return Err(PairsError::invalid(
                "backtest",
                "min_history",
                "min_history must be at least 2",
            ));
        }
        Ok(())
    }
}

/// Everything one pipeline run derives from an aligned panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PairRun {
    pub signal: Signal,
    pub positions: Vec<PositionState>,
    pub weights: Vec<PairWeight>,
    pub result: BacktestResult,
}

impl PairRun {
    pub fn active_periods(&self) -> usize {
        active_periods(&self.positions)
    }
}

/// Signal, positions and accounting over an already aligned panel.
pub fn run_pairs_backtest(
    panel: &PricePanel,
    strategy: &PairStrategy,
    external_benchmark: Option<&PriceHistory>,
) -> Result<PairRun, PairsError> {
    strategy.validate()?;
    let thresholds = strategy.thresholds()?;

    let signal = compute_signal(
        panel,
        &strategy.ticker1,
        &strategy.ticker2,
        strategy.rolling_window,
    )?;
    let positions = generate_positions(&signal.zscore, &thresholds);
    let weights = position_weights(&positions);
    let result = run_backtest(
        panel,
        &weights,
        &strategy.backtest_config(),
        external_benchmark,
    )?;

    info!(
        pair = %format!("{}/{}", strategy.ticker1, strategy.ticker2),
        rows = panel.len(),
        active = active_periods(&positions),
        total_return = result.metrics.total_return,
        "pairs backtest complete"
    );

    Ok(PairRun {
        signal,
        positions,
        weights,
        result,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairPreset {
    pub key: &'static str,
    pub label: &'static str,
    pub ticker1: &'static str,
    pub ticker2: &'static str,
}

pub const PAIR_PRESETS: &[PairPreset] = &[
    PairPreset {
        key: "tech",
        label: "Tech: AAPL vs MSFT",
        ticker1: "AAPL",
        ticker2: "MSFT",
    },
    PairPreset {
        key: "finance",
        label: "Finance: JPM vs BAC",
        ticker1: "JPM",
        ticker2: "BAC",
    },
    PairPreset {
        key: "energy",
        label: "Energy: XOM vs CVX",
        ticker1: "XOM",
        ticker2: "CVX",
    },
    PairPreset {
        key: "retail",
        label: "Retail: WMT vs TGT",
        ticker1: "WMT",
        ticker2: "TGT",
    },
    PairPreset {
        key: "semis",
        label: "Semis: NVDA vs AMD",
        ticker1: "NVDA",
        ticker2: "AMD",
    },
];

pub fn find_preset(key: &str) -> Option<&'static PairPreset> {
    let key = key.trim();
    PAIR_PRESETS
        .iter()
        .find(|p| p.key.eq_ignore_ascii_case(key))
}

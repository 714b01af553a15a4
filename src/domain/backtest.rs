//! Backtest accountant: lagged-weight returns, turnover costs, equity and exposure.
//!
//! Weights decided at t earn the price return of t+1. The first row has no
//! prior position, so it books a zero return and zero turnover; it still
//! counts as a trading day.

use crate::domain::error::PairsError;
use crate::domain::metrics::{Metrics, MetricsInput, compute_drawdown};
use crate::domain::panel::PricePanel;
use crate::domain::position::PairWeight;
use crate::domain::price::{PriceHistory, pct_change};
use chrono::NaiveDate;
use tracing::{debug, warn};

pub const BASIS_POINTS_PER_UNIT: f64 = 10_000.0;
pub const DEFAULT_TRANSACTION_COST_BPS: f64 = 10.0;
pub const DEFAULT_BENCHMARK: &str = "SPY";

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub ticker1: String,
    pub ticker2: String,
    pub benchmark: String,
    /// Cost per unit of turnover, in basis points.
    pub transaction_cost_bps: f64,
}

impl BacktestConfig {
    pub fn cost_rate(&self) -> f64 {
        self.transaction_cost_bps / BASIS_POINTS_PER_UNIT
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub dates: Vec<NaiveDate>,
    /// Lagged-weight return before costs; `Some(0.0)` on the first row.
    pub strategy_returns: Vec<Option<f64>>,
    /// Strategy return net of transaction costs; `Some(0.0)` on the first row.
    pub net_returns: Vec<Option<f64>>,
    pub turnover: Vec<f64>,
    pub transaction_costs: Vec<f64>,
    pub equity_curve: Vec<f64>,
    /// Percent, never positive.
    pub drawdown: Vec<f64>,
    pub gross_exposure: Vec<f64>,
    pub net_exposure: Vec<f64>,
    pub metrics: Metrics,
}

impl BacktestResult {
    pub fn final_equity(&self) -> f64 {
        self.equity_curve.last().copied().unwrap_or(1.0)
    }

    pub fn total_transaction_costs(&self) -> f64 {
        self.transaction_costs.iter().sum()
    }

    /// Defined net returns with their dates.
    pub fn clean_returns(&self) -> Vec<(NaiveDate, f64)> {
        self.dates
            .iter()
            .zip(&self.net_returns)
            .filter_map(|(d, r)| r.map(|r| (*d, r)))
            .collect()
    }
}

/// Run the accountant over an aligned panel and its weight series.
///
/// The benchmark is taken from the panel when it has a column for it,
/// otherwise from `external_benchmark`. With neither, beta and correlation
/// are reported as zero.
pub fn run_backtest(
    panel: &PricePanel,
    weights: &[PairWeight],
    config: &BacktestConfig,
    external_benchmark: Option<&PriceHistory>,
) -> Result<BacktestResult, PairsError> {
    if weights.len() != panel.len() {
        return Err(PairsError::MisalignedSeries {
            expected: panel.len(),
            actual: weights.len(),
        });
    }

    let first_returns = pct_change(panel.require(&config.ticker1)?);
    let second_returns = pct_change(panel.require(&config.ticker2)?);
    let cost_rate = config.cost_rate();
    let n = panel.len();

    let mut strategy_returns = Vec::with_capacity(n);
    let mut net_returns = Vec::with_capacity(n);
    let mut turnover = Vec::with_capacity(n);
    let mut transaction_costs = Vec::with_capacity(n);
    let mut equity_curve = Vec::with_capacity(n);
    let mut equity = 1.0_f64;

    for t in 0..n {
        // no prior position at t=0: flat return, no turnover
        let (gross, traded) = if t == 0 {
            (Some(0.0), 0.0)
        } else {
            let prev = &weights[t - 1];
            let gross = match (first_returns[t], second_returns[t]) {
                (Some(r1), Some(r2)) => Some(prev.first * r1 + prev.second * r2),
                _ => None,
            };
            (gross, weights[t].turnover_from(prev))
        };

        let cost = traded * cost_rate;
        let net = gross.map(|g| g - cost);
        if let Some(r) = net {
            equity *= 1.0 + r;
        }

        strategy_returns.push(gross);
        net_returns.push(net);
        turnover.push(traded);
        transaction_costs.push(cost);
        equity_curve.push(equity);
    }

    let drawdown = compute_drawdown(&equity_curve);
    let gross_exposure: Vec<f64> = weights.iter().map(PairWeight::gross).collect();
    let net_exposure: Vec<f64> = weights.iter().map(PairWeight::net).collect();

    let clean: Vec<(NaiveDate, f64)> = panel
        .dates()
        .iter()
        .zip(&net_returns)
        .filter_map(|(d, r)| r.map(|r| (*d, r)))
        .collect();

    let benchmark_returns = benchmark_returns(panel, &config.benchmark, external_benchmark);
    if benchmark_returns.is_none() {
        warn!(
            benchmark = %config.benchmark,
            "benchmark unavailable, beta and correlation default to zero"
        );
    }

    let metrics = Metrics::compute(&MetricsInput {
        returns: &clean,
        final_equity: equity,
        drawdown: &drawdown,
        gross_exposure: &gross_exposure,
        net_exposure: &net_exposure,
        turnover: &turnover,
        benchmark_returns: benchmark_returns.as_deref(),
    })?;

    debug!(
        rows = n,
        returns = clean.len(),
        final_equity = equity,
        "backtest accounted"
    );

    Ok(BacktestResult {
        dates: panel.dates().to_vec(),
        strategy_returns,
        net_returns,
        turnover,
        transaction_costs,
        equity_curve,
        drawdown,
        gross_exposure,
        net_exposure,
        metrics,
    })
}

fn benchmark_returns(
    panel: &PricePanel,
    benchmark: &str,
    external: Option<&PriceHistory>,
) -> Option<Vec<(NaiveDate, f64)>> {
    if let Some(closes) = panel.closes(benchmark) {
        let returns = panel
            .dates()
            .iter()
            .zip(pct_change(closes))
            .filter_map(|(d, r)| r.map(|r| (*d, r)))
            .collect();
        return Some(returns);
    }

    external
        .filter(|h| !h.is_empty())
        .map(PriceHistory::dated_returns)
}

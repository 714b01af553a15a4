//! Performance metrics and statistics.
//!
//! All values are closed-form reductions over the net-return series of one
//! backtest and are rounded for display once, here.

use crate::domain::error::PairsError;
use chrono::NaiveDate;
use std::collections::HashMap;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Fewer common dates than this and beta/correlation fall back to zero.
pub const MIN_BENCHMARK_OVERLAP: usize = 20;

/// |beta| below this passes the market-neutrality check.
pub const BETA_NEUTRAL_LIMIT: f64 = 0.15;
/// |average net exposure| below this passes the exposure check.
pub const NET_EXPOSURE_LIMIT: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    /// Percent.
    pub total_return: f64,
    /// Compound annual growth rate, percent.
    pub cagr: f64,
    /// Annualised standard deviation of net returns, percent.
    pub volatility: f64,
    /// CAGR divided by volatility. No risk-free rate is subtracted.
    pub sharpe_ratio: f64,
    /// Most negative drawdown, percent.
    pub max_drawdown: f64,
    /// Winning periods over winning plus losing periods, percent.
    pub hit_rate: f64,
    /// Mean positive period return, percent.
    pub avg_win: f64,
    /// Mean negative period return, percent.
    pub avg_loss: f64,
    pub beta: f64,
    pub correlation: f64,
    pub trading_days: usize,
    pub avg_gross_exposure: f64,
    pub avg_net_exposure: f64,
    pub avg_daily_turnover: f64,
}

/// Series a [`Metrics`] summary is derived from.
#[derive(Debug, Clone, Copy)]
pub struct MetricsInput<'a> {
    /// Defined net returns only, in date order.
    pub returns: &'a [(NaiveDate, f64)],
    pub final_equity: f64,
    pub drawdown: &'a [f64],
    pub gross_exposure: &'a [f64],
    pub net_exposure: &'a [f64],
    pub turnover: &'a [f64],
    /// Benchmark simple returns; `None` when no benchmark could be resolved.
    pub benchmark_returns: Option<&'a [(NaiveDate, f64)]>,
}

impl Metrics {
    pub fn compute(input: &MetricsInput<'_>) -> Result<Self, PairsError> {
        let returns: Vec<f64> = input.returns.iter().map(|&(_, r)| r).collect();
        if returns.is_empty() {
            return Err(PairsError::EmptyReturnSeries);
        }

        let trading_days = returns.len();
        let years = trading_days as f64 / TRADING_DAYS_PER_YEAR;
        if years <= 0.0 {
            return Err(PairsError::ZeroHorizon);
        }

        let total_return = (input.final_equity - 1.0) * 100.0;
        let cagr = (input.final_equity.powf(1.0 / years) - 1.0) * 100.0;
        let volatility = sample_std(&returns) * TRADING_DAYS_PER_YEAR.sqrt() * 100.0;
        let sharpe_ratio = if volatility > 0.0 {
            cagr / volatility
        } else {
            0.0
        };

        let max_drawdown = input.drawdown.iter().copied().fold(0.0_f64, f64::min);

        let wins: Vec<f64> = returns.iter().copied().filter(|&r| r > 0.0).collect();
        let losses: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
        let decided = wins.len() + losses.len();
        let hit_rate = if decided > 0 {
            wins.len() as f64 / decided as f64 * 100.0
        } else {
            0.0
        };
        let avg_win = mean(&wins).unwrap_or(0.0) * 100.0;
        let avg_loss = mean(&losses).unwrap_or(0.0) * 100.0;

        let (beta, correlation) = input
            .benchmark_returns
            .map(|bench| benchmark_beta(input.returns, bench))
            .unwrap_or((0.0, 0.0));

        Ok(Metrics {
            total_return: round_to(total_return, 2),
            cagr: round_to(cagr, 2),
            volatility: round_to(volatility, 2),
            sharpe_ratio: round_to(sharpe_ratio, 2),
            max_drawdown: round_to(max_drawdown, 2),
            hit_rate: round_to(hit_rate, 2),
            avg_win: round_to(avg_win, 3),
            avg_loss: round_to(avg_loss, 3),
            beta: round_to(beta, 3),
            correlation: round_to(correlation, 3),
            trading_days,
            avg_gross_exposure: round_to(mean(input.gross_exposure).unwrap_or(0.0), 2),
            avg_net_exposure: round_to(mean(input.net_exposure).unwrap_or(0.0), 3),
            avg_daily_turnover: round_to(mean(input.turnover).unwrap_or(0.0), 4),
        })
    }

    /// Labelled values in display order.
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("Total Return (%)", self.total_return),
            ("CAGR (%)", self.cagr),
            ("Annualized Volatility (%)", self.volatility),
            ("Sharpe Ratio", self.sharpe_ratio),
            ("Max Drawdown (%)", self.max_drawdown),
            ("Hit Rate (%)", self.hit_rate),
            ("Avg Win (%)", self.avg_win),
            ("Avg Loss (%)", self.avg_loss),
            ("Beta vs Market", self.beta),
            ("Correlation vs Market", self.correlation),
            ("Trading Days", self.trading_days as f64),
            ("Avg Gross Exposure", self.avg_gross_exposure),
            ("Avg Net Exposure", self.avg_net_exposure),
            ("Avg Daily Turnover", self.avg_daily_turnover),
        ]
    }

    pub fn beta_check_passes(&self) -> bool {
        self.beta.abs() < BETA_NEUTRAL_LIMIT
    }

    pub fn exposure_check_passes(&self) -> bool {
        self.avg_net_exposure.abs() < NET_EXPOSURE_LIMIT
    }
}

/// Percentage drawdown from the running peak; never positive.
pub fn compute_drawdown(equity: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity
        .iter()
        .map(|&e| {
            peak = peak.max(e);
            if peak > 0.0 {
                (e - peak) / peak * 100.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Beta and Pearson correlation of `strategy` against `benchmark` over their
/// common dates. Returns (0, 0) below [`MIN_BENCHMARK_OVERLAP`] common dates;
/// either value is 0 when the benchmark (or strategy) variance is zero.
pub fn benchmark_beta(
    strategy: &[(NaiveDate, f64)],
    benchmark: &[(NaiveDate, f64)],
) -> (f64, f64) {
    let bench_by_date: HashMap<NaiveDate, f64> = benchmark.iter().copied().collect();
    let (xs, ys): (Vec<f64>, Vec<f64>) = strategy
        .iter()
        .filter_map(|(date, r)| bench_by_date.get(date).map(|b| (*r, *b)))
        .filter(|(r, b)| r.is_finite() && b.is_finite())
        .unzip();

    if xs.len() < MIN_BENCHMARK_OVERLAP {
        return (0.0, 0.0);
    }

    let cov = covariance(&xs, &ys);
    let var_x = covariance(&xs, &xs);
    let var_y = covariance(&ys, &ys);

    let beta = if var_y > 0.0 { cov / var_y } else { 0.0 };
    let correlation = if var_x > 0.0 && var_y > 0.0 {
        cov / (var_x.sqrt() * var_y.sqrt())
    } else {
        0.0
    };
    (beta, correlation)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Standard deviation with an n-1 denominator; 0 for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    covariance(values, values).sqrt()
}

/// Sample covariance; 0 for fewer than two pairs.
fn covariance(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let mx = xs[..n].iter().sum::<f64>() / n as f64;
    let my = ys[..n].iter().sum::<f64>() / n as f64;
    xs[..n]
        .iter()
        .zip(&ys[..n])
        .map(|(x, y)| (x - mx) * (y - my))
        .sum::<f64>()
        / (n - 1) as f64
}

/// Round half to even at `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round_ties_even() / scale
}

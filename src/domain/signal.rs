//! Spread signal: price ratio, rolling statistics and z-score.
//!
//! RATIO[t]  = P1[t] / P2[t]
//! MEAN[t]   = sum(RATIO[t-j] for j in 0..w) / w
//! STD[t]    = sqrt(sum((RATIO[t-j] - MEAN[t])^2 for j in 0..w) / (w - 1))
//! Z[t]      = (RATIO[t] - MEAN[t]) / STD[t]
//! Warmup: first (w-1) rows are missing. A zero STD also yields a missing Z.

use crate::domain::error::PairsError;
use crate::domain::panel::PricePanel;
use chrono::NaiveDate;
use tracing::debug;

pub const DEFAULT_ROLLING_WINDOW: usize = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub dates: Vec<NaiveDate>,
    pub ratio: Vec<f64>,
    pub rolling_mean: Vec<Option<f64>>,
    pub rolling_std: Vec<Option<f64>>,
    pub zscore: Vec<Option<f64>>,
    pub window: usize,
}

impl Signal {
    pub fn len(&self) -> usize {
        self.zscore.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zscore.is_empty()
    }

    /// Number of rows with a defined z-score.
    pub fn defined_count(&self) -> usize {
        self.zscore.iter().filter(|z| z.is_some()).count()
    }
}

pub fn compute_signal(
    panel: &PricePanel,
    ticker1: &str,
    ticker2: &str,
    window: usize,
) -> Result<Signal, PairsError> {
    if window < 2 {
        return Err(PairsError::invalid(
            "signal",
            "rolling_window",
            "rolling_window must be at least 2",
        ));
    }

    let first = panel.require(ticker1)?;
    let second = panel.require(ticker2)?;

    let ratio: Vec<f64> = first.iter().zip(second).map(|(a, b)| a / b).collect();

    if ratio.iter().any(|&r| r == 0.0) {
        return Err(PairsError::InvalidPriceRatio {
            reason: format!("{ticker1}/{ticker2} ratio contains zero"),
        });
    }
    if ratio.iter().all(|r| !r.is_finite()) {
        return Err(PairsError::InvalidPriceRatio {
            reason: format!("{ticker1}/{ticker2} ratio has no finite values"),
        });
    }

    let (rolling_mean, rolling_std) = rolling_mean_std(&ratio, window);

    let zscore: Vec<Option<f64>> = ratio
        .iter()
        .zip(rolling_mean.iter().zip(&rolling_std))
        .map(|(&r, (mean, std))| match (mean, std) {
            (Some(m), Some(s)) if *s > 0.0 => Some((r - m) / s),
            _ => None,
        })
        .collect();

    let signal = Signal {
        dates: panel.dates().to_vec(),
        ratio,
        rolling_mean,
        rolling_std,
        zscore,
        window,
    };
    debug!(
        rows = signal.len(),
        defined = signal.defined_count(),
        window,
        "computed spread z-score"
    );
    Ok(signal)
}

/// Trailing mean and sample standard deviation over `window` values.
///
/// A window containing a non-finite value is missing. A standard deviation at
/// round-off level relative to the mean is reported as zero.
pub fn rolling_mean_std(values: &[f64], window: usize) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let mut means = Vec::with_capacity(values.len());
    let mut stds = Vec::with_capacity(values.len());
    let warmup = window.saturating_sub(1);

    for i in 0..values.len() {
        if window < 2 || i < warmup {
            means.push(None);
            stds.push(None);
            continue;
        }

        let slice = &values[i + 1 - window..=i];
        if slice.iter().any(|v| !v.is_finite()) {
            means.push(None);
            stds.push(None);
            continue;
        }

        let n = window as f64;
        let mean = slice.iter().sum::<f64>() / n;
        let variance = slice
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / (n - 1.0);
        let mut std = variance.sqrt();
        if std <= mean.abs() * 1e-12 {
            std = 0.0;
        }

        means.push(Some(mean));
        stds.push(Some(std));
    }

    (means, stds)
}

//! Aligned price panel and the price aligner.
//!
//! A [`PricePanel`] holds one close column per ticker over the dates that every
//! ticker has a usable observation for. Rows where any ticker is missing are
//! dropped, so downstream components never see a gap.

use crate::domain::error::PairsError;
use crate::domain::price::{DateRange, PriceHistory};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Trading days required before rolling statistics and annualised metrics are trusted.
pub const DEFAULT_MIN_HISTORY: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct PricePanel {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    columns: Vec<Vec<f64>>,
    column_index: HashMap<String, usize>,
}

impl PricePanel {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.column_index.contains_key(ticker)
    }

    pub fn closes(&self, ticker: &str) -> Option<&[f64]> {
        self.column_index
            .get(ticker)
            .map(|&i| self.columns[i].as_slice())
    }

    /// Like [`closes`](Self::closes) but reports an absent column as an error.
    pub fn require(&self, ticker: &str) -> Result<&[f64], PairsError> {
        self.closes(ticker).ok_or_else(|| PairsError::MissingTicker {
            ticker: ticker.to_string(),
        })
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

/// Intersect per-ticker histories into a gap-free panel.
///
/// Each history is clipped to `range`; non-positive or non-finite closes count
/// as missing; duplicate dates keep the last observation. Requested tickers are
/// de-duplicated, first occurrence wins.
pub fn align_prices(
    histories: &[PriceHistory],
    range: DateRange,
    min_rows: usize,
) -> Result<PricePanel, PairsError> {
    if histories.is_empty() {
        return Err(PairsError::DataUnavailable {
            reason: "no tickers requested".into(),
        });
    }

    let mut tickers: Vec<String> = Vec::with_capacity(histories.len());
    let mut series: Vec<BTreeMap<NaiveDate, f64>> = Vec::with_capacity(histories.len());

    for history in histories {
        if tickers.contains(&history.ticker) {
            continue;
        }

        let mut by_date = BTreeMap::new();
        let mut in_range = 0usize;
        for point in history.points.iter().filter(|p| range.contains(p.date)) {
            in_range += 1;
            if point.is_usable() {
                by_date.insert(point.date, point.close);
            } else {
                by_date.remove(&point.date);
            }
        }

        if in_range == 0 {
            return Err(PairsError::DataUnavailable {
                reason: format!("{} has no rows in {} to {}", history.ticker, range.start, range.end),
            });
        }

        debug!(
            ticker = %history.ticker,
            rows = in_range,
            usable = by_date.len(),
            "clipped price history"
        );
        tickers.push(history.ticker.clone());
        series.push(by_date);
    }

    let common: BTreeSet<NaiveDate> = series[0]
        .keys()
        .filter(|date| series[1..].iter().all(|s| s.contains_key(date)))
        .copied()
        .collect();

    if common.is_empty() {
        return Err(PairsError::DataUnavailable {
            reason: format!("no common dates across {}", tickers.join(", ")),
        });
    }

    if common.len() < min_rows {
        return Err(PairsError::InsufficientHistory {
            rows: common.len(),
            minimum: min_rows,
        });
    }

    let dates: Vec<NaiveDate> = common.into_iter().collect();
    let columns: Vec<Vec<f64>> = series
        .iter()
        .map(|s| dates.iter().map(|d| s[d]).collect())
        .collect();
    let column_index = tickers
        .iter()
        .enumerate()
        .map(|(i, t)| (t.clone(), i))
        .collect();

    debug!(rows = dates.len(), tickers = tickers.len(), "aligned price panel");

    Ok(PricePanel {
        dates,
        tickers,
        columns,
        column_index,
    })
}

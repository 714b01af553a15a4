#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use pairtrader::domain::error::PairsError;
use pairtrader::domain::price::{DateRange, PriceHistory, PricePoint};
use pairtrader::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_history(mut self, history: PriceHistory) -> Self {
        self.data.insert(history.ticker, history.points);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, PairsError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(PairsError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(ticker)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.date >= start_date && p.date <= end_date)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_tickers(&self) -> Result<Vec<String>, PairsError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day(i: usize) -> NaiveDate {
    date(2020, 1, 1) + Duration::days(i as i64)
}

pub fn full_range() -> DateRange {
    DateRange::new(date(2000, 1, 1), date(2100, 1, 1))
}

pub fn make_history(ticker: &str, closes: &[f64]) -> PriceHistory {
    let points = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PricePoint::new(day(i), c))
        .collect();
    PriceHistory::new(ticker, points)
}

/// Common trend with a slow wiggle, shared by both legs and the benchmark.
pub fn market_path(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            100.0 * (1.0 + 0.0004 * t) + 3.0 * (t / 11.0).sin()
        })
        .collect()
}

/// Two legs whose ratio oscillates around 1, crossing the entry bands repeatedly.
pub fn mean_reverting_pair(n: usize) -> (Vec<f64>, Vec<f64>) {
    let market = market_path(n);
    let first = market
        .iter()
        .enumerate()
        .map(|(i, m)| m * (1.0 + 0.04 * (i as f64 / 9.0).sin() + 0.01 * (i as f64 / 2.3).cos()))
        .collect();
    let second = market
        .iter()
        .enumerate()
        .map(|(i, m)| m * (1.0 - 0.04 * (i as f64 / 9.0).sin()))
        .collect();
    (first, second)
}

pub fn pair_histories(n: usize) -> Vec<PriceHistory> {
    let (first, second) = mean_reverting_pair(n);
    vec![make_history("AAA", &first), make_history("BBB", &second)]
}

pub fn benchmark_history(n: usize) -> PriceHistory {
    make_history("SPY", &market_path(n))
}

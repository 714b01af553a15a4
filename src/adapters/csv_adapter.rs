//! CSV file price adapter.
//!
//! One file per ticker, `<base>/<TICKER>.csv`, with a header row. The first
//! column is the date (`YYYY-MM-DD`); the close is read from an `adj close`
//! column when present, else `close`, else the second column.

use crate::domain::error::PairsError;
use crate::domain::price::PricePoint;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }
}

fn close_column(headers: &csv::StringRecord) -> usize {
    let normalized: Vec<String> = headers
        .iter()
        .map(|h| h.trim().to_lowercase().replace('_', " "))
        .collect();
    normalized
        .iter()
        .position(|h| h == "adj close")
        .or_else(|| normalized.iter().position(|h| h == "close"))
        .unwrap_or(1)
}

impl DataPort for CsvAdapter {
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, PairsError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path).map_err(|e| PairsError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| PairsError::DataSource {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let close_idx = close_column(headers);

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| PairsError::DataSource {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(0).ok_or_else(|| PairsError::DataSource {
                reason: "missing date column".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
                PairsError::DataSource {
                    reason: format!("invalid date {:?}: {}", date_str, e),
                }
            })?;

            if date < start_date || date > end_date {
                continue;
            }

            let raw = record.get(close_idx).ok_or_else(|| PairsError::DataSource {
                reason: format!("missing close column on {}", date),
            })?;
            // blank closes are gaps in the series, not parse errors
            if raw.trim().is_empty() {
                continue;
            }
            let close: f64 = raw.trim().parse().map_err(|e| PairsError::DataSource {
                reason: format!("invalid close value {:?}: {}", raw, e),
            })?;

            points.push(PricePoint::new(date, close));
        }

        points.sort_by_key(|p| p.date);
        debug!(ticker, rows = points.len(), path = %path.display(), "loaded closes");
        Ok(points)
    }

    fn list_tickers(&self) -> Result<Vec<String>, PairsError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| PairsError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PairsError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(ticker) = name.strip_suffix(".csv") {
                tickers.push(ticker.to_string());
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}

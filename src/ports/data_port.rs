//! Price retrieval port trait.
//!
//! Implementations own fetching, caching and retries; the engine only sees the
//! returned histories.

use crate::domain::error::PairsError;
use crate::domain::price::PricePoint;
use chrono::NaiveDate;

pub trait DataPort {
    /// Close prices for `ticker` between `start_date` and `end_date` inclusive,
    /// sorted by date. An unknown ticker may yield an empty vector or an error.
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, PairsError>;

    fn list_tickers(&self) -> Result<Vec<String>, PairsError>;
}

//! Configuration validation.
//!
//! Validates every configured key before a run so that a bad value surfaces as
//! a named config error instead of silently falling back to a default.

use crate::domain::error::PairsError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), PairsError> {
    validate_pair(config)?;
    validate_parameters(config)
}

/// Everything except the `[pair]` tickers, which the command line may supply instead.
pub fn validate_parameters(config: &dyn ConfigPort) -> Result<(), PairsError> {
    validate_dates(config)?;
    validate_min_history(config)?;
    validate_signal(config)?;
    validate_costs(config)?;
    Ok(())
}

fn validate_pair(config: &dyn ConfigPort) -> Result<(), PairsError> {
    let ticker1 = config
        .get_string("pair", "ticker1")
        .ok_or_else(|| PairsError::missing("pair", "ticker1"))?;
    let ticker2 = config
        .get_string("pair", "ticker2")
        .ok_or_else(|| PairsError::missing("pair", "ticker2"))?;

    if ticker1.trim().eq_ignore_ascii_case(ticker2.trim()) {
        return Err(PairsError::invalid(
            "pair",
            "ticker2",
            "tickers must be different",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), PairsError> {
    let start_date = parse_date(
        config.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(
        config.get_string("backtest", "end_date").as_deref(),
        "end_date",
    )?;

    if start_date >= end_date {
        return Err(PairsError::invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, PairsError> {
    match value {
        None => Err(PairsError::missing("backtest", field)),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            PairsError::invalid(
                "backtest",
                field,
                format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

fn validate_min_history(config: &dyn ConfigPort) -> Result<(), PairsError> {
    if let Some(value) = parse_number::<i64>(config, "backtest", "min_history")?
        && value < 2
    {
        return Err(PairsError::invalid(
            "backtest",
            "min_history",
            "min_history must be at least 2",
        ));
    }
    Ok(())
}

fn validate_signal(config: &dyn ConfigPort) -> Result<(), PairsError> {
    if let Some(window) = parse_number::<i64>(config, "signal", "rolling_window")?
        && window < 2
    {
        return Err(PairsError::invalid(
            "signal",
            "rolling_window",
            "rolling_window must be at least 2",
        ));
    }

    let entry = parse_number::<f64>(config, "signal", "entry_threshold")?;
    if let Some(entry) = entry
        && !(entry.is_finite() && entry > 0.0)
    {
        return Err(PairsError::invalid(
            "signal",
            "entry_threshold",
            "entry_threshold must be positive",
        ));
    }

    let exit = parse_number::<f64>(config, "signal", "exit_threshold")?;
    if let Some(exit) = exit
        && !(exit.is_finite() && exit >= 0.0)
    {
        return Err(PairsError::invalid(
            "signal",
            "exit_threshold",
            "exit_threshold must be non-negative",
        ));
    }

    let entry = entry.unwrap_or(crate::domain::position::DEFAULT_ENTRY_THRESHOLD);
    let exit = exit.unwrap_or(crate::domain::position::DEFAULT_EXIT_THRESHOLD);
    if exit >= entry {
        return Err(PairsError::invalid(
            "signal",
            "exit_threshold",
            "exit_threshold must be below entry_threshold",
        ));
    }
    Ok(())
}

fn validate_costs(config: &dyn ConfigPort) -> Result<(), PairsError> {
    if let Some(bps) = parse_number::<f64>(config, "costs", "transaction_cost_bps")?
        && !(bps.is_finite() && bps >= 0.0)
    {
        return Err(PairsError::invalid(
            "costs",
            "transaction_cost_bps",
            "transaction_cost_bps must be non-negative",
        ));
    }
    Ok(())
}

/// `Ok(None)` when absent, an invalid-value error when present but unparseable.
fn parse_number<T: std::str::FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, PairsError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| PairsError::invalid(section, key, format!("{raw:?} is not a number"))),
    }
}

//! Core domain types and the backtest engine.

pub mod price;
pub mod panel;
pub mod signal;
pub mod position;
pub mod backtest;
pub mod metrics;
pub mod strategy;
pub mod config_validation;
pub mod error;

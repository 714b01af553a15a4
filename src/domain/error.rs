//! Domain error types.

/// Top-level error type for pairtrader.
///
/// The first five variants are the named failures of the backtest engine; the
/// rest come from the configuration and data-source collaborators around it.
#[derive(Debug, thiserror::Error)]
pub enum PairsError {
    #[error("No data returned ({reason}). Please check tickers and date range.")]
    DataUnavailable { reason: String },

    #[error("Insufficient data: only {rows} days. Need at least {minimum}.")]
    InsufficientHistory { rows: usize, minimum: usize },

    #[error("Invalid price ratio detected: {reason}")]
    InvalidPriceRatio { reason: String },

    #[error("No valid returns generated")]
    EmptyReturnSeries,

    #[error("Insufficient data for annualization")]
    ZeroHorizon,

    #[error("ticker {ticker} not found in price panel")]
    MissingTicker { ticker: String },

    #[error("weight series has {actual} entries, price panel has {expected}")]
    MisalignedSeries { expected: usize, actual: usize },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PairsError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        PairsError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        PairsError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&PairsError> for std::process::ExitCode {
    fn from(err: &PairsError) -> Self {
        let code: u8 = match err {
            PairsError::Io(_) => 1,
            PairsError::ConfigParse { .. }
            | PairsError::ConfigMissing { .. }
            | PairsError::ConfigInvalid { .. } => 2,
            PairsError::DataSource { .. } => 3,
            PairsError::DataUnavailable { .. } | PairsError::InsufficientHistory { .. } => 5,
            PairsError::InvalidPriceRatio { .. }
            | PairsError::MissingTicker { .. }
            | PairsError::MisalignedSeries { .. }
            | PairsError::EmptyReturnSeries
            | PairsError::ZeroHorizon => 6,
        };
        std::process::ExitCode::from(code)
    }
}

//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for trendfolio.
#[derive(Debug, thiserror::Error)]
pub enum TrendfolioError {
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

    #[error("price data error in {file}: {reason}")]
    PriceData { file: String, reason: String },

    #[error("price table has no column {column}")]
    MissingColumn { column: String },

    #[error("price dates not strictly increasing at {date}")]
    UnorderedDates { date: NaiveDate },

    #[error("insufficient price history: have {rows} rows, need {minimum}")]
    InsufficientHistory { rows: usize, minimum: usize },

    #[error("portfolio value {value} is not positive on {date}")]
    NonPositiveEquity { date: NaiveDate, value: f64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TrendfolioError> for std::process::ExitCode {
    fn from(err: &TrendfolioError) -> Self {
        let code: u8 = match err {
            TrendfolioError::Io(_) => 1,
            TrendfolioError::ConfigParse { .. }
            | TrendfolioError::ConfigMissing { .. }
            | TrendfolioError::ConfigInvalid { .. } => 2,
            TrendfolioError::PriceData { .. }
            | TrendfolioError::MissingColumn { .. }
            | TrendfolioError::UnorderedDates { .. }
            | TrendfolioError::InsufficientHistory { .. } => 3,
            TrendfolioError::NonPositiveEquity { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

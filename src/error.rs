// src/error.rs
use thiserror::Error;

/// Failures of the price series loader. Any of these is fatal for the
/// instrument being loaded.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The source answered but had no rows for the request.
    #[error("no price data available for {ticker}")]
    NoData { ticker: String },

    #[error("price request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned an error payload or a body we could not use.
    #[error("price provider error for {ticker}: {message}")]
    Provider { ticker: String, message: String },

    #[error("invalid history request: {0}")]
    InvalidRequest(String),

    #[error("failed to read price file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse price file: {0}")]
    Csv(#[from] csv::Error),
}

impl LoaderError {
    pub fn no_data(ticker: &str) -> Self {
        LoaderError::NoData {
            ticker: ticker.to_string(),
        }
    }

    pub fn provider(ticker: &str, message: impl Into<String>) -> Self {
        LoaderError::Provider {
            ticker: ticker.to_string(),
            message: message.into(),
        }
    }
}

/// Failure of a single indicator step. The orchestrator contains these and
/// keeps going with the remaining indicators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("{indicator}: needs at least {required} rows, got {available}")]
    InsufficientData {
        indicator: &'static str,
        required: usize,
        available: usize,
    },

    #[error("{indicator}: invalid parameter: {reason}")]
    InvalidParameter {
        indicator: &'static str,
        reason: String,
    },

    #[error("{indicator}: input columns have different lengths")]
    LengthMismatch { indicator: &'static str },
}

impl IndicatorError {
    pub fn indicator(&self) -> &'static str {
        match self {
            IndicatorError::InsufficientData { indicator, .. }
            | IndicatorError::InvalidParameter { indicator, .. }
            | IndicatorError::LengthMismatch { indicator } => indicator,
        }
    }
}

pub type IndicatorResult<T> = std::result::Result<T, IndicatorError>;

use crate::error::LoaderError;
use crate::loader::{HistorySelector, PriceSource, RawPriceBar};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Offline price source reading `<dir>/<ticker>.csv` history exports
pub struct CsvPriceSource {
    dir: PathBuf,
}

/// Row layout of a history export. Empty or unparsable cells are missing values.
#[derive(Debug, Deserialize)]
struct CsvPriceRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Open", default, deserialize_with = "csv::invalid_option")]
    open: Option<f64>,
    #[serde(rename = "High", default, deserialize_with = "csv::invalid_option")]
    high: Option<f64>,
    #[serde(rename = "Low", default, deserialize_with = "csv::invalid_option")]
    low: Option<f64>,
    #[serde(rename = "Close", default, deserialize_with = "csv::invalid_option")]
    close: Option<f64>,
    #[serde(rename = "Volume", default, deserialize_with = "csv::invalid_option")]
    volume: Option<f64>,
    #[serde(rename = "Dividends", default, deserialize_with = "csv::invalid_option")]
    dividends: Option<f64>,
    #[serde(rename = "Stock Splits", default, deserialize_with = "csv::invalid_option")]
    stock_splits: Option<f64>,
}

impl CsvPriceSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", ticker))
    }

    fn read_rows(path: &Path, ticker: &str) -> Result<Vec<RawPriceBar>, LoaderError> {
        let mut reader = match csv::Reader::from_path(path) {
            Ok(reader) => reader,
            Err(e) => {
                if let csv::ErrorKind::Io(io) = e.kind() {
                    if io.kind() == std::io::ErrorKind::NotFound {
                        return Err(LoaderError::no_data(ticker));
                    }
                }
                return Err(e.into());
            }
        };

        let mut bars = Vec::new();
        for row in reader.deserialize::<CsvPriceRow>() {
            let row = row?;
            let date = parse_date(&row.date)
                .ok_or_else(|| LoaderError::provider(ticker, format!("invalid date '{}'", row.date)))?;

            bars.push(RawPriceBar {
                date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume.filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64),
                dividends: row.dividends,
                split_ratio: row.stock_splits,
            });
        }

        Ok(bars)
    }
}

// Exports carry either a plain date or a full timestamp with offset;
// the calendar date is the first ten characters either way
fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    value
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

#[async_trait]
impl PriceSource for CsvPriceSource {
    fn name(&self) -> &str {
        "csv"
    }

    #[instrument(skip(self))]
    async fn fetch_history(
        &self,
        ticker: &str,
        selector: &HistorySelector,
    ) -> Result<Vec<RawPriceBar>, LoaderError> {
        let path = self.path_for(ticker);
        let owned_ticker = ticker.to_string();

        let bars = tokio::task::spawn_blocking(move || Self::read_rows(&path, &owned_ticker))
            .await
            .map_err(|e| LoaderError::provider(ticker, format!("reader task failed: {}", e)))??;

        if bars.is_empty() {
            return Err(LoaderError::no_data(ticker));
        }

        let selected = selector.select(bars);

        debug!(rows = selected.len(), "Selected rows from price file");
        Ok(selected)
    }
}

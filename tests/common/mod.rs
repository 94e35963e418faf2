use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use stock_indicator_engine::database::models::PriceBar;
use stock_indicator_engine::error::LoaderError;
use stock_indicator_engine::loader::{HistorySelector, PriceSource, RawPriceBar};

/// Price feed backed by a map of ticker to rows
#[derive(Default)]
pub struct MemorySource {
    pub bars: HashMap<String, Vec<RawPriceBar>>,
}

impl MemorySource {
    pub fn with(mut self, ticker: &str, bars: Vec<PriceBar>) -> Self {
        self.bars
            .insert(ticker.to_string(), bars.into_iter().map(RawPriceBar::complete).collect());
        self
    }
}

#[async_trait]
impl PriceSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_history(
        &self,
        ticker: &str,
        _selector: &HistorySelector,
    ) -> Result<Vec<RawPriceBar>, LoaderError> {
        Ok(self.bars.get(ticker).cloned().unwrap_or_default())
    }
}

/// Closes 100, 101, ... with high = close + 1, low = close - 1 and
/// volume 1000
pub fn rising_bars(n: usize) -> Vec<PriceBar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + i as f64;
            PriceBar {
                date: start + Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000,
                dividends: 0.0,
                split_ratio: 0.0,
            }
        })
        .collect()
}

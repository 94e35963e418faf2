use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day of raw market data for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub dividends: f64,
    pub split_ratio: f64,
}

/// Columnar view of a price history, oldest row first.
///
/// Every column has the same length; the loader guarantees dates are strictly
/// increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub ticker: String,
    pub date: Vec<NaiveDate>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<u64>,
    pub dividends: Vec<f64>,
    pub split_ratio: Vec<f64>,
}

impl PriceSeries {
    pub fn new(ticker: String) -> Self {
        Self {
            ticker,
            date: Vec::new(),
            open: Vec::new(),
            high: Vec::new(),
            low: Vec::new(),
            close: Vec::new(),
            volume: Vec::new(),
            dividends: Vec::new(),
            split_ratio: Vec::new(),
        }
    }

    pub fn from_bars(ticker: String, bars: Vec<PriceBar>) -> Self {
        let mut series = Self::new(ticker);
        series.date.reserve(bars.len());

        for bar in bars {
            series.push(bar);
        }

        series
    }

    pub fn push(&mut self, bar: PriceBar) {
        self.date.push(bar.date);
        self.open.push(bar.open);
        self.high.push(bar.high);
        self.low.push(bar.low);
        self.close.push(bar.close);
        self.volume.push(bar.volume);
        self.dividends.push(bar.dividends);
        self.split_ratio.push(bar.split_ratio);
    }

    pub fn len(&self) -> usize {
        self.date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_empty()
    }

    /// All columns have the same number of rows
    pub fn is_aligned(&self) -> bool {
        let n = self.date.len();
        [
            self.open.len(),
            self.high.len(),
            self.low.len(),
            self.close.len(),
            self.volume.len(),
            self.dividends.len(),
            self.split_ratio.len(),
        ]
        .iter()
        .all(|len| *len == n)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.date.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.date.last().copied()
    }
}

/// One output row of the indicator pipeline.
///
/// Field order is the published column order. Indicator columns are `None`
/// when that indicator's step failed for the whole run; warm-up rows of a
/// computed indicator carry `Some(0.0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRow {
    pub stock_code: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Open")]
    pub open: f64,
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Volume")]
    pub volume: u64,
    #[serde(rename = "Dividends")]
    pub dividends: f64,
    #[serde(rename = "Stock_Splits")]
    pub stock_splits: f64,
    #[serde(rename = "SMA_5")]
    pub sma_5: Option<f64>,
    #[serde(rename = "SMA_20")]
    pub sma_20: Option<f64>,
    #[serde(rename = "EMA_12")]
    pub ema_12: Option<f64>,
    #[serde(rename = "EMA_26")]
    pub ema_26: Option<f64>,
    #[serde(rename = "MACD")]
    pub macd: Option<f64>,
    #[serde(rename = "MACD_Signal")]
    pub macd_signal: Option<f64>,
    #[serde(rename = "MACD_Hist")]
    pub macd_hist: Option<f64>,
    #[serde(rename = "Bollinger_Mid")]
    pub bollinger_mid: Option<f64>,
    #[serde(rename = "Bollinger_Upper")]
    pub bollinger_upper: Option<f64>,
    #[serde(rename = "Bollinger_Lower")]
    pub bollinger_lower: Option<f64>,
    #[serde(rename = "RSI")]
    pub rsi: Option<f64>,
    #[serde(rename = "%K")]
    pub stoch_k: Option<f64>,
    #[serde(rename = "%D")]
    pub stoch_d: Option<f64>,
    #[serde(rename = "ADX")]
    pub adx: Option<f64>,
    #[serde(rename = "+DI")]
    pub plus_di: Option<f64>,
    #[serde(rename = "-DI")]
    pub minus_di: Option<f64>,
    #[serde(rename = "ATR")]
    pub atr: Option<f64>,
    #[serde(rename = "OBV")]
    pub obv: Option<f64>,
}

impl AnalysisRow {
    /// Key used to tell stored rows apart.
    pub fn key(&self) -> (String, String) {
        (self.stock_code.clone(), self.date.clone())
    }
}

use crate::error::LoaderError;
use crate::loader::{HistorySelector, PriceSource, RawPriceBar};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

// Yahoo rejects requests without a browser-like agent
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Daily bars from the Yahoo Finance chart endpoint
pub struct YahooPriceSource {
    client: Client,
    base_url: String,
    auto_adjust: bool,
}

impl YahooPriceSource {
    pub fn new(base_url: &str, timeout_secs: u64, auto_adjust: bool) -> Result<Self, LoaderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auto_adjust,
        })
    }

    fn query_params(selector: &HistorySelector) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("interval", "1d".to_string()),
            ("events", "div,split".to_string()),
            ("includeAdjustedClose", "true".to_string()),
        ];

        match selector {
            HistorySelector::Period(period) => params.push(("range", period.as_str().to_string())),
            HistorySelector::Since(start) => {
                let period1 = start.and_hms_opt(0, 0, 0).map_or(0, |dt| dt.and_utc().timestamp());
                params.push(("period1", period1.to_string()));
                params.push(("period2", Utc::now().timestamp().to_string()));
            }
        }

        params
    }
}

#[async_trait]
impl PriceSource for YahooPriceSource {
    fn name(&self) -> &str {
        "yahoo"
    }

    #[instrument(skip(self))]
    async fn fetch_history(
        &self,
        ticker: &str,
        selector: &HistorySelector,
    ) -> Result<Vec<RawPriceBar>, LoaderError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        let response = self
            .client
            .get(&url)
            .query(&Self::query_params(selector))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(%status, bytes = body.len(), "Chart response received");

        let envelope: ChartEnvelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(LoaderError::provider(ticker, format!("unreadable chart payload: {}", e)));
            }
            Err(_) => {
                return Err(LoaderError::provider(ticker, format!("HTTP {}: {}", status, body)));
            }
        };

        parse_chart(ticker, envelope, self.auto_adjust)
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    events: Option<ChartEvents>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Default, Deserialize)]
struct ChartEvents {
    #[serde(default)]
    dividends: HashMap<String, DividendEvent>,
    #[serde(default)]
    splits: HashMap<String, SplitEvent>,
}

#[derive(Debug, Deserialize)]
struct DividendEvent {
    amount: f64,
    date: i64,
}

#[derive(Debug, Deserialize)]
struct SplitEvent {
    date: i64,
    numerator: f64,
    denominator: f64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

// Exchange-local calendar date of a UNIX timestamp
fn local_date(timestamp: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp + gmtoffset, 0).map(|dt| dt.date_naive())
}

fn at<T: Copy>(values: &[Option<T>], i: usize) -> Option<T> {
    values.get(i).copied().flatten()
}

fn parse_chart(ticker: &str, envelope: ChartEnvelope, auto_adjust: bool) -> Result<Vec<RawPriceBar>, LoaderError> {
    if let Some(error) = envelope.chart.error {
        let message = error.description.unwrap_or_else(|| error.code.clone());
        return match error.code.as_str() {
            "Not Found" => Err(LoaderError::no_data(ticker)),
            _ => Err(LoaderError::provider(ticker, message)),
        };
    }

    let result = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| LoaderError::no_data(ticker))?;

    if result.timestamp.is_empty() {
        return Err(LoaderError::no_data(ticker));
    }

    let offset = result.meta.gmtoffset;
    let events = result.events.unwrap_or_default();

    let dividends: HashMap<NaiveDate, f64> = events
        .dividends
        .values()
        .filter_map(|d| local_date(d.date, offset).map(|date| (date, d.amount)))
        .collect();

    let splits: HashMap<NaiveDate, f64> = events
        .splits
        .values()
        .filter(|s| s.denominator != 0.0)
        .filter_map(|s| local_date(s.date, offset).map(|date| (date, s.numerator / s.denominator)))
        .collect();

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|a| a.adjclose)
        .unwrap_or_default();

    let mut bars = Vec::with_capacity(result.timestamp.len());

    for (i, ts) in result.timestamp.iter().enumerate() {
        let date = local_date(*ts, offset)
            .ok_or_else(|| LoaderError::provider(ticker, format!("timestamp {} out of range", ts)))?;

        let close = at(&quote.close, i);

        // Scale OHLC by adjclose / close so history is continuous across
        // dividends and splits
        let ratio = match (auto_adjust, at(&adjclose, i), close) {
            (true, Some(adj), Some(c)) if c != 0.0 => adj / c,
            _ => 1.0,
        };
        let adjust = |v: Option<f64>| v.map(|v| v * ratio);

        bars.push(RawPriceBar {
            date,
            open: adjust(at(&quote.open, i)),
            high: adjust(at(&quote.high, i)),
            low: adjust(at(&quote.low, i)),
            close: adjust(close),
            volume: at(&quote.volume, i).filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64),
            dividends: Some(dividends.get(&date).copied().unwrap_or(0.0)),
            split_ratio: Some(splits.get(&date).copied().unwrap_or(0.0)),
        });
    }

    Ok(bars)
}

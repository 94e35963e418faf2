//! Price series loading.
//!
//! A [`PriceSource`] fetches raw daily rows for one ticker; [`load_price_series`]
//! turns them into a clean, strictly date-ordered [`PriceSeries`] or fails with
//! a [`LoaderError`]. The source is passed in explicitly so the indicator
//! pipeline can run against any feed, including in-memory ones in tests.

pub mod csv_source;
pub mod yahoo;

use crate::database::models::{PriceBar, PriceSeries};
use crate::error::LoaderError;
use async_trait::async_trait;
use chrono::{Datelike, Duration, Months, NaiveDate};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

pub use self::csv_source::CsvPriceSource;
pub use self::yahoo::YahooPriceSource;

/// Lookback periods understood by the price feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryPeriod {
    OneDay,
    FiveDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    TenYears,
    YearToDate,
    Max,
}

impl HistoryPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryPeriod::OneDay => "1d",
            HistoryPeriod::FiveDays => "5d",
            HistoryPeriod::OneMonth => "1mo",
            HistoryPeriod::ThreeMonths => "3mo",
            HistoryPeriod::SixMonths => "6mo",
            HistoryPeriod::OneYear => "1y",
            HistoryPeriod::TwoYears => "2y",
            HistoryPeriod::FiveYears => "5y",
            HistoryPeriod::TenYears => "10y",
            HistoryPeriod::YearToDate => "ytd",
            HistoryPeriod::Max => "max",
        }
    }

    /// Day-based periods count trading sessions, not calendar days
    pub fn trading_days(&self) -> Option<usize> {
        match self {
            HistoryPeriod::OneDay => Some(1),
            HistoryPeriod::FiveDays => Some(5),
            _ => None,
        }
    }

    /// First calendar date covered by a calendar period when the history
    /// ends on `last`. `None` means no lower bound; day-based periods have
    /// none here and are counted in rows through `trading_days`.
    pub fn window_start(&self, last: NaiveDate) -> Option<NaiveDate> {
        let months_back = |m: u32| last.checked_sub_months(Months::new(m)).map(|d| d + Duration::days(1));

        match self {
            HistoryPeriod::OneDay | HistoryPeriod::FiveDays => None,
            HistoryPeriod::OneMonth => months_back(1),
            HistoryPeriod::ThreeMonths => months_back(3),
            HistoryPeriod::SixMonths => months_back(6),
            HistoryPeriod::OneYear => months_back(12),
            HistoryPeriod::TwoYears => months_back(24),
            HistoryPeriod::FiveYears => months_back(60),
            HistoryPeriod::TenYears => months_back(120),
            HistoryPeriod::YearToDate => NaiveDate::from_ymd_opt(last.year(), 1, 1),
            HistoryPeriod::Max => None,
        }
    }
}

impl FromStr for HistoryPeriod {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1d" => Ok(HistoryPeriod::OneDay),
            "5d" => Ok(HistoryPeriod::FiveDays),
            "1mo" => Ok(HistoryPeriod::OneMonth),
            "3mo" => Ok(HistoryPeriod::ThreeMonths),
            "6mo" => Ok(HistoryPeriod::SixMonths),
            "1y" => Ok(HistoryPeriod::OneYear),
            "2y" => Ok(HistoryPeriod::TwoYears),
            "5y" => Ok(HistoryPeriod::FiveYears),
            "10y" => Ok(HistoryPeriod::TenYears),
            "ytd" => Ok(HistoryPeriod::YearToDate),
            "max" => Ok(HistoryPeriod::Max),
            other => Err(LoaderError::InvalidRequest(format!(
                "unknown period '{}', expected one of 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max",
                other
            ))),
        }
    }
}

impl fmt::Display for HistoryPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which slice of history to load: a lookback period or everything from a
/// start date on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySelector {
    Period(HistoryPeriod),
    Since(NaiveDate),
}

impl HistorySelector {
    pub fn from_options(period: Option<&str>, start_date: Option<NaiveDate>) -> Result<Self, LoaderError> {
        match (period, start_date) {
            (Some(_), Some(_)) => Err(LoaderError::InvalidRequest(
                "period and start date are mutually exclusive".to_string(),
            )),
            (None, Some(date)) => Ok(HistorySelector::Since(date)),
            (Some(period), None) => Ok(HistorySelector::Period(period.parse()?)),
            (None, None) => Ok(HistorySelector::default()),
        }
    }

    /// First date kept from a history with these trading `dates`
    pub fn cutoff(&self, dates: &[NaiveDate]) -> Option<NaiveDate> {
        match self {
            HistorySelector::Since(start) => Some(*start),
            HistorySelector::Period(period) => {
                let mut sessions = dates.to_vec();
                sessions.sort_unstable();
                sessions.dedup();
                let last = *sessions.last()?;

                match period.trading_days() {
                    Some(n) => sessions.get(sessions.len().saturating_sub(n)).copied(),
                    None => period.window_start(last),
                }
            }
        }
    }

    /// Keep the rows of `bars` that fall in this selection
    pub fn select(&self, bars: Vec<RawPriceBar>) -> Vec<RawPriceBar> {
        let dates: Vec<NaiveDate> = bars.iter().map(|bar| bar.date).collect();
        match self.cutoff(&dates) {
            Some(start) => bars.into_iter().filter(|bar| bar.date >= start).collect(),
            None => bars,
        }
    }
}

impl Default for HistorySelector {
    fn default() -> Self {
        HistorySelector::Period(HistoryPeriod::Max)
    }
}

impl fmt::Display for HistorySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistorySelector::Period(period) => write!(f, "period={}", period),
            HistorySelector::Since(date) => write!(f, "start={}", date.format("%Y-%m-%d")),
        }
    }
}

/// A row as delivered by a feed. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPriceBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
    pub dividends: Option<f64>,
    pub split_ratio: Option<f64>,
}

impl RawPriceBar {
    pub fn complete(bar: PriceBar) -> Self {
        Self {
            date: bar.date,
            open: Some(bar.open),
            high: Some(bar.high),
            low: Some(bar.low),
            close: Some(bar.close),
            volume: Some(bar.volume),
            dividends: Some(bar.dividends),
            split_ratio: Some(bar.split_ratio),
        }
    }

    fn is_complete(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.dividends, self.split_ratio]
            .iter()
            .all(|v| v.map_or(false, f64::is_finite))
            && self.volume.is_some()
    }

    // Fill each missing field from `prev`; None if a price or volume is
    // still missing afterwards
    fn fill_from(&self, prev: Option<&PriceBar>) -> Option<PriceBar> {
        let price = |value: Option<f64>, fallback: fn(&PriceBar) -> f64| {
            value.filter(|v| v.is_finite()).or_else(|| prev.map(fallback))
        };

        Some(PriceBar {
            date: self.date,
            open: price(self.open, |b| b.open)?,
            high: price(self.high, |b| b.high)?,
            low: price(self.low, |b| b.low)?,
            close: price(self.close, |b| b.close)?,
            volume: self.volume.or_else(|| prev.map(|b| b.volume))?,
            dividends: price(self.dividends, |b| b.dividends).unwrap_or(0.0),
            split_ratio: price(self.split_ratio, |b| b.split_ratio).unwrap_or(0.0),
        })
    }
}

/// External source of daily price history
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn fetch_history(
        &self,
        ticker: &str,
        selector: &HistorySelector,
    ) -> Result<Vec<RawPriceBar>, LoaderError>;
}

/// Fetch and clean the price history of one ticker
#[instrument(skip(source), fields(source = source.name()))]
pub async fn load_price_series(
    source: &dyn PriceSource,
    ticker: &str,
    selector: &HistorySelector,
) -> Result<PriceSeries, LoaderError> {
    if ticker.trim().is_empty() {
        return Err(LoaderError::InvalidRequest("ticker must not be empty".to_string()));
    }

    let raw = source.fetch_history(ticker, selector).await?;
    debug!(rows = raw.len(), "Fetched raw price rows");

    let series = clean_bars(ticker, raw)?;
    info!(
        rows = series.len(),
        first = ?series.first_date(),
        last = ?series.last_date(),
        "Loaded price series"
    );

    Ok(series)
}

/// Sort by date, keep the last row of a duplicated date, forward-fill
/// missing fields and drop leading rows that cannot be filled.
pub fn clean_bars(ticker: &str, mut raw: Vec<RawPriceBar>) -> Result<PriceSeries, LoaderError> {
    if raw.is_empty() {
        return Err(LoaderError::no_data(ticker));
    }

    // stable sort keeps feed order within a date
    raw.sort_by_key(|bar| bar.date);

    let mut deduped: Vec<RawPriceBar> = Vec::with_capacity(raw.len());
    for bar in raw {
        match deduped.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => deduped.push(bar),
        }
    }

    let mut series = PriceSeries::new(ticker.to_string());
    let mut prev: Option<PriceBar> = None;
    let mut dropped = 0usize;
    let mut filled = 0usize;

    for raw_bar in &deduped {
        match raw_bar.fill_from(prev.as_ref()) {
            Some(bar) => {
                if !raw_bar.is_complete() {
                    filled += 1;
                }
                series.push(bar.clone());
                prev = Some(bar);
            }
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(ticker, rows = dropped, "Dropped leading rows with missing prices");
    }
    if filled > 0 {
        debug!(ticker, rows = filled, "Forward-filled rows with missing fields");
    }

    if series.is_empty() {
        return Err(LoaderError::no_data(ticker));
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn raw(d: NaiveDate, close: Option<f64>) -> RawPriceBar {
        RawPriceBar {
            date: d,
            open: close,
            high: close.map(|c| c + 1.0),
            low: close.map(|c| c - 1.0),
            close,
            volume: Some(100),
            dividends: Some(0.0),
            split_ratio: Some(0.0),
        }
    }

    #[test]
    fn parses_period_vocabulary() {
        for p in ["1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max"] {
            let period: HistoryPeriod = p.parse().unwrap();
            assert_eq!(period.as_str(), p);
        }
        assert!(matches!("2w".parse::<HistoryPeriod>(), Err(LoaderError::InvalidRequest(_))));
    }

    #[test]
    fn selector_options_are_exclusive() {
        assert!(HistorySelector::from_options(Some("1y"), Some(date(2024, 1, 1))).is_err());
        assert_eq!(
            HistorySelector::from_options(None, Some(date(2024, 1, 1))).unwrap(),
            HistorySelector::Since(date(2024, 1, 1))
        );
        assert_eq!(
            HistorySelector::from_options(None, None).unwrap(),
            HistorySelector::Period(HistoryPeriod::Max)
        );
    }

    #[test]
    fn period_window_is_relative_to_last_date() {
        let last = date(2024, 5, 15);
        assert_eq!(HistoryPeriod::OneMonth.window_start(last), Some(date(2024, 4, 16)));
        assert_eq!(HistoryPeriod::YearToDate.window_start(last), Some(date(2024, 1, 1)));
        assert_eq!(HistoryPeriod::Max.window_start(last), None);

        let selector = HistorySelector::Period(HistoryPeriod::OneMonth);
        assert_eq!(selector.cutoff(&[date(2024, 1, 2), last]), Some(date(2024, 4, 16)));
        assert_eq!(HistorySelector::Since(date(2024, 3, 1)).cutoff(&[last]), Some(date(2024, 3, 1)));
    }

    #[test]
    fn day_periods_count_trading_sessions() {
        // Mon 2024-05-06 .. Wed 2024-05-15, no weekend rows
        let sessions: Vec<NaiveDate> = [6, 7, 8, 9, 10, 13, 14, 15].iter().map(|d| date(2024, 5, *d)).collect();
        let bars: Vec<RawPriceBar> = sessions.iter().map(|d| raw(*d, Some(10.0))).collect();

        let five = HistorySelector::Period(HistoryPeriod::FiveDays).select(bars.clone());
        assert_eq!(five.len(), 5);
        assert_eq!(five[0].date, date(2024, 5, 9));

        let one = HistorySelector::Period(HistoryPeriod::OneDay).select(bars.clone());
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].date, date(2024, 5, 15));

        // fewer sessions than asked for keeps them all
        assert_eq!(HistorySelector::Period(HistoryPeriod::FiveDays).select(bars[..3].to_vec()).len(), 3);
        assert!(HistorySelector::Period(HistoryPeriod::FiveDays).select(Vec::new()).is_empty());
    }

    #[test]
    fn cleaning_sorts_and_forward_fills() {
        let bars = vec![
            raw(date(2024, 1, 4), None),
            raw(date(2024, 1, 2), Some(10.0)),
            raw(date(2024, 1, 3), Some(11.0)),
        ];
        let series = clean_bars("AAA", bars).unwrap();

        assert_eq!(series.date, vec![date(2024, 1, 2), date(2024, 1, 3), date(2024, 1, 4)]);
        assert_eq!(series.close, vec![10.0, 11.0, 11.0]);
        assert_eq!(series.high[2], 12.0);
    }

    #[test]
    fn cleaning_keeps_last_duplicate_and_drops_unfillable_head() {
        let bars = vec![
            raw(date(2024, 1, 1), None),
            raw(date(2024, 1, 2), Some(10.0)),
            raw(date(2024, 1, 2), Some(12.0)),
        ];
        let series = clean_bars("AAA", bars).unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series.close, vec![12.0]);
    }

    #[test]
    fn nothing_usable_is_no_data() {
        assert!(matches!(clean_bars("AAA", vec![]), Err(LoaderError::NoData { .. })));
        assert!(matches!(
            clean_bars("AAA", vec![raw(date(2024, 1, 1), None)]),
            Err(LoaderError::NoData { .. })
        ));
    }
}

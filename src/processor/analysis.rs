use crate::database::models::{AnalysisRow, PriceSeries};
use crate::error::IndicatorError;
use crate::indicators::{IndicatorColumn, IndicatorSeries, IndicatorStep, StepOutcome};
use crate::utils::{round_to, sanitize, strip_market_suffix};
use std::collections::HashMap;

/// Augmented price table of one instrument
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub ticker: String,
    pub stock_code: String,
    pub rows: Vec<AnalysisRow>,
    /// Steps that were skipped, with the reason
    pub failures: Vec<(IndicatorStep, IndicatorError)>,
}

impl AnalysisResult {
    /// Merge the successful step columns into the price table.
    ///
    /// Warm-up rows and non-finite values become 0; every float is rounded to
    /// `decimals` places. Columns of a failed step stay `None` on every row.
    pub fn from_outcomes(candle_data: &PriceSeries, outcomes: Vec<StepOutcome>, decimals: u32) -> Self {
        let mut columns: HashMap<IndicatorColumn, IndicatorSeries> = HashMap::new();
        let mut failures = Vec::new();

        for outcome in outcomes {
            match outcome.result {
                Ok(step_columns) => columns.extend(step_columns),
                Err(e) => failures.push((outcome.step, e)),
            }
        }

        let stock_code = strip_market_suffix(&candle_data.ticker).to_string();
        let price = |v: f64| sanitize(round_to(v, decimals));
        let indicator = |column: IndicatorColumn, i: usize| {
            columns
                .get(&column)
                .map(|series| sanitize(round_to(series.get(i).unwrap_or(0.0), decimals)))
        };

        let rows = (0..candle_data.len())
            .map(|i| AnalysisRow {
                stock_code: stock_code.clone(),
                date: candle_data.date[i].format("%Y-%m-%d").to_string(),
                open: price(candle_data.open[i]),
                high: price(candle_data.high[i]),
                low: price(candle_data.low[i]),
                close: price(candle_data.close[i]),
                volume: candle_data.volume[i],
                dividends: price(candle_data.dividends[i]),
                stock_splits: price(candle_data.split_ratio[i]),
                sma_5: indicator(IndicatorColumn::Sma5, i),
                sma_20: indicator(IndicatorColumn::Sma20, i),
                ema_12: indicator(IndicatorColumn::Ema12, i),
                ema_26: indicator(IndicatorColumn::Ema26, i),
                macd: indicator(IndicatorColumn::Macd, i),
                macd_signal: indicator(IndicatorColumn::MacdSignal, i),
                macd_hist: indicator(IndicatorColumn::MacdHist, i),
                bollinger_mid: indicator(IndicatorColumn::BollingerMid, i),
                bollinger_upper: indicator(IndicatorColumn::BollingerUpper, i),
                bollinger_lower: indicator(IndicatorColumn::BollingerLower, i),
                rsi: indicator(IndicatorColumn::Rsi, i),
                stoch_k: indicator(IndicatorColumn::StochK, i),
                stoch_d: indicator(IndicatorColumn::StochD, i),
                adx: indicator(IndicatorColumn::Adx, i),
                plus_di: indicator(IndicatorColumn::PlusDi, i),
                minus_di: indicator(IndicatorColumn::MinusDi, i),
                atr: indicator(IndicatorColumn::Atr, i),
                obv: indicator(IndicatorColumn::Obv, i),
            })
            .collect();

        Self {
            ticker: candle_data.ticker.clone(),
            stock_code,
            rows,
            failures,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when at least one indicator step was skipped
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Output column names left out because their step failed
    pub fn missing_columns(&self) -> Vec<&'static str> {
        self.failures
            .iter()
            .flat_map(|(step, _)| step.columns().iter().map(|c| c.name()))
            .collect()
    }

    pub fn last_row(&self) -> Option<&AnalysisRow> {
        self.rows.last()
    }
}

use crate::database::models::PriceSeries;
use crate::error::{IndicatorError, IndicatorResult};
use crate::indicators::overlaps::OverlapCalculator;
use crate::indicators::series::IndicatorSeries;
use crate::indicators::ta::{Highest, Lowest, Next, SimpleMovingAverage};
use tracing::debug;

/// MACD line, its signal line and the histogram between them
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: IndicatorSeries,
    pub signal: IndicatorSeries,
    pub histogram: IndicatorSeries,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StochasticSeries {
    pub k: IndicatorSeries,
    pub d: IndicatorSeries,
}

pub struct OscillatorCalculator;

impl OscillatorCalculator {
    // Calculate MACD = EMA(fast) - EMA(slow), signal = EMA(MACD, signal_span)
    pub fn calculate_macd(
        values: &[f64],
        fast_span: usize,
        slow_span: usize,
        signal_span: usize,
    ) -> IndicatorResult<MacdSeries> {
        if fast_span >= slow_span {
            return Err(IndicatorError::InvalidParameter {
                indicator: "MACD",
                reason: format!("fast span {} must be less than slow span {}", fast_span, slow_span),
            });
        }

        let fast = OverlapCalculator::ema_values(values, fast_span)?;
        let slow = OverlapCalculator::ema_values(values, slow_span)?;

        let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = OverlapCalculator::ema_values(&macd, signal_span)?;
        let histogram: Vec<f64> = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();

        Ok(MacdSeries {
            macd: IndicatorSeries::defined("MACD", macd),
            signal: IndicatorSeries::defined("MACD_Signal", signal),
            histogram: IndicatorSeries::defined("MACD_Hist", histogram),
        })
    }

    // Calculate RSI from plain rolling means of gains and losses.
    // The first row has no previous close and counts as a zero change.
    pub fn calculate_rsi(values: &[f64], period: usize) -> IndicatorResult<IndicatorSeries> {
        if values.len() < period {
            return Err(IndicatorError::InsufficientData {
                indicator: "RSI",
                required: period,
                available: values.len(),
            });
        }

        let mut avg_gain = SimpleMovingAverage::new(period)?;
        let mut avg_loss = SimpleMovingAverage::new(period)?;

        let mut results = Vec::with_capacity(values.len());
        let mut no_loss_rows = 0usize;
        let mut prev: Option<f64> = None;

        for value in values {
            let change = prev.map_or(0.0, |p| value - p);
            prev = Some(*value);

            let gain = if change > 0.0 { change } else { 0.0 };
            let loss = if change < 0.0 { -change } else { 0.0 };

            let rsi = match (avg_gain.next(gain), avg_loss.next(loss)) {
                (Some(_), Some(loss)) if loss == 0.0 => {
                    // RS is infinite, RSI saturates
                    no_loss_rows += 1;
                    Some(100.0)
                }
                (Some(gain), Some(loss)) => {
                    let rs = gain / loss;
                    Some(100.0 - 100.0 / (1.0 + rs))
                }
                _ => None,
            };
            results.push(rsi);
        }

        if no_loss_rows > 0 {
            debug!(rows = no_loss_rows, "RSI: average loss was zero, resolved to 100");
        }

        Ok(IndicatorSeries::new("RSI", results))
    }

    // Calculate Stochastic %K over k_period and %D = SMA(%K, d_period)
    pub fn calculate_stochastic(
        candle_data: &PriceSeries,
        k_period: usize,
        d_period: usize,
    ) -> IndicatorResult<StochasticSeries> {
        if !candle_data.is_aligned() {
            return Err(IndicatorError::LengthMismatch { indicator: "Stochastic" });
        }

        if candle_data.close.len() < k_period {
            return Err(IndicatorError::InsufficientData {
                indicator: "Stochastic",
                required: k_period,
                available: candle_data.close.len(),
            });
        }

        let mut lowest = Lowest::new(k_period)?;
        let mut highest = Highest::new(k_period)?;
        let mut d_sma = SimpleMovingAverage::new(d_period)?;

        let mut k_values = Vec::with_capacity(candle_data.close.len());
        let mut d_values = Vec::with_capacity(candle_data.close.len());
        let mut flat_rows = 0usize;

        for i in 0..candle_data.close.len() {
            let low = lowest.next(candle_data.low[i]);
            let high = highest.next(candle_data.high[i]);

            let k = match (low, high) {
                (Some(low), Some(high)) => {
                    let range = high - low;
                    if range == 0.0 {
                        flat_rows += 1;
                        Some(0.0)
                    } else {
                        Some(100.0 * (candle_data.close[i] - low) / range)
                    }
                }
                _ => None,
            };

            let d = k.and_then(|k| d_sma.next(k));
            k_values.push(k);
            d_values.push(d);
        }

        if flat_rows > 0 {
            debug!(rows = flat_rows, "Stochastic: flat high/low range, %K set to 0");
        }

        Ok(StochasticSeries {
            k: IndicatorSeries::new("%K", k_values),
            d: IndicatorSeries::new("%D", d_values),
        })
    }
}

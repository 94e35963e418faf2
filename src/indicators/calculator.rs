use crate::database::models::PriceSeries;
use crate::error::IndicatorResult;
use crate::indicators::oscillators::OscillatorCalculator;
use crate::indicators::overlaps::OverlapCalculator;
use crate::indicators::series::IndicatorSeries;
use crate::indicators::trend::TrendCalculator;
use crate::indicators::volatility::VolatilityCalculator;
use crate::indicators::volume::VolumeCalculator;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Windows, spans and multipliers used by the indicator steps.
///
/// The SMA and EMA columns carry their window in the column name, so those
/// windows are fixed (see `IndicatorColumn::window`) and are not set here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineParams {
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_window: usize,
    pub bollinger_k: f64,
    pub rsi_period: usize,
    pub stoch_k: usize,
    pub stoch_d: usize,
    pub adx_period: usize,
    pub atr_window: usize,
    pub output_decimals: u32,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_window: 20,
            bollinger_k: 2.0,
            rsi_period: 14,
            stoch_k: 14,
            stoch_d: 3,
            adx_period: 14,
            atr_window: 14,
            output_decimals: 2,
        }
    }
}

/// Indicator columns of the published table, in column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorColumn {
    Sma5,
    Sma20,
    Ema12,
    Ema26,
    Macd,
    MacdSignal,
    MacdHist,
    BollingerMid,
    BollingerUpper,
    BollingerLower,
    Rsi,
    StochK,
    StochD,
    Adx,
    PlusDi,
    MinusDi,
    Atr,
    Obv,
}

impl IndicatorColumn {
    pub const ALL: [IndicatorColumn; 18] = [
        IndicatorColumn::Sma5,
        IndicatorColumn::Sma20,
        IndicatorColumn::Ema12,
        IndicatorColumn::Ema26,
        IndicatorColumn::Macd,
        IndicatorColumn::MacdSignal,
        IndicatorColumn::MacdHist,
        IndicatorColumn::BollingerMid,
        IndicatorColumn::BollingerUpper,
        IndicatorColumn::BollingerLower,
        IndicatorColumn::Rsi,
        IndicatorColumn::StochK,
        IndicatorColumn::StochD,
        IndicatorColumn::Adx,
        IndicatorColumn::PlusDi,
        IndicatorColumn::MinusDi,
        IndicatorColumn::Atr,
        IndicatorColumn::Obv,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            IndicatorColumn::Sma5 => "SMA_5",
            IndicatorColumn::Sma20 => "SMA_20",
            IndicatorColumn::Ema12 => "EMA_12",
            IndicatorColumn::Ema26 => "EMA_26",
            IndicatorColumn::Macd => "MACD",
            IndicatorColumn::MacdSignal => "MACD_Signal",
            IndicatorColumn::MacdHist => "MACD_Hist",
            IndicatorColumn::BollingerMid => "Bollinger_Mid",
            IndicatorColumn::BollingerUpper => "Bollinger_Upper",
            IndicatorColumn::BollingerLower => "Bollinger_Lower",
            IndicatorColumn::Rsi => "RSI",
            IndicatorColumn::StochK => "%K",
            IndicatorColumn::StochD => "%D",
            IndicatorColumn::Adx => "ADX",
            IndicatorColumn::PlusDi => "+DI",
            IndicatorColumn::MinusDi => "-DI",
            IndicatorColumn::Atr => "ATR",
            IndicatorColumn::Obv => "OBV",
        }
    }

    /// Window or span baked into a moving average column name
    pub fn window(&self) -> Option<usize> {
        match self {
            IndicatorColumn::Sma5 => Some(5),
            IndicatorColumn::Sma20 => Some(20),
            IndicatorColumn::Ema12 => Some(12),
            IndicatorColumn::Ema26 => Some(26),
            _ => None,
        }
    }
}

/// One guarded step of the pipeline. Steps run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorStep {
    MovingAverages,
    Macd,
    Bollinger,
    Rsi,
    Stochastic,
    Adx,
    Atr,
    Obv,
}

impl IndicatorStep {
    pub const ORDER: [IndicatorStep; 8] = [
        IndicatorStep::MovingAverages,
        IndicatorStep::Macd,
        IndicatorStep::Bollinger,
        IndicatorStep::Rsi,
        IndicatorStep::Stochastic,
        IndicatorStep::Adx,
        IndicatorStep::Atr,
        IndicatorStep::Obv,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            IndicatorStep::MovingAverages => "moving_averages",
            IndicatorStep::Macd => "macd",
            IndicatorStep::Bollinger => "bollinger",
            IndicatorStep::Rsi => "rsi",
            IndicatorStep::Stochastic => "stochastic",
            IndicatorStep::Adx => "adx",
            IndicatorStep::Atr => "atr",
            IndicatorStep::Obv => "obv",
        }
    }

    /// Columns this step contributes when it succeeds
    pub fn columns(&self) -> &'static [IndicatorColumn] {
        use IndicatorColumn::*;
        match self {
            IndicatorStep::MovingAverages => &[Sma5, Sma20, Ema12, Ema26],
            IndicatorStep::Macd => &[Macd, MacdSignal, MacdHist],
            IndicatorStep::Bollinger => &[BollingerMid, BollingerUpper, BollingerLower],
            IndicatorStep::Rsi => &[Rsi],
            IndicatorStep::Stochastic => &[StochK, StochD],
            IndicatorStep::Adx => &[Adx, PlusDi, MinusDi],
            IndicatorStep::Atr => &[Atr],
            IndicatorStep::Obv => &[Obv],
        }
    }
}

pub type StepColumns = Vec<(IndicatorColumn, IndicatorSeries)>;

/// Result of one step: its columns, or the reason it was skipped
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub step: IndicatorStep,
    pub result: IndicatorResult<StepColumns>,
}

pub struct IndicatorCalculator;

impl IndicatorCalculator {
    // Run every step in order. A failing step is logged and reported in its
    // outcome; it never stops the steps after it.
    pub fn calculate_all(candle_data: &PriceSeries, params: &PipelineParams) -> Vec<StepOutcome> {
        IndicatorStep::ORDER
            .iter()
            .map(|step| {
                let result = Self::calculate_step(*step, candle_data, params);

                match &result {
                    Ok(columns) => debug!(
                        ticker = %candle_data.ticker,
                        step = step.name(),
                        columns = columns.len(),
                        "Indicator step completed"
                    ),
                    Err(e) => warn!(
                        ticker = %candle_data.ticker,
                        step = step.name(),
                        indicator = e.indicator(),
                        "Skipping indicator columns: {}",
                        e
                    ),
                }

                StepOutcome { step: *step, result }
            })
            .collect()
    }

    pub fn calculate_step(
        step: IndicatorStep,
        candle_data: &PriceSeries,
        params: &PipelineParams,
    ) -> IndicatorResult<StepColumns> {
        let closes = &candle_data.close;

        let columns = match step {
            IndicatorStep::MovingAverages => {
                let mut columns = Vec::with_capacity(4);
                for column in [IndicatorColumn::Sma5, IndicatorColumn::Sma20] {
                    let window = column.window().unwrap_or_default();
                    columns.push((column, OverlapCalculator::calculate_sma(closes, window)?));
                }
                for column in [IndicatorColumn::Ema12, IndicatorColumn::Ema26] {
                    let span = column.window().unwrap_or_default();
                    columns.push((column, OverlapCalculator::calculate_ema(closes, span)?));
                }
                columns
            }
            IndicatorStep::Macd => {
                let macd = OscillatorCalculator::calculate_macd(
                    closes,
                    params.macd_fast,
                    params.macd_slow,
                    params.macd_signal,
                )?;
                vec![
                    (IndicatorColumn::Macd, macd.macd),
                    (IndicatorColumn::MacdSignal, macd.signal),
                    (IndicatorColumn::MacdHist, macd.histogram),
                ]
            }
            IndicatorStep::Bollinger => {
                let bands = OverlapCalculator::calculate_bollinger_bands(
                    closes,
                    params.bollinger_window,
                    params.bollinger_k,
                )?;
                vec![
                    (IndicatorColumn::BollingerMid, bands.middle),
                    (IndicatorColumn::BollingerUpper, bands.upper),
                    (IndicatorColumn::BollingerLower, bands.lower),
                ]
            }
            IndicatorStep::Rsi => vec![(
                IndicatorColumn::Rsi,
                OscillatorCalculator::calculate_rsi(closes, params.rsi_period)?,
            )],
            IndicatorStep::Stochastic => {
                let stoch =
                    OscillatorCalculator::calculate_stochastic(candle_data, params.stoch_k, params.stoch_d)?;
                vec![
                    (IndicatorColumn::StochK, stoch.k),
                    (IndicatorColumn::StochD, stoch.d),
                ]
            }
            IndicatorStep::Adx => {
                let adx = TrendCalculator::calculate_adx(candle_data, params.adx_period)?;
                vec![
                    (IndicatorColumn::Adx, adx.adx),
                    (IndicatorColumn::PlusDi, adx.plus_di),
                    (IndicatorColumn::MinusDi, adx.minus_di),
                ]
            }
            IndicatorStep::Atr => vec![(
                IndicatorColumn::Atr,
                VolatilityCalculator::calculate_atr(candle_data, params.atr_window)?,
            )],
            IndicatorStep::Obv => vec![(
                IndicatorColumn::Obv,
                VolumeCalculator::calculate_obv(candle_data)?,
            )],
        };

        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::PriceBar;
    use chrono::{Duration, NaiveDate};

    fn rising(n: usize) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = (0..n)
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
            .collect();
        PriceSeries::from_bars("005930.KS".to_string(), bars)
    }

    #[test]
    fn steps_run_in_dependency_order() {
        let outcomes = IndicatorCalculator::calculate_all(&rising(30), &PipelineParams::default());
        let steps: Vec<_> = outcomes.iter().map(|o| o.step).collect();
        assert_eq!(steps, IndicatorStep::ORDER.to_vec());
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
    }

    #[test]
    fn step_columns_match_declared_columns() {
        let data = rising(30);
        let params = PipelineParams::default();
        for step in IndicatorStep::ORDER {
            let columns = IndicatorCalculator::calculate_step(step, &data, &params).unwrap();
            let produced: Vec<_> = columns.iter().map(|(c, _)| *c).collect();
            assert_eq!(produced, step.columns().to_vec());
            assert!(columns.iter().all(|(_, s)| s.len() == data.len()));
        }
    }

    #[test]
    fn failing_step_does_not_stop_the_rest() {
        let params = PipelineParams {
            bollinger_window: 100,
            ..PipelineParams::default()
        };
        let outcomes = IndicatorCalculator::calculate_all(&rising(30), &params);

        for outcome in outcomes {
            if outcome.step == IndicatorStep::Bollinger {
                assert!(outcome.result.is_err());
            } else {
                assert!(outcome.result.is_ok(), "{:?} failed", outcome.step);
            }
        }
    }

    #[test]
    fn moving_average_windows_follow_column_names() {
        let data = rising(30);
        let columns =
            IndicatorCalculator::calculate_step(IndicatorStep::MovingAverages, &data, &PipelineParams::default())
                .unwrap();

        for (column, series) in &columns {
            let window = column.window().unwrap();
            assert!(column.name().ends_with(&format!("_{}", window)));
            assert!(series.name.ends_with(&format!("_{}", window)));
        }
        // SMA_5 at row 4 averages closes 100..=104
        assert_eq!(columns[0].1.get(4), Some(102.0));
        assert_eq!(columns[0].1.get(3), None);
    }

    #[test]
    fn huge_windows_skip_their_step_only() {
        let params = PipelineParams {
            rsi_period: usize::MAX,
            stoch_k: usize::MAX,
            ..PipelineParams::default()
        };
        let outcomes = IndicatorCalculator::calculate_all(&rising(30), &params);

        for outcome in outcomes {
            match outcome.step {
                IndicatorStep::Rsi | IndicatorStep::Stochastic => assert!(outcome.result.is_err()),
                step => assert!(outcome.result.is_ok(), "{:?} failed", step),
            }
        }
    }

    #[test]
    fn every_column_is_owned_by_exactly_one_step() {
        for column in IndicatorColumn::ALL {
            let owners = IndicatorStep::ORDER
                .iter()
                .filter(|s| s.columns().contains(&column))
                .count();
            assert_eq!(owners, 1, "{}", column.name());
        }
    }
}

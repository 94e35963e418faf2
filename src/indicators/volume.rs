use crate::database::models::PriceSeries;
use crate::error::{IndicatorError, IndicatorResult};
use crate::indicators::series::IndicatorSeries;

pub struct VolumeCalculator;

impl VolumeCalculator {
    // Calculate OBV (On Balance Volume).
    // A single pass carrying the running total; OBV[0] = 0.
    pub fn calculate_obv(candle_data: &PriceSeries) -> IndicatorResult<IndicatorSeries> {
        if candle_data.close.len() != candle_data.volume.len() {
            return Err(IndicatorError::LengthMismatch { indicator: "OBV" });
        }

        if candle_data.close.is_empty() {
            return Err(IndicatorError::InsufficientData {
                indicator: "OBV",
                required: 1,
                available: 0,
            });
        }

        let mut results = Vec::with_capacity(candle_data.close.len());
        let mut obv = 0.0;
        results.push(obv);

        for i in 1..candle_data.close.len() {
            let current_close = candle_data.close[i];
            let previous_close = candle_data.close[i - 1];
            let volume = candle_data.volume[i] as f64;

            if current_close > previous_close {
                obv += volume;
            } else if current_close < previous_close {
                obv -= volume;
            }
            // If equal, OBV remains unchanged

            results.push(obv);
        }

        Ok(IndicatorSeries::defined("OBV", results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::PriceBar;
    use chrono::{Duration, NaiveDate};

    fn series(closes: &[f64], volume: u64) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, close)| PriceBar {
                date: start + Duration::days(i as i64),
                open: *close,
                high: *close,
                low: *close,
                close: *close,
                volume,
                dividends: 0.0,
                split_ratio: 0.0,
            })
            .collect();
        PriceSeries::from_bars("TEST".to_string(), bars)
    }

    #[test]
    fn obv_moves_by_volume_per_segment() {
        // up, up, flat, down, down, flat
        let closes = [10.0, 11.0, 12.0, 12.0, 11.0, 10.0, 10.0];
        let obv = VolumeCalculator::calculate_obv(&series(&closes, 100)).unwrap();

        let expected = [0.0, 100.0, 200.0, 200.0, 100.0, 0.0, 0.0];
        assert_eq!(obv.values, expected.iter().map(|v| Some(*v)).collect::<Vec<_>>());
    }

    #[test]
    fn obv_of_steady_rise_accumulates_all_volume() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let obv = VolumeCalculator::calculate_obv(&series(&closes, 1000)).unwrap();
        assert_eq!(obv.get(29), Some(29000.0));
    }

    #[test]
    fn obv_single_row_is_zero() {
        let obv = VolumeCalculator::calculate_obv(&series(&[5.0], 42)).unwrap();
        assert_eq!(obv.values, vec![Some(0.0)]);
    }
}

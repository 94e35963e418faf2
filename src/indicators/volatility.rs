use crate::database::models::PriceSeries;
use crate::error::{IndicatorError, IndicatorResult};
use crate::indicators::overlaps::OverlapCalculator;
use crate::indicators::series::IndicatorSeries;
use crate::indicators::ta::{Next, TrueRange};

pub struct VolatilityCalculator;

impl VolatilityCalculator {
    // Calculate ATR (Average True Range) as an EMA of True Range
    pub fn calculate_atr(candle_data: &PriceSeries, window: usize) -> IndicatorResult<IndicatorSeries> {
        let tr = Self::true_range_values(candle_data, "ATR")?;
        let atr = OverlapCalculator::ema_values(&tr, window)?;

        Ok(IndicatorSeries::defined("ATR", atr))
    }

    pub(crate) fn true_range_values(
        candle_data: &PriceSeries,
        indicator: &'static str,
    ) -> IndicatorResult<Vec<f64>> {
        if !candle_data.is_aligned() {
            return Err(IndicatorError::LengthMismatch { indicator });
        }

        if candle_data.is_empty() {
            return Err(IndicatorError::InsufficientData {
                indicator,
                required: 1,
                available: 0,
            });
        }

        let mut tr = TrueRange::new();
        let values = candle_data
            .high
            .iter()
            .zip(&candle_data.low)
            .zip(&candle_data.close)
            .map(|((high, low), close)| tr.next((*high, *low, *close)))
            .collect();

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::PriceBar;
    use chrono::NaiveDate;

    fn bar(day: u32, high: f64, low: f64, close: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 10,
            dividends: 0.0,
            split_ratio: 0.0,
        }
    }

    #[test]
    fn first_true_range_is_high_minus_low() {
        let data = PriceSeries::from_bars(
            "TEST".to_string(),
            vec![bar(1, 12.0, 9.0, 10.0), bar(4, 11.0, 10.5, 10.8), bar(5, 10.0, 7.0, 8.0)],
        );
        let tr = VolatilityCalculator::true_range_values(&data, "ATR").unwrap();
        // gap to the previous close wins on the last two bars
        let expected = [3.0, 1.0, 3.8];
        for (got, want) in tr.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9);
        }
    }

    #[test]
    fn atr_is_ema_of_true_range() {
        let data = PriceSeries::from_bars(
            "TEST".to_string(),
            (1..=20).map(|d| bar(d, 102.0 + d as f64, 98.0 + d as f64, 100.0 + d as f64)).collect(),
        );
        let atr = VolatilityCalculator::calculate_atr(&data, 14).unwrap();

        assert_eq!(atr.len(), 20);
        assert_eq!(atr.warm_up(), 0);
        // every bar spans 4 and gaps never exceed it
        for v in atr.values.iter().flatten() {
            assert!((v - 4.0).abs() < 1e-12);
        }
    }

    #[test]
    fn atr_on_empty_series_is_an_error() {
        let data = PriceSeries::new("EMPTY".to_string());
        assert!(matches!(
            VolatilityCalculator::calculate_atr(&data, 14),
            Err(IndicatorError::InsufficientData { indicator: "ATR", .. })
        ));
    }
}

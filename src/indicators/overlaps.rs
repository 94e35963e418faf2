use crate::error::{IndicatorError, IndicatorResult};
use crate::indicators::series::IndicatorSeries;
use crate::indicators::ta::{ExponentialMovingAverage, Next, SimpleMovingAverage, StandardDeviation};

/// Middle, upper and lower band, each aligned with the input
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub middle: IndicatorSeries,
    pub upper: IndicatorSeries,
    pub lower: IndicatorSeries,
}

pub struct OverlapCalculator;

impl OverlapCalculator {
    // Calculate SMA (Simple Moving Average)
    // A window longer than the input gives an all-undefined series.
    pub fn calculate_sma(values: &[f64], window: usize) -> IndicatorResult<IndicatorSeries> {
        let mut sma = SimpleMovingAverage::new(window)?;
        let results = values.iter().map(|v| sma.next(*v)).collect();

        Ok(IndicatorSeries::new(format!("SMA_{}", window), results))
    }

    // Calculate EMA (Exponential Moving Average), defined from the first row
    pub fn calculate_ema(values: &[f64], span: usize) -> IndicatorResult<IndicatorSeries> {
        Ok(IndicatorSeries::defined(
            format!("EMA_{}", span),
            Self::ema_values(values, span)?,
        ))
    }

    pub(crate) fn ema_values(values: &[f64], span: usize) -> IndicatorResult<Vec<f64>> {
        let mut ema = ExponentialMovingAverage::new(span)?;
        Ok(values.iter().map(|v| ema.next(*v)).collect())
    }

    // Calculate Bollinger Bands: SMA +/- k * rolling sample stddev over the same window
    pub fn calculate_bollinger_bands(
        values: &[f64],
        window: usize,
        deviation_multiplier: f64,
    ) -> IndicatorResult<BollingerBands> {
        if !deviation_multiplier.is_finite() || deviation_multiplier < 0.0 {
            return Err(IndicatorError::InvalidParameter {
                indicator: "Bollinger",
                reason: format!("deviation multiplier {} is not a finite non-negative number", deviation_multiplier),
            });
        }

        if values.len() < window {
            return Err(IndicatorError::InsufficientData {
                indicator: "Bollinger",
                required: window,
                available: values.len(),
            });
        }

        let mut sma = SimpleMovingAverage::new(window)?;
        let mut stddev = StandardDeviation::new(window)?;

        let mut middle = Vec::with_capacity(values.len());
        let mut upper = Vec::with_capacity(values.len());
        let mut lower = Vec::with_capacity(values.len());

        for value in values {
            match (sma.next(*value), stddev.next(*value)) {
                (Some(mid), Some(sd)) => {
                    middle.push(Some(mid));
                    upper.push(Some(mid + deviation_multiplier * sd));
                    lower.push(Some(mid - deviation_multiplier * sd));
                }
                _ => {
                    middle.push(None);
                    upper.push(None);
                    lower.push(None);
                }
            }
        }

        Ok(BollingerBands {
            middle: IndicatorSeries::new("Bollinger_Mid", middle),
            upper: IndicatorSeries::new("Bollinger_Upper", upper),
            lower: IndicatorSeries::new("Bollinger_Lower", lower),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascending(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn sma_warm_up_prefix_and_values() {
        let closes = ascending(30);
        let sma = OverlapCalculator::calculate_sma(&closes, 5).unwrap();

        assert_eq!(sma.len(), 30);
        assert_eq!(sma.warm_up(), 4);
        assert!((sma.get(4).unwrap() - 102.0).abs() < 1e-12);
        assert!(sma.values[4..].iter().all(|v| v.map_or(false, f64::is_finite)));
    }

    #[test]
    fn sma_with_unbounded_window_is_all_undefined() {
        let sma = OverlapCalculator::calculate_sma(&[1.0, 2.0, 3.0], usize::MAX).unwrap();
        assert_eq!(sma.len(), 3);
        assert_eq!(sma.warm_up(), 3);

        assert!(OverlapCalculator::calculate_bollinger_bands(&[1.0, 2.0, 3.0], usize::MAX, 2.0).is_err());
    }

    #[test]
    fn sma_window_longer_than_input_is_all_undefined() {
        let sma = OverlapCalculator::calculate_sma(&[1.0, 2.0, 3.0], 10).unwrap();
        assert_eq!(sma.len(), 3);
        assert!(sma.values.iter().all(Option::is_none));
    }

    #[test]
    fn ema_of_constant_series_is_constant() {
        let closes = vec![42.5; 50];
        for span in [1, 5, 12, 26, 100] {
            let ema = OverlapCalculator::calculate_ema(&closes, span).unwrap();
            assert_eq!(ema.warm_up(), 0);
            assert!(ema.values.iter().all(|v| (v.unwrap() - 42.5).abs() < 1e-12));
        }
    }

    #[test]
    fn ema_follows_recursion() {
        let closes: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let ema = OverlapCalculator::calculate_ema(&closes, 5).unwrap();

        let alpha = 2.0 / 6.0;
        let mut expected = closes[0];
        assert_eq!(ema.get(0), Some(expected));
        for (i, close) in closes.iter().enumerate().skip(1) {
            expected = alpha * close + (1.0 - alpha) * expected;
            assert!((ema.get(i).unwrap() - expected).abs() < 1e-10);
        }
    }

    #[test]
    fn bollinger_bands_are_ordered() {
        let closes: Vec<f64> = (0..60).map(|i| 50.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let bands = OverlapCalculator::calculate_bollinger_bands(&closes, 20, 2.0).unwrap();

        assert_eq!(bands.middle.warm_up(), 19);
        for i in 19..closes.len() {
            let (lo, mid, up) = (
                bands.lower.get(i).unwrap(),
                bands.middle.get(i).unwrap(),
                bands.upper.get(i).unwrap(),
            );
            assert!(lo <= mid && mid <= up);
        }
    }

    #[test]
    fn bollinger_middle_matches_sma() {
        let closes = ascending(30);
        let bands = OverlapCalculator::calculate_bollinger_bands(&closes, 20, 2.0).unwrap();
        let sma = OverlapCalculator::calculate_sma(&closes, 20).unwrap();
        assert_eq!(bands.middle.values, sma.values);
    }

    #[test]
    fn bollinger_flat_series_collapses_bands() {
        let closes = vec![100.0; 25];
        let bands = OverlapCalculator::calculate_bollinger_bands(&closes, 20, 2.0).unwrap();
        assert_eq!(bands.upper.get(24), Some(100.0));
        assert_eq!(bands.lower.get(24), Some(100.0));
    }

    #[test]
    fn bollinger_rejects_short_input() {
        let err = OverlapCalculator::calculate_bollinger_bands(&[1.0, 2.0, 3.0], 20, 2.0).unwrap_err();
        assert_eq!(
            err,
            IndicatorError::InsufficientData {
                indicator: "Bollinger",
                required: 20,
                available: 3,
            }
        );
    }
}

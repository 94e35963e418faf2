use crate::database::models::PriceSeries;
use crate::error::{IndicatorError, IndicatorResult};
use crate::indicators::overlaps::OverlapCalculator;
use crate::indicators::series::IndicatorSeries;
use crate::indicators::volatility::VolatilityCalculator;
use tracing::debug;

/// ADX together with the intermediate directional series.
///
/// All four series are defined from the first row, since every smoothing
/// step is an EMA seeded with its first input.
#[derive(Debug, Clone, PartialEq)]
pub struct AdxSeries {
    pub adx: IndicatorSeries,
    pub dx: IndicatorSeries,
    pub plus_di: IndicatorSeries,
    pub minus_di: IndicatorSeries,
}

pub struct TrendCalculator;

impl TrendCalculator {
    // Calculate ADX, DX, +DI and -DI.
    //
    // +DM/-DM only count the larger of the two moves, and only when positive.
    // TR, +DM and -DM are smoothed with EMA(period); ADX = EMA(DX, period).
    pub fn calculate_adx(candle_data: &PriceSeries, period: usize) -> IndicatorResult<AdxSeries> {
        let tr = VolatilityCalculator::true_range_values(candle_data, "ADX")?;

        if candle_data.len() < 2 {
            return Err(IndicatorError::InsufficientData {
                indicator: "ADX",
                required: 2,
                available: candle_data.len(),
            });
        }

        let (plus_dm, minus_dm) = Self::directional_movement(candle_data);

        let tr_smooth = OverlapCalculator::ema_values(&tr, period)?;
        let plus_smooth = OverlapCalculator::ema_values(&plus_dm, period)?;
        let minus_smooth = OverlapCalculator::ema_values(&minus_dm, period)?;

        let n = candle_data.len();
        let mut plus_di = Vec::with_capacity(n);
        let mut minus_di = Vec::with_capacity(n);
        let mut dx = Vec::with_capacity(n);
        let mut zero_range_rows = 0usize;
        let mut zero_di_rows = 0usize;

        for i in 0..n {
            let (pdi, mdi) = if tr_smooth[i] == 0.0 {
                zero_range_rows += 1;
                (0.0, 0.0)
            } else {
                (
                    100.0 * plus_smooth[i] / tr_smooth[i],
                    100.0 * minus_smooth[i] / tr_smooth[i],
                )
            };

            let di_sum = pdi + mdi;
            let dx_value = if di_sum == 0.0 {
                zero_di_rows += 1;
                0.0
            } else {
                100.0 * (pdi - mdi).abs() / di_sum
            };

            plus_di.push(pdi);
            minus_di.push(mdi);
            dx.push(dx_value);
        }

        if zero_range_rows > 0 || zero_di_rows > 0 {
            debug!(
                zero_range_rows,
                zero_di_rows,
                "ADX: zero true range or zero DI sum, resolved to 0"
            );
        }

        let adx = OverlapCalculator::ema_values(&dx, period)?;

        Ok(AdxSeries {
            adx: IndicatorSeries::defined("ADX", adx),
            dx: IndicatorSeries::defined("DX", dx),
            plus_di: IndicatorSeries::defined("+DI", plus_di),
            minus_di: IndicatorSeries::defined("-DI", minus_di),
        })
    }

    // First row has no previous bar and carries no movement
    fn directional_movement(candle_data: &PriceSeries) -> (Vec<f64>, Vec<f64>) {
        let n = candle_data.len();
        let mut plus_dm = Vec::with_capacity(n);
        let mut minus_dm = Vec::with_capacity(n);

        plus_dm.push(0.0);
        minus_dm.push(0.0);

        for i in 1..n {
            let up_move = candle_data.high[i] - candle_data.high[i - 1];
            let down_move = candle_data.low[i - 1] - candle_data.low[i];

            plus_dm.push(if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 });
            minus_dm.push(if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 });
        }

        (plus_dm, minus_dm)
    }
}

use crate::database::models::PriceSeries;
use crate::error::LoaderError;
use crate::indicators::{IndicatorCalculator, PipelineParams};
use crate::loader::{load_price_series, HistorySelector, PriceSource};
use crate::processor::analysis::AnalysisResult;
use tracing::{info, instrument, warn};

/// Compute every indicator over an already loaded series.
///
/// Indicator failures never escape: they are logged and listed in
/// `AnalysisResult::failures`.
pub fn analyze_bars(candle_data: &PriceSeries, params: &PipelineParams) -> AnalysisResult {
    let outcomes = IndicatorCalculator::calculate_all(candle_data, params);
    let result = AnalysisResult::from_outcomes(candle_data, outcomes, params.output_decimals);

    if result.is_partial() {
        warn!(
            ticker = %candle_data.ticker,
            missing = ?result.missing_columns(),
            "Analysis finished without some indicator columns"
        );
    }

    result
}

/// Load the history of `ticker` from `source` and analyze it.
///
/// Only loader failures are returned as errors.
#[instrument(skip(source, params))]
pub async fn analyze_data(
    source: &dyn PriceSource,
    ticker: &str,
    selector: &HistorySelector,
    params: &PipelineParams,
) -> Result<AnalysisResult, LoaderError> {
    let candle_data = load_price_series(source, ticker, selector).await?;
    let result = analyze_bars(&candle_data, params);

    info!(
        stock_code = %result.stock_code,
        rows = result.len(),
        skipped_steps = result.failures.len(),
        "Analysis complete"
    );

    Ok(result)
}

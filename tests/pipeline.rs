mod common;

use common::{rising_bars, MemorySource};
use stock_indicator_engine::error::LoaderError;
use stock_indicator_engine::indicators::{IndicatorStep, PipelineParams};
use stock_indicator_engine::loader::{HistoryPeriod, HistorySelector};
use stock_indicator_engine::database::models::PriceSeries;
use stock_indicator_engine::processor::{analyze_bars, analyze_data};

const TICKER: &str = "005930.KS";

fn selector() -> HistorySelector {
    HistorySelector::Period(HistoryPeriod::Max)
}

#[tokio::test]
async fn rising_series_scenario() {
    let source = MemorySource::default().with(TICKER, rising_bars(30));
    let result = analyze_data(&source, TICKER, &selector(), &PipelineParams::default())
        .await
        .unwrap();

    assert_eq!(result.stock_code, "005930");
    assert_eq!(result.len(), 30);
    assert!(!result.is_partial());

    let rows = &result.rows;
    assert_eq!(rows[4].sma_5, Some(102.0));
    for row in &rows[13..30] {
        assert_eq!(row.rsi, Some(100.0), "{}", row.date);
    }
    assert_eq!(rows[29].obv, Some(29000.0));

    let row = &rows[19];
    let (lower, mid, upper) = (
        row.bollinger_lower.unwrap(),
        row.bollinger_mid.unwrap(),
        row.bollinger_upper.unwrap(),
    );
    assert!(lower <= mid && mid <= upper);
    assert_eq!(row.bollinger_mid, row.sma_20);
}

#[tokio::test]
async fn warm_up_rows_are_zero_filled() {
    let source = MemorySource::default().with(TICKER, rising_bars(30));
    let result = analyze_data(&source, TICKER, &selector(), &PipelineParams::default())
        .await
        .unwrap();

    for row in &result.rows[..19] {
        assert_eq!(row.sma_20, Some(0.0));
    }
    assert_eq!(result.rows[19].sma_20, Some(109.5));
    assert_eq!(result.rows[0].date, "2024-01-01");
}

#[tokio::test]
async fn runs_are_deterministic() {
    let source = MemorySource::default().with(TICKER, rising_bars(40));
    let params = PipelineParams::default();

    let first = analyze_data(&source, TICKER, &selector(), &params).await.unwrap();
    let second = analyze_data(&source, TICKER, &selector(), &params).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first.rows).unwrap(),
        serde_json::to_string(&second.rows).unwrap()
    );
}

#[tokio::test]
async fn failing_step_leaves_other_columns() {
    let source = MemorySource::default().with(TICKER, rising_bars(30));
    let params = PipelineParams {
        bollinger_window: 50,
        ..PipelineParams::default()
    };

    let result = analyze_data(&source, TICKER, &selector(), &params).await.unwrap();

    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].0, IndicatorStep::Bollinger);
    assert_eq!(
        result.missing_columns(),
        vec!["Bollinger_Mid", "Bollinger_Upper", "Bollinger_Lower"]
    );

    for row in &result.rows {
        assert!(row.bollinger_mid.is_none() && row.bollinger_upper.is_none() && row.bollinger_lower.is_none());
        assert!(row.sma_5.is_some() && row.ema_12.is_some() && row.macd.is_some());
        assert!(row.rsi.is_some() && row.obv.is_some());
    }
}

#[tokio::test]
async fn unbounded_windows_only_drop_their_columns() {
    let source = MemorySource::default().with(TICKER, rising_bars(30));
    let params = PipelineParams {
        rsi_period: usize::MAX,
        stoch_d: usize::MAX,
        bollinger_window: usize::MAX,
        ..PipelineParams::default()
    };

    let result = analyze_data(&source, TICKER, &selector(), &params).await.unwrap();

    let failed: Vec<IndicatorStep> = result.failures.iter().map(|(step, _)| *step).collect();
    assert_eq!(failed, vec![IndicatorStep::Bollinger, IndicatorStep::Rsi]);
    assert!(result.rows.iter().all(|row| row.rsi.is_none() && row.bollinger_mid.is_none()));
    // %D never fills, so it is zero-filled like any warm-up
    assert!(result.rows.iter().all(|row| row.stoch_d == Some(0.0)));
    assert_eq!(result.rows[4].sma_5, Some(102.0));
}

#[test]
fn analyze_bars_survives_unbounded_rsi_period() {
    let candle_data = PriceSeries::from_bars(TICKER.to_string(), rising_bars(30));
    let params = PipelineParams {
        rsi_period: usize::MAX,
        ..PipelineParams::default()
    };

    let result = analyze_bars(&candle_data, &params);
    assert_eq!(result.len(), 30);
    assert_eq!(result.missing_columns(), vec!["RSI"]);
}

#[tokio::test]
async fn short_history_still_produces_rows() {
    // Too short for every windowed step, long enough for EMA and OBV
    let source = MemorySource::default().with(TICKER, rising_bars(3));
    let result = analyze_data(&source, TICKER, &selector(), &PipelineParams::default())
        .await
        .unwrap();

    assert_eq!(result.len(), 3);
    assert!(result.is_partial());
    assert!(result.rows.iter().all(|row| row.ema_12.is_some() && row.obv.is_some()));
    assert!(result.rows.iter().all(|row| row.rsi.is_none()));
}

#[tokio::test]
async fn missing_history_is_an_error() {
    let source = MemorySource::default();
    let err = analyze_data(&source, "000000.KS", &selector(), &PipelineParams::default())
        .await
        .unwrap_err();

    assert!(matches!(err, LoaderError::NoData { ref ticker } if ticker == "000000.KS"));
}

#[tokio::test]
async fn empty_ticker_is_rejected() {
    let source = MemorySource::default();
    let err = analyze_data(&source, "  ", &selector(), &PipelineParams::default())
        .await
        .unwrap_err();

    assert!(matches!(err, LoaderError::InvalidRequest(_)));
}

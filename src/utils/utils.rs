use anyhow::Result;
use std::time::Instant;
use tracing::debug;

// Utility function to measure execution time of operations
pub async fn measure_time<F, T>(operation_name: &str, f: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    let start = Instant::now();
    let result = f.await;
    let elapsed = start.elapsed();

    debug!("{} completed in {:.2?}", operation_name, elapsed);

    result
}

// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals.min(i32::MAX as u32) as i32);
    let scaled = value * factor;
    // finer than f64 can represent: nothing to round
    if !scaled.is_finite() {
        return value;
    }
    let rounded = scaled.round() / factor;
    // avoid writing "-0"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

// NaN and +/-inf become 0
pub fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

// "005930.KS" -> "005930"; tickers without a suffix are returned unchanged
pub fn strip_market_suffix(ticker: &str) -> &str {
    match ticker.rfind('.') {
        Some(idx) if idx > 0 => &ticker[..idx],
        _ => ticker,
    }
}

// Numeric KRX codes are six digits; restore zeros lost by numeric round-trips
pub fn pad_stock_code(code: &str) -> String {
    let code = code.trim();
    if !code.is_empty() && code.len() < 6 && code.chars().all(|c| c.is_ascii_digit()) {
        format!("{:0>6}", code)
    } else {
        code.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_two_places() {
        assert_eq!(round_to(102.456, 2), 102.46);
        assert_eq!(round_to(-1.234, 2), -1.23);
        assert_eq!(round_to(-0.001, 2), 0.0);
        assert!(round_to(-0.001, 2).is_sign_positive());
    }

    #[test]
    fn rounding_with_huge_precision_keeps_the_value() {
        assert_eq!(round_to(0.0, 400), 0.0);
        assert_eq!(round_to(1.23456, 400), 1.23456);
        assert_eq!(round_to(-7.5, u32::MAX), -7.5);
        assert!(round_to(f64::NAN, 2).is_nan());
    }

    #[test]
    fn sanitizes_non_finite_values() {
        assert_eq!(sanitize(f64::NAN), 0.0);
        assert_eq!(sanitize(f64::INFINITY), 0.0);
        assert_eq!(sanitize(f64::NEG_INFINITY), 0.0);
        assert_eq!(sanitize(3.5), 3.5);
    }

    #[test]
    fn strips_market_suffix() {
        assert_eq!(strip_market_suffix("005930.KS"), "005930");
        assert_eq!(strip_market_suffix("035720.KQ"), "035720");
        assert_eq!(strip_market_suffix("AAPL"), "AAPL");
        assert_eq!(strip_market_suffix(".KS"), ".KS");
    }

    #[test]
    fn pads_numeric_codes() {
        assert_eq!(pad_stock_code("5930"), "005930");
        assert_eq!(pad_stock_code("035720"), "035720");
        assert_eq!(pad_stock_code("AAPL"), "AAPL");
    }
}

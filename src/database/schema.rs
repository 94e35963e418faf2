// SQL for the analysis table. The table name comes from configuration, so it
// is checked before being spliced into a statement.

use anyhow::{bail, Result};

/// Table columns in insert order, matching `AnalysisRow`
pub const TECHNICAL_DATA_COLUMNS: [&str; 27] = [
    "stock_code",
    "date",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "dividends",
    "stock_splits",
    "sma_5",
    "sma_20",
    "ema_12",
    "ema_26",
    "macd",
    "macd_signal",
    "macd_hist",
    "bollinger_mid",
    "bollinger_upper",
    "bollinger_lower",
    "rsi",
    "stoch_k",
    "stoch_d",
    "adx",
    "plus_di",
    "minus_di",
    "atr",
    "obv",
];

pub fn validate_table_name(table: &str) -> Result<()> {
    let valid = !table.is_empty()
        && table.len() <= 63
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !table.starts_with(|c: char| c.is_ascii_digit());

    if !valid {
        bail!("Invalid table name '{}'", table);
    }
    Ok(())
}

pub fn create_technical_data_table(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
    id BIGSERIAL PRIMARY KEY,
    stock_code VARCHAR(16) NOT NULL,
    date DATE NOT NULL,
    open DOUBLE PRECISION NOT NULL,
    high DOUBLE PRECISION NOT NULL,
    low DOUBLE PRECISION NOT NULL,
    close DOUBLE PRECISION NOT NULL,
    volume BIGINT NOT NULL,
    dividends DOUBLE PRECISION NOT NULL DEFAULT 0,
    stock_splits DOUBLE PRECISION NOT NULL DEFAULT 0,
    sma_5 DOUBLE PRECISION,
    sma_20 DOUBLE PRECISION,
    ema_12 DOUBLE PRECISION,
    ema_26 DOUBLE PRECISION,
    macd DOUBLE PRECISION,
    macd_signal DOUBLE PRECISION,
    macd_hist DOUBLE PRECISION,
    bollinger_mid DOUBLE PRECISION,
    bollinger_upper DOUBLE PRECISION,
    bollinger_lower DOUBLE PRECISION,
    rsi DOUBLE PRECISION,
    stoch_k DOUBLE PRECISION,
    stoch_d DOUBLE PRECISION,
    adx DOUBLE PRECISION,
    plus_di DOUBLE PRECISION,
    minus_di DOUBLE PRECISION,
    atr DOUBLE PRECISION,
    obv DOUBLE PRECISION,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE(stock_code, date)
)"#
    )
}

pub fn create_technical_data_index(table: &str) -> String {
    format!("CREATE INDEX IF NOT EXISTS idx_{table}_date ON {table}(date DESC)")
}

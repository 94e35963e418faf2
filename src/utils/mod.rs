pub mod utils;

pub use self::utils::{measure_time, pad_stock_code, round_to, sanitize, strip_market_suffix};

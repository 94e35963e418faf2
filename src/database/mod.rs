pub mod models;
pub mod postgres;
pub mod schema;

pub use self::models::{AnalysisRow, PriceBar, PriceSeries};
pub use self::postgres::PostgresManager;

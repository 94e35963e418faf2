pub mod csv_store;

pub use self::csv_store::{extract_unique_rows, CsvStore};

use crate::indicators::PipelineParams;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "stock_indicators";
pub const ENV_PREFIX: &str = "STOCKLAB";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub loader: LoaderConfig,
    pub pipeline: PipelineParams,
    pub storage: StorageConfig,
    pub worker: WorkerConfig,
    pub stocks: Vec<StockEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub max_connections: usize,
    pub table: String,
    pub batch_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            dbname: "stocklab".to_string(),
            max_connections: 8,
            table: "technical_data".to_string(),
            batch_size: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Yahoo,
    Csv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub source: SourceKind,
    pub base_url: String,
    pub timeout_secs: u64,
    pub auto_adjust: bool,
    pub csv_dir: String,
    pub default_period: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Yahoo,
            base_url: crate::loader::yahoo::DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            auto_adjust: true,
            csv_dir: "prices".to_string(),
            default_period: "max".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub csv_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            csv_path: "stock_data.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub concurrency: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: num_cpus::get(),
        }
    }
}

/// One instrument of the batch sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    pub name: String,
    /// Full provider ticker, e.g. "005930.KS"
    pub code: String,
}

impl StockEntry {
    pub fn new(name: &str, code: &str) -> Self {
        Self {
            name: name.to_string(),
            code: code.to_string(),
        }
    }
}

// Ten largest KRX listings by market cap
pub fn default_stocks() -> Vec<StockEntry> {
    vec![
        StockEntry::new("Samsung Electronics", "005930.KS"),
        StockEntry::new("SK hynix", "000660.KS"),
        StockEntry::new("LG Energy Solution", "373220.KS"),
        StockEntry::new("Samsung Biologics", "207940.KS"),
        StockEntry::new("Hyundai Motor", "005380.KS"),
        StockEntry::new("Samsung Electronics Pref", "005935.KS"),
        StockEntry::new("Celltrion", "068270.KS"),
        StockEntry::new("Kia", "000270.KS"),
        StockEntry::new("KB Financial Group", "105560.KS"),
        StockEntry::new("NAVER", "035420.KS"),
    ]
}

impl AppConfig {
    /// Defaults, then the config file (optional), then `STOCKLAB__*`
    /// variables, then the plain `DB_*` variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let file = match path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .set_override_option("database.host", std::env::var("DB_HOST").ok())?
            .set_override_option("database.port", std::env::var("DB_PORT").ok())?
            .set_override_option("database.user", std::env::var("DB_USER").ok())?
            .set_override_option("database.password", std::env::var("DB_PASSWORD").ok())?
            .set_override_option("database.dbname", std::env::var("DB_NAME").ok())?
            .build()
            .context("Failed to read configuration")?;

        let mut config: AppConfig = settings
            .try_deserialize()
            .context("Invalid configuration")?;

        if config.stocks.is_empty() {
            config.stocks = default_stocks();
        }
        if config.worker.concurrency == 0 {
            config.worker.concurrency = 1;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_published_parameters() {
        let config = AppConfig::default();
        assert_eq!(config.pipeline.macd_fast, 12);
        assert_eq!(config.pipeline.bollinger_window, 20);
        assert_eq!(config.pipeline.bollinger_k, 2.0);
        assert_eq!(config.pipeline.output_decimals, 2);
        assert_eq!(config.database.table, "technical_data");
        assert_eq!(config.storage.csv_path, "stock_data.csv");
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            r#"
[loader]
source = "csv"
csv_dir = "/data/prices"

[pipeline]
rsi_period = 9

[[stocks]]
name = "Kakao"
code = "035720.KS"
"#,
        )
        .unwrap();

        let config = AppConfig::load(path.to_str()).unwrap();
        assert_eq!(config.loader.source, SourceKind::Csv);
        assert_eq!(config.loader.csv_dir, "/data/prices");
        assert_eq!(config.pipeline.rsi_period, 9);
        assert_eq!(config.pipeline.stoch_k, 14);
        assert_eq!(config.stocks, vec![StockEntry::new("Kakao", "035720.KS")]);
    }

    #[test]
    fn moving_average_windows_cannot_be_overridden() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[pipeline]\nsma_short = 10\n").unwrap();

        assert!(AppConfig::load(path.to_str()).is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(AppConfig::load(Some("/nonexistent/stocklab.toml")).is_err());
    }
}

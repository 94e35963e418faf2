// src/cli.rs
use crate::config::{AppConfig, SourceKind};
use crate::database::postgres::PostgresManager;
use crate::loader::{CsvPriceSource, HistorySelector, PriceSource, YahooPriceSource};
use crate::processor::job::SyncJob;
use crate::processor::pipeline::analyze_data;
use crate::processor::worker::SyncWorker;
use crate::processor::AnalysisResult;
use crate::storage::CsvStore;
use crate::utils::measure_time;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "stock-indicator-engine")]
#[command(about = "Technical indicator pipeline for daily stock prices", long_about = None)]
pub struct Cli {
    /// Configuration file (any format the config crate understands)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze one ticker and print a summary or write CSV
    Analyze {
        /// Provider ticker (e.g., "005930.KS")
        #[arg(short, long)]
        ticker: String,

        /// Lookback period: 1d 5d 1mo 3mo 6mo 1y 2y 5y 10y ytd max
        #[arg(short, long)]
        period: Option<String>,

        /// Load everything from this date on (YYYY-MM-DD)
        #[arg(long, conflicts_with = "period")]
        start_date: Option<NaiveDate>,

        /// Write the result table to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyze every configured stock and store new rows
    Sync {
        /// Lookback period for every stock
        #[arg(short, long)]
        period: Option<String>,

        /// Load everything from this date on (YYYY-MM-DD)
        #[arg(long, conflicts_with = "period")]
        start_date: Option<NaiveDate>,

        /// Skip the database and only update the CSV store
        #[arg(long)]
        no_db: bool,
    },

    /// Create the analysis table and index
    InitDb,
}

/// Build the configured price source
pub fn create_source(config: &AppConfig) -> Result<Arc<dyn PriceSource>> {
    let source: Arc<dyn PriceSource> = match config.loader.source {
        SourceKind::Yahoo => Arc::new(
            YahooPriceSource::new(
                &config.loader.base_url,
                config.loader.timeout_secs,
                config.loader.auto_adjust,
            )
            .context("Failed to create Yahoo price source")?,
        ),
        SourceKind::Csv => Arc::new(CsvPriceSource::new(&config.loader.csv_dir)),
    };

    Ok(source)
}

fn selector(config: &AppConfig, period: Option<&str>, start_date: Option<NaiveDate>) -> Result<HistorySelector> {
    let period = match (period, start_date) {
        (None, None) => Some(config.loader.default_period.as_str()),
        (period, _) => period,
    };

    Ok(HistorySelector::from_options(period, start_date)?)
}

/// Execute a command from the CLI
pub async fn execute_command(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            ticker,
            period,
            start_date,
            output,
        } => {
            let source = create_source(&config)?;
            let selector = selector(&config, period.as_deref(), start_date)?;

            let result = measure_time("analyze", async {
                Ok(analyze_data(source.as_ref(), &ticker, &selector, &config.pipeline).await?)
            })
            .await?;

            match output {
                Some(path) => {
                    CsvStore::new(&path).write_all(&result.rows)?;
                    println!("Wrote {} rows to {}", result.len(), path.display());
                }
                None => print_summary(&result),
            }
        }

        Commands::Sync {
            period,
            start_date,
            no_db,
        } => {
            let source = create_source(&config)?;
            let selector = selector(&config, period.as_deref(), start_date)?;
            let jobs: Vec<SyncJob> = config
                .stocks
                .iter()
                .map(|entry| SyncJob::from_entry(entry, selector))
                .collect();

            let mut worker = SyncWorker::new(source, config.pipeline.clone(), config.worker.concurrency)
                .with_csv_store(CsvStore::new(&config.storage.csv_path));

            if !no_db && config.database.enabled {
                let pg = PostgresManager::new(&config.database).await?;
                pg.init_tables().await?;
                worker = worker.with_postgres(Arc::new(pg));
            } else {
                info!("Database sink disabled");
            }

            let report = worker.run(jobs).await?;

            println!("Sync run {}", report.run_id);
            for (job, outcome) in &report.outcomes {
                println!("  {:<40} {}", job.to_string(), outcome);
            }
            if let Some(appended) = report.csv_appended {
                println!("CSV store: {} new rows", appended);
            }
            if let Some(inserted) = report.db_inserted {
                println!("Database: {} new rows", inserted);
            }
        }

        Commands::InitDb => {
            let pg = PostgresManager::new(&config.database).await?;
            pg.init_tables().await?;
            println!("Table {} is ready.", pg.table());
        }
    }

    Ok(())
}

fn print_summary(result: &AnalysisResult) {
    println!("Stock code: {} ({} rows)", result.stock_code, result.len());

    if result.is_partial() {
        for (step, error) in &result.failures {
            println!("Skipped {}: {}", step.name(), error);
        }
    }

    if let Some(row) = result.last_row() {
        let show = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v));

        println!("Last row: {}", row.date);
        println!("  Close {:.2}  Volume {}", row.close, row.volume);
        println!("  SMA_5 {}  SMA_20 {}  EMA_12 {}  EMA_26 {}",
                 show(row.sma_5), show(row.sma_20), show(row.ema_12), show(row.ema_26));
        println!("  MACD {}  Signal {}  Hist {}",
                 show(row.macd), show(row.macd_signal), show(row.macd_hist));
        println!("  Bollinger {} / {} / {}",
                 show(row.bollinger_lower), show(row.bollinger_mid), show(row.bollinger_upper));
        println!("  RSI {}  %K {}  %D {}", show(row.rsi), show(row.stoch_k), show(row.stoch_d));
        println!("  ADX {}  +DI {}  -DI {}  ATR {}  OBV {}",
                 show(row.adx), show(row.plus_di), show(row.minus_di), show(row.atr), show(row.obv));
    }
}

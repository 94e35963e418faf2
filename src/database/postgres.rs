use crate::config::DatabaseConfig;
use crate::database::models::AnalysisRow;
use crate::database::schema::{
    create_technical_data_index, create_technical_data_table, validate_table_name, TECHNICAL_DATA_COLUMNS,
};
use crate::utils::{pad_stock_code, sanitize};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder, Row};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

// Rows per page when reading keys back
pub const KEY_PAGE_SIZE: i64 = 1000;

// Postgres accepts at most 65535 bind parameters per statement
pub const MAX_BATCH_ROWS: usize = u16::MAX as usize / TECHNICAL_DATA_COLUMNS.len();

fn batch_rows(configured: usize) -> usize {
    configured.clamp(1, MAX_BATCH_ROWS)
}

pub struct PostgresManager {
    pool: PgPool,
    table: String,
    batch_size: usize,
}

impl PostgresManager {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        validate_table_name(&config.table)?;

        let connection_string = format!(
            "postgres://{}:{}@{}:{}/{}",
            config.user, config.password, config.host, config.port, config.dbname
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1) as u32)
            .connect(&connection_string)
            .await
            .context("Failed to create database connection pool")?;

        Ok(Self {
            pool,
            table: config.table.clone(),
            batch_size: batch_rows(config.batch_size),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    // Create the analysis table and its index if they don't exist
    pub async fn init_tables(&self) -> Result<()> {
        sqlx::query(&create_technical_data_table(&self.table))
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to create table {}", self.table))?;

        sqlx::query(&create_technical_data_index(&self.table))
            .execute(&self.pool)
            .await?;

        info!(table = %self.table, "Database tables initialized successfully");
        Ok(())
    }

    // Every (stock_code, date) key already stored, read page by page
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn fetch_existing_keys(&self) -> Result<HashSet<(String, String)>> {
        let query = format!(
            "SELECT stock_code, date FROM {} ORDER BY stock_code, date LIMIT $1 OFFSET $2",
            self.table
        );

        let mut keys = HashSet::new();
        let mut page = 0i64;

        loop {
            let rows = sqlx::query(&query)
                .bind(KEY_PAGE_SIZE)
                .bind(page * KEY_PAGE_SIZE)
                .fetch_all(&self.pool)
                .await?;

            let fetched = rows.len() as i64;
            for row in rows {
                let code: String = row.try_get(0)?;
                let date: NaiveDate = row.try_get(1)?;
                keys.insert((pad_stock_code(&code), date.format("%Y-%m-%d").to_string()));
            }

            // A short page is the last one
            if fetched < KEY_PAGE_SIZE {
                break;
            }
            page += 1;
        }

        debug!(keys = keys.len(), pages = page + 1, "Fetched stored keys");
        Ok(keys)
    }

    // Batch insert analysis rows; rows whose key is already stored are skipped
    #[instrument(skip(self, rows), fields(table = %self.table, rows = rows.len()))]
    pub async fn insert_rows(&self, rows: &[AnalysisRow]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        // Use a transaction for batch inserts
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for chunk in rows.chunks(self.batch_size) {
            let mut builder = Self::insert_statement(&self.table, chunk)?;
            let result = builder.build().execute(&mut *tx).await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;

        info!(inserted, skipped = rows.len() as u64 - inserted, "Inserted analysis rows");
        Ok(inserted)
    }

    fn insert_statement<'a>(table: &str, chunk: &'a [AnalysisRow]) -> Result<QueryBuilder<'a, Postgres>> {
        let mut parsed = Vec::with_capacity(chunk.len());
        for row in chunk {
            let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
                .with_context(|| format!("Invalid date '{}' for {}", row.date, row.stock_code))?;
            parsed.push((row, date));
        }

        let mut builder = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) ",
            table,
            TECHNICAL_DATA_COLUMNS.join(", ")
        ));

        builder.push_values(parsed, |mut b, (row, date)| {
            b.push_bind(row.stock_code.as_str())
                .push_bind(date)
                .push_bind(sanitize(row.open))
                .push_bind(sanitize(row.high))
                .push_bind(sanitize(row.low))
                .push_bind(sanitize(row.close))
                .push_bind(i64::try_from(row.volume).unwrap_or(i64::MAX))
                .push_bind(sanitize(row.dividends))
                .push_bind(sanitize(row.stock_splits))
                .push_bind(row.sma_5.map(sanitize))
                .push_bind(row.sma_20.map(sanitize))
                .push_bind(row.ema_12.map(sanitize))
                .push_bind(row.ema_26.map(sanitize))
                .push_bind(row.macd.map(sanitize))
                .push_bind(row.macd_signal.map(sanitize))
                .push_bind(row.macd_hist.map(sanitize))
                .push_bind(row.bollinger_mid.map(sanitize))
                .push_bind(row.bollinger_upper.map(sanitize))
                .push_bind(row.bollinger_lower.map(sanitize))
                .push_bind(row.rsi.map(sanitize))
                .push_bind(row.stoch_k.map(sanitize))
                .push_bind(row.stoch_d.map(sanitize))
                .push_bind(row.adx.map(sanitize))
                .push_bind(row.plus_di.map(sanitize))
                .push_bind(row.minus_di.map(sanitize))
                .push_bind(row.atr.map(sanitize))
                .push_bind(row.obv.map(sanitize));
        });

        builder.push(" ON CONFLICT (stock_code, date) DO NOTHING");
        Ok(builder)
    }

    // Insert only rows whose key is not stored yet
    pub async fn insert_new_rows(&self, rows: &[AnalysisRow]) -> Result<u64> {
        let existing = self.fetch_existing_keys().await?;
        let new_rows: Vec<AnalysisRow> = rows
            .iter()
            .filter(|row| !existing.contains(&row.key()))
            .cloned()
            .collect();

        if new_rows.is_empty() {
            info!(table = %self.table, "Table is already up to date");
            return Ok(0);
        }

        self.insert_rows(&new_rows).await
    }
}

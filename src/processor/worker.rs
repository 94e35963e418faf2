use crate::database::models::{AnalysisRow, PriceSeries};
use crate::database::postgres::PostgresManager;
use crate::indicators::PipelineParams;
use crate::loader::{load_price_series, PriceSource};
use crate::processor::analysis::AnalysisResult;
use crate::processor::job::{SyncJob, SyncOutcome};
use crate::processor::pipeline::analyze_bars;
use crate::storage::CsvStore;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Summary of one batch sync
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub outcomes: Vec<(SyncJob, SyncOutcome)>,
    /// Rows produced in this run, in job order
    pub rows: Vec<AnalysisRow>,
    pub csv_appended: Option<usize>,
    pub db_inserted: Option<u64>,
}

impl SyncReport {
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| !o.is_success()).count()
    }
}

pub struct SyncWorker {
    source: Arc<dyn PriceSource>,
    params: PipelineParams,
    concurrency_limit: usize,
    csv_store: Option<CsvStore>,
    pg: Option<Arc<PostgresManager>>,
}

impl SyncWorker {
    pub fn new(source: Arc<dyn PriceSource>, params: PipelineParams, concurrency_limit: usize) -> Self {
        Self {
            source,
            params,
            concurrency_limit: concurrency_limit.max(1),
            csv_store: None,
            pg: None,
        }
    }

    pub fn with_csv_store(mut self, store: CsvStore) -> Self {
        self.csv_store = Some(store);
        self
    }

    pub fn with_postgres(mut self, pg: Arc<PostgresManager>) -> Self {
        self.pg = Some(pg);
        self
    }

    /// Load every instrument, analyze them in parallel and hand the rows to
    /// the configured sinks. A failing instrument is logged and skipped.
    #[instrument(skip(self, jobs), fields(jobs = jobs.len()))]
    pub async fn run(&self, jobs: Vec<SyncJob>) -> Result<SyncReport> {
        let run_id = Uuid::new_v4();
        info!(%run_id, concurrency = self.concurrency_limit, "Starting sync run");

        let loaded = self.fetch_all(&jobs).await?;

        // Indicator computation is CPU bound; keep it off the async workers
        let params = self.params.clone();
        let analyzed = tokio::task::spawn_blocking(move || {
            loaded
                .into_par_iter()
                .map(|(job, series)| {
                    let result = series.map(|series| analyze_bars(&series, &params));
                    (job, result)
                })
                .collect::<Vec<_>>()
        })
        .await
        .context("Analysis task panicked")?;

        let mut outcomes = Vec::with_capacity(analyzed.len());
        let mut rows = Vec::new();

        for (job, result) in analyzed {
            match result {
                Ok(result) => {
                    outcomes.push((job, Self::outcome_of(&result)));
                    rows.extend(result.rows);
                }
                Err(error) => {
                    outcomes.push((job, SyncOutcome::LoadFailed { error }));
                }
            }
        }

        let csv_appended = match &self.csv_store {
            Some(store) => Some(store.sync(&rows)?.len()),
            None => None,
        };

        let db_inserted = match &self.pg {
            Some(pg) => Some(pg.insert_new_rows(&rows).await?),
            None => None,
        };

        let report = SyncReport {
            run_id,
            outcomes,
            rows,
            csv_appended,
            db_inserted,
        };

        info!(
            %run_id,
            rows = report.rows.len(),
            failed = report.failed(),
            csv_appended = ?report.csv_appended,
            db_inserted = ?report.db_inserted,
            "Sync run finished"
        );

        Ok(report)
    }

    // Fetch with at most `concurrency_limit` requests in flight; results
    // come back in job order
    async fn fetch_all(&self, jobs: &[SyncJob]) -> Result<Vec<(SyncJob, Result<PriceSeries, String>)>> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut handles = Vec::with_capacity(jobs.len());

        for job in jobs.iter().cloned() {
            let semaphore = semaphore.clone();
            let source = self.source.clone();

            handles.push(tokio::spawn(async move {
                // Acquire permit from semaphore
                let _permit = semaphore.acquire_owned().await;

                let result = load_price_series(source.as_ref(), &job.ticker, &job.selector).await;
                if let Err(e) = &result {
                    error!(job = %job, "Failed to load price history: {}", e);
                }
                (job, result.map_err(|e| e.to_string()))
            }));
        }

        let mut loaded = Vec::with_capacity(handles.len());
        for handle in futures::future::join_all(handles).await {
            loaded.push(handle.context("Fetch task panicked")?);
        }

        Ok(loaded)
    }

    fn outcome_of(result: &AnalysisResult) -> SyncOutcome {
        let missing_columns = result.missing_columns();
        if !missing_columns.is_empty() {
            warn!(stock_code = %result.stock_code, missing = ?missing_columns, "Partial analysis");
        }

        SyncOutcome::Analyzed {
            rows: result.len(),
            missing_columns,
        }
    }
}

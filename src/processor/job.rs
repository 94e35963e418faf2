use crate::config::StockEntry;
use crate::loader::HistorySelector;
use std::fmt;

/// One instrument to load and analyze during a batch sync
#[derive(Debug, Clone, PartialEq)]
pub struct SyncJob {
    pub name: String,
    pub ticker: String,
    pub selector: HistorySelector,
}

impl SyncJob {
    pub fn new(name: String, ticker: String, selector: HistorySelector) -> Self {
        Self { name, ticker, selector }
    }

    pub fn from_entry(entry: &StockEntry, selector: HistorySelector) -> Self {
        Self::new(entry.name.clone(), entry.code.clone(), selector)
    }
}

impl fmt::Display for SyncJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.ticker, self.name)
    }
}

/// What happened to one job
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Analyzed {
        rows: usize,
        /// Indicator columns left out of the result
        missing_columns: Vec<&'static str>,
    },
    LoadFailed {
        error: String,
    },
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Analyzed { .. })
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Analyzed { rows, missing_columns } if missing_columns.is_empty() => {
                write!(f, "{} rows", rows)
            }
            SyncOutcome::Analyzed { rows, missing_columns } => {
                write!(f, "{} rows, missing {}", rows, missing_columns.join(", "))
            }
            SyncOutcome::LoadFailed { error } => write!(f, "failed: {}", error),
        }
    }
}

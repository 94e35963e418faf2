pub mod analysis;
pub mod job;
pub mod pipeline;
pub mod worker;

pub use self::analysis::AnalysisResult;
pub use self::job::{SyncJob, SyncOutcome};
pub use self::pipeline::{analyze_bars, analyze_data};
pub use self::worker::{SyncReport, SyncWorker};

pub mod calculator;
pub mod oscillators;
pub mod overlaps;
pub mod series;
pub mod ta;
pub mod trend;
pub mod volatility;
pub mod volume;

// Re-export the calculators
pub use self::calculator::{IndicatorCalculator, IndicatorColumn, IndicatorStep, PipelineParams, StepOutcome};
pub use self::oscillators::OscillatorCalculator;
pub use self::overlaps::OverlapCalculator;
pub use self::series::IndicatorSeries;
pub use self::trend::TrendCalculator;
pub use self::volatility::VolatilityCalculator;
pub use self::volume::VolumeCalculator;
